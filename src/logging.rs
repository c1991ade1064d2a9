use std::fs;
use std::path::Path;
use anyhow::{Context, Result};
use log4rs::append::console::ConsoleAppender;
use log4rs::append::rolling_file::policy::compound::roll::fixed_window::FixedWindowRoller;
use log4rs::append::rolling_file::policy::compound::trigger::size::SizeTrigger;
use log4rs::append::rolling_file::policy::compound::CompoundPolicy;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Handle;
use crate::config::General;

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} [{l}] {t}: {m}{n}";

/// Builds the log4rs configuration, a size rolled log file and optionally stdout
///
/// The log directory is created if it doesn't exist.
///
/// # Arguments
///
/// * 'general' - general configuration holding the log settings
pub fn build_config(general: &General) -> Result<Config> {
    if let Some(dir) = Path::new(&general.log_path).parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating log directory {}", dir.display()))?;
    }

    let roller = FixedWindowRoller::builder()
        .build(&format!("{}.{{}}", general.log_path), general.log_backup_count)?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(general.log_max_bytes)), Box::new(roller));

    let file = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(&general.log_path, Box::new(policy))
        .with_context(|| format!("opening log file {}", general.log_path))?;

    let mut builder = Config::builder()
        .appender(Appender::builder().build("file", Box::new(file)));
    let mut root = Root::builder().appender("file");

    if general.log_to_stdout {
        let stdout = ConsoleAppender::builder()
            .encoder(Box::new(PatternEncoder::new(PATTERN)))
            .build();
        builder = builder.appender(Appender::builder().build("stdout", Box::new(stdout)));
        root = root.appender("stdout");
    }

    Ok(builder.build(root.build(general.log_level))?)
}

/// Installs the global logger
///
/// # Arguments
///
/// * 'general' - general configuration holding the log settings
pub fn setup_logger(general: &General) -> Result<Handle> {
    let config = build_config(general)?;

    Ok(log4rs::init_config(config)?)
}

#[cfg(test)]
mod tests {
    use crate::store::testing::TempDir;
    use super::*;

    #[test]
    fn creates_missing_log_directory() {
        let dir = TempDir::new("logging");
        let log_path = dir.path().join("nested").join("hausserver.log");
        let general = General {
            log_path: log_path.to_str().unwrap().to_string(),
            log_to_stdout: false,
            ..Default::default()
        };

        build_config(&general).unwrap();

        assert!(log_path.parent().unwrap().is_dir());
    }
}
