use std::fs;
use std::time::Duration;
use chrono::TimeDelta;
use chrono_tz::Tz;
use log::LevelFilter;
use serde::Deserialize;
use crate::errors::ConfigError;
use crate::manager_dwd::SourceProfile;

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct General {
    pub timezone: Tz,
    pub log_path: String,
    pub log_level: LevelFilter,
    pub log_to_stdout: bool,
    pub log_max_bytes: u64,
    pub log_backup_count: u32,
}

impl Default for General {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Europe::Berlin,
            log_path: "/var/log/hausserver/hausserver.log".to_string(),
            log_level: LevelFilter::Info,
            log_to_stdout: true,
            log_max_bytes: 5 * 1024 * 1024,
            log_backup_count: 3,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Database {
    pub path: String,
    pub timeout_secs: u64,
    pub retention_months: u32,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            path: "/var/lib/hausserver/hausserver.db".to_string(),
            timeout_secs: 10,
            retention_months: 6,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Sensor {
    pub device_dir: String,
    pub retries: u32,
    pub retry_delay_secs: u64,
    pub interval_secs: u64,
}

impl Default for Sensor {
    fn default() -> Self {
        Self {
            device_dir: "/sys/bus/iio/devices/iio:device0".to_string(),
            retries: 3,
            retry_delay_secs: 2,
            interval_secs: 15 * 60,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Fan {
    pub gpio_pin: u32,
    pub gpio_root: String,
    pub thermal_path: String,
    pub temp_on: f64,
    pub temp_off: f64,
    pub check_secs: u64,
}

impl Default for Fan {
    fn default() -> Self {
        Self {
            gpio_pin: 4,
            gpio_root: "/sys/class/gpio".to_string(),
            thermal_path: "/sys/class/thermal/thermal_zone0/temp".to_string(),
            temp_on: 69.0,
            temp_off: 65.0,
            check_secs: 60,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Weather {
    pub profile: SourceProfile,
    pub station_id: String,
    pub warning_area: String,
    pub cache_minutes: i64,
    pub timeout_secs: u64,
    pub forecast_url: Option<String>,
    pub alerts_url: Option<String>,
}

impl Default for Weather {
    fn default() -> Self {
        Self {
            profile: SourceProfile::MosmixKmzCap,
            station_id: "10433".to_string(),
            warning_area: "Rheinstetten".to_string(),
            cache_minutes: 60,
            timeout_secs: 20,
            forecast_url: None,
            alerts_url: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct History {
    pub smoothing_window: usize,
}

impl Default for History {
    fn default() -> Self {
        Self { smoothing_window: 4 }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub general: General,
    pub database: Database,
    pub sensor: Sensor,
    pub fan: Fan,
    pub weather: Weather,
    pub history: History,
}

impl Sensor {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl Weather {
    /// How long a fetched snapshot is served
    pub fn cache_ttl(&self) -> TimeDelta {
        TimeDelta::try_minutes(self.cache_minutes).unwrap_or(TimeDelta::MAX)
    }

    /// How often the snapshot is refreshed, same length as the ttl
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.cache_minutes.unsigned_abs().saturating_mul(60))
    }
}

impl Fan {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_secs)
    }
}

/// Loads the configuration file and returns a struct with all configuration items
///
/// # Arguments
///
/// * 'config_path' - path to the configuration file
pub fn load_config(config_path: &str) -> Result<Config, ConfigError> {
    let toml = fs::read_to_string(config_path)?;
    parse_config(&toml)
}

/// Parses and validates a configuration document
///
/// # Arguments
///
/// * 'toml' - the configuration as a toml string
pub fn parse_config(toml: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(toml)?;
    validate(&config)?;

    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.fan.temp_off >= config.fan.temp_on {
        return Err(ConfigError::from("fan.temp_off must be below fan.temp_on"));
    }
    if config.sensor.retries == 0 {
        return Err(ConfigError::from("sensor.retries must be at least 1"));
    }
    if config.database.retention_months == 0 {
        return Err(ConfigError::from("database.retention_months must be at least 1"));
    }
    if config.weather.cache_minutes <= 0 {
        return Err(ConfigError::from("weather.cache_minutes must be positive"));
    }
    if TimeDelta::try_minutes(config.weather.cache_minutes).is_none()
        || config.weather.cache_minutes.unsigned_abs().checked_mul(60).is_none() {
        return Err(ConfigError::from("weather.cache_minutes is out of range"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = parse_config("").unwrap();

        assert_eq!(config.general.timezone, chrono_tz::Europe::Berlin);
        assert_eq!(config.database.retention_months, 6);
        assert_eq!(config.sensor.retries, 3);
        assert_eq!(config.sensor.interval(), Duration::from_secs(900));
        assert_eq!(config.fan.temp_on, 69.0);
        assert_eq!(config.fan.temp_off, 65.0);
        assert_eq!(config.weather.profile, SourceProfile::MosmixKmzCap);
        assert_eq!(config.history.smoothing_window, 4);
    }

    #[test]
    fn sections_override_defaults() {
        let toml = r#"
            [general]
            timezone = "Europe/Vienna"
            log_level = "Debug"

            [weather]
            profile = "mosmix_kml_zip"
            station_id = "P0489"
            alerts_url = "http://localhost/alerts.zip"

            [fan]
            temp_on = 60.0
            temp_off = 55.5
        "#;
        let config = parse_config(toml).unwrap();

        assert_eq!(config.general.timezone, chrono_tz::Europe::Vienna);
        assert_eq!(config.general.log_level, LevelFilter::Debug);
        assert_eq!(config.weather.profile, SourceProfile::MosmixKmlZip);
        assert_eq!(config.weather.station_id, "P0489");
        assert_eq!(config.weather.alerts_url.as_deref(), Some("http://localhost/alerts.zip"));
        assert_eq!(config.fan.temp_off, 55.5);
        assert_eq!(config.database.path, "/var/lib/hausserver/hausserver.db");
    }

    #[test]
    fn inverted_fan_thresholds_are_rejected() {
        let toml = "[fan]\ntemp_on = 60.0\ntemp_off = 61.0\n";
        assert!(matches!(parse_config(toml), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn unknown_timezone_is_a_document_error() {
        let toml = "[general]\ntimezone = \"Mars/Olympus\"\n";
        assert!(matches!(parse_config(toml), Err(ConfigError::Document(_))));
    }

    #[test]
    fn huge_cache_minutes_is_rejected() {
        let toml = "[weather]\ncache_minutes = 9223372036854775807\n";
        assert!(matches!(parse_config(toml), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn huge_intervals_are_accepted_and_wait_for_the_signal() {
        let toml = "[sensor]\ninterval_secs = 18446744073709551615\n[fan]\ncheck_secs = 18446744073709551615\n";
        let config = parse_config(toml).unwrap();

        let shutdown = crate::shutdown::Shutdown::new();
        shutdown.trigger();
        assert!(shutdown.wait(config.sensor.interval()));
        assert!(shutdown.wait(config.fan.check_interval()));
    }

    #[test]
    fn cache_durations_follow_minutes() {
        let config = parse_config("[weather]\ncache_minutes = 30\n").unwrap();
        assert_eq!(config.weather.cache_ttl(), TimeDelta::minutes(30));
        assert_eq!(config.weather.refresh_interval(), Duration::from_secs(1800));
    }
}
