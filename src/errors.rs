use std::io;
use thiserror::Error;

/// Errors raised while loading and validating the configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("ConfigError::Io: {0}")]
    Io(String),
    #[error("ConfigError::Document: {0}")]
    Document(String),
    #[error("ConfigError::Invalid: {0}")]
    Invalid(String),
}
impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self { ConfigError::Io(e.to_string()) }
}
impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self { ConfigError::Document(e.to_string()) }
}
impl From<&str> for ConfigError {
    fn from(e: &str) -> Self { ConfigError::Invalid(e.to_string()) }
}

/// Errors from a single raw sensor read
///
/// Both variants are retried by the acquirer, they only differ in how loudly they are logged.
#[derive(Error, Debug, Clone)]
pub enum SensorError {
    #[error("transient sensor read error: {0}")]
    Transient(String),
    #[error("unexpected sensor error: {0}")]
    Unexpected(String),
}
impl From<io::Error> for SensorError {
    fn from(e: io::Error) -> Self {
        // EIO and ETIMEDOUT are what the dht11 iio driver returns on a bad checksum or a missed edge
        match e.raw_os_error() {
            Some(5) | Some(110) => SensorError::Transient(e.to_string()),
            _ => match e.kind() {
                io::ErrorKind::TimedOut | io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock =>
                    SensorError::Transient(e.to_string()),
                _ => SensorError::Unexpected(e.to_string()),
            },
        }
    }
}

/// Terminal outcome of one acquisition cycle
#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("sensor could not be read after {0} attempts")]
    Exhausted(u32),
}

/// Errors from the measurement store
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("StorageError::Database: {0}")]
    Database(String),
    #[error("StorageError::Row: {0}")]
    Row(String),
}
impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self { StorageError::Database(e.to_string()) }
}
impl From<chrono::ParseError> for StorageError {
    fn from(e: chrono::ParseError) -> Self { StorageError::Row(format!("bad timestamp: {}", e)) }
}

#[derive(Error, Debug)]
#[error("error driving output pin: {0}")]
pub struct ActuatorError(pub String);
impl From<io::Error> for ActuatorError {
    fn from(e: io::Error) -> Self { ActuatorError(e.to_string()) }
}
