use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;

/// One stored measurement of the outdoor sensor
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Tz>,
    pub temperature_c: f64,
    pub humidity_percent: f64,
    pub dew_point_c: f64,
}

/// Raw values from one sensor read, either value may be missing
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawReading {
    pub temperature_c: Option<f64>,
    pub humidity_percent: Option<f64>,
}
