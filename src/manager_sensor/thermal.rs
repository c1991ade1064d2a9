use std::fs;
use crate::dew_point::round2;
use crate::errors::SensorError;
use crate::manager_sensor::TemperatureSource;

/// CPU temperature from a Linux thermal zone
pub struct ThermalZone {
    path: String,
}

impl ThermalZone {
    /// # Arguments
    ///
    /// * 'path' - path to the zone temp attribute, e.g. /sys/class/thermal/thermal_zone0/temp
    pub fn new(path: &str) -> Self {
        Self { path: path.to_string() }
    }
}

impl TemperatureSource for ThermalZone {
    fn read_celsius(&mut self) -> Result<f64, SensorError> {
        let raw = fs::read_to_string(&self.path)?;
        let milli_c = raw.trim().parse::<f64>()
            .map_err(|e| SensorError::Unexpected(format!("bad thermal zone value '{}': {}", raw.trim(), e)))?;

        Ok(round2(milli_c / 1000.0))
    }
}
