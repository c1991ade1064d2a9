pub mod iio;
pub mod thermal;

use std::thread;
use std::time::Duration;
use chrono_tz::Tz;
use log::{error, warn};
use crate::clock::Clock;
use crate::dew_point::{dew_point, round2};
use crate::errors::{AcquisitionError, SensorError};
use crate::models::sample::{RawReading, Sample};

/// A humidity/temperature sensor that must be held exclusively while reading
pub trait ClimateSensor {
    /// Reads temperature and relative humidity once
    fn read(&mut self) -> Result<RawReading, SensorError>;

    /// Releases whatever exclusive hold the sensor has on the hardware
    fn release(&mut self) {}
}

/// Any source of a single temperature in °C
pub trait TemperatureSource {
    fn read_celsius(&mut self) -> Result<f64, SensorError>;
}

/// Holds a sensor for one acquisition and releases it when dropped
struct SensorGuard<'a, S: ClimateSensor> {
    sensor: &'a mut S,
}

impl<S: ClimateSensor> Drop for SensorGuard<'_, S> {
    fn drop(&mut self) {
        self.sensor.release();
    }
}

/// Wraps a climate sensor with a bounded retry and turns raw readings into samples
pub struct SensorAcquirer<S: ClimateSensor, C: Clock> {
    sensor: S,
    clock: C,
    tz: Tz,
    retries: u32,
    retry_delay: Duration,
}

impl<S: ClimateSensor, C: Clock> SensorAcquirer<S, C> {
    /// Returns a new SensorAcquirer
    ///
    /// # Arguments
    ///
    /// * 'sensor' - the sensor to read
    /// * 'clock' - clock used to timestamp samples
    /// * 'tz' - civil timezone for sample timestamps
    /// * 'retries' - max number of read attempts per acquisition
    /// * 'retry_delay' - pause between two failed attempts
    pub fn new(sensor: S, clock: C, tz: Tz, retries: u32, retry_delay: Duration) -> Self {
        Self { sensor, clock, tz, retries: retries.max(1), retry_delay }
    }

    /// Reads the sensor until a valid reading is obtained or the retry budget is spent
    ///
    /// The sensor is released on every way out of this function.
    pub fn acquire(&mut self) -> Result<Sample, AcquisitionError> {
        let retries = self.retries;
        let retry_delay = self.retry_delay;
        let mut guard = SensorGuard { sensor: &mut self.sensor };

        for attempt in 1..=retries {
            match guard.sensor.read().and_then(validate) {
                Ok((temperature_c, humidity_percent, dew_point_c)) => {
                    return Ok(Sample {
                        timestamp: self.clock.now().with_timezone(&self.tz),
                        temperature_c,
                        humidity_percent,
                        dew_point_c,
                    });
                },
                Err(SensorError::Transient(e)) => {
                    warn!("sensor read error (attempt {}/{}): {}", attempt, retries, e);
                },
                Err(SensorError::Unexpected(e)) => {
                    error!("unexpected sensor error (attempt {}/{}): {}", attempt, retries, e);
                },
            }

            if attempt < retries {
                thread::sleep(retry_delay);
            }
        }

        error!("sensor could not be read after {} attempts", retries);
        Err(AcquisitionError::Exhausted(retries))
    }
}

/// Checks that both values are present and usable and derives the dew point
///
/// Returns rounded temperature, humidity and dew point
///
/// # Arguments
///
/// * 'reading' - the raw reading
fn validate(reading: RawReading) -> Result<(f64, f64, f64), SensorError> {
    let temperature_c = reading.temperature_c
        .filter(|t| t.is_finite())
        .ok_or_else(|| SensorError::Transient("no valid temperature value".to_string()))?;
    let humidity_percent = reading.humidity_percent
        .filter(|h| h.is_finite())
        .ok_or_else(|| SensorError::Transient("no valid humidity value".to_string()))?;

    let dew_point_c = dew_point(temperature_c, humidity_percent);
    if !dew_point_c.is_finite() {
        return Err(SensorError::Transient(format!("humidity out of range: {}", humidity_percent)));
    }

    Ok((round2(temperature_c), round2(humidity_percent), dew_point_c))
}

#[cfg(test)]
pub mod testing {
    use std::collections::VecDeque;
    use crate::errors::SensorError;
    use crate::models::sample::RawReading;
    use super::{ClimateSensor, TemperatureSource};

    /// Sensor replaying a fixed list of results
    pub struct ScriptedSensor {
        pub script: VecDeque<Result<RawReading, SensorError>>,
        pub reads: usize,
        pub releases: usize,
    }

    impl ScriptedSensor {
        pub fn new(script: Vec<Result<RawReading, SensorError>>) -> Self {
            Self { script: script.into(), reads: 0, releases: 0 }
        }
    }

    impl ClimateSensor for ScriptedSensor {
        fn read(&mut self) -> Result<RawReading, SensorError> {
            self.reads += 1;
            self.script.pop_front()
                .unwrap_or(Err(SensorError::Transient("script exhausted".to_string())))
        }

        fn release(&mut self) {
            self.releases += 1;
        }
    }

    pub fn reading(t: f64, h: f64) -> Result<RawReading, SensorError> {
        Ok(RawReading { temperature_c: Some(t), humidity_percent: Some(h) })
    }

    /// Temperature source replaying a fixed list of results
    pub struct ScriptedTemperature(pub VecDeque<Result<f64, SensorError>>);

    impl TemperatureSource for ScriptedTemperature {
        fn read_celsius(&mut self) -> Result<f64, SensorError> {
            self.0.pop_front().unwrap_or(Err(SensorError::Unexpected("script exhausted".to_string())))
        }
    }
}
