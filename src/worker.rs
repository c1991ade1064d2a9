use std::time::Duration;
use log::{error, info};
use crate::clock::Clock;
use crate::errors::StorageError;
use crate::manager_sensor::{ClimateSensor, SensorAcquirer};
use crate::models::sample::Sample;
use crate::shutdown::Shutdown;
use crate::store::TimeSeriesStore;

/// Anything that can take a sample for persistence
pub trait SampleSink {
    fn insert(&self, sample: &Sample) -> Result<(), StorageError>;
}

impl SampleSink for TimeSeriesStore {
    fn insert(&self, sample: &Sample) -> Result<(), StorageError> {
        TimeSeriesStore::insert(self, sample)
    }
}

/// Outcome of one measurement tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Stored,
    SensorFailed,
    StorageFailed,
}

/// Periodically acquires a sample and hands it to the store
pub struct MeasurementScheduler<'a, S: ClimateSensor, C: Clock, K: SampleSink> {
    acquirer: SensorAcquirer<S, C>,
    sink: &'a K,
    interval: Duration,
}

impl<'a, S: ClimateSensor, C: Clock, K: SampleSink> MeasurementScheduler<'a, S, C, K> {
    /// Returns a new MeasurementScheduler
    ///
    /// # Arguments
    ///
    /// * 'acquirer' - the sensor acquirer
    /// * 'sink' - where samples go
    /// * 'interval' - time between two measurements
    pub fn new(acquirer: SensorAcquirer<S, C>, sink: &'a K, interval: Duration) -> Self {
        Self { acquirer, sink, interval }
    }

    /// Runs one acquire and persist cycle, failures are logged and never escape
    pub fn tick(&mut self) -> Tick {
        let sample = match self.acquirer.acquire() {
            Ok(sample) => sample,
            Err(e) => {
                error!("no measurement stored: {}", e);
                return Tick::SensorFailed;
            },
        };

        match self.sink.insert(&sample) {
            Ok(()) => {
                info!("measurement stored: {:.2} °C, {:.2} %, dew point {:.2} °C",
                      sample.temperature_c, sample.humidity_percent, sample.dew_point_c);
                Tick::Stored
            },
            Err(e) => {
                error!("error writing measurement to database: {}", e);
                Tick::StorageFailed
            },
        }
    }

    /// Runs measurement cycles until shutdown is signalled
    ///
    /// # Arguments
    ///
    /// * 'shutdown' - stop signal, also interrupts the wait between cycles
    pub fn run(&mut self, shutdown: &Shutdown) {
        info!("measurement loop started, interval {} s", self.interval.as_secs());

        while !shutdown.is_triggered() {
            self.tick();
            if shutdown.wait(self.interval) {
                break;
            }
        }

        info!("measurement loop stopped");
    }
}
