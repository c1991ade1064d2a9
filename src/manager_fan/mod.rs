pub mod gpio;

use std::fmt;
use std::fmt::Formatter;
use std::time::Duration;
use log::{error, info, warn};
use crate::errors::ActuatorError;
use crate::manager_fan::gpio::OutputPin;
use crate::manager_sensor::TemperatureSource;
use crate::shutdown::Shutdown;

/// Fan state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanState {
    Off,
    On,
}

impl fmt::Display for FanState {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            FanState::Off => write!(f, "OFF"),
            FanState::On => write!(f, "ON"),
        }
    }
}

/// Switch points of the hysteresis, temp_off must be below temp_on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub temp_on: f64,
    pub temp_off: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self { temp_on: 69.0, temp_off: 65.0 }
    }
}

impl FanState {
    /// Returns the state the fan should be in after a temperature reading
    ///
    /// Readings strictly between the two thresholds keep the current state.
    ///
    /// # Arguments
    ///
    /// * 'temp' - the temperature reading
    /// * 'thresholds' - switch points
    pub fn next(self, temp: f64, thresholds: &Thresholds) -> FanState {
        if temp >= thresholds.temp_on {
            FanState::On
        } else if temp <= thresholds.temp_off {
            FanState::Off
        } else {
            self
        }
    }
}

/// Drives a cooling fan from a temperature source with a two threshold hysteresis
///
/// The output is forced low when the controller is built and again when it is torn down,
/// which also happens on drop.
pub struct FanController<P: OutputPin, T: TemperatureSource> {
    pin: Option<P>,
    source: T,
    thresholds: Thresholds,
    state: FanState,
}

impl<P: OutputPin, T: TemperatureSource> FanController<P, T> {
    /// Returns a new FanController with the fan switched off
    ///
    /// # Arguments
    ///
    /// * 'pin' - output pin the fan is connected to
    /// * 'source' - temperature to control on
    /// * 'thresholds' - hysteresis switch points
    pub fn new(mut pin: P, source: T, thresholds: Thresholds) -> Result<Self, ActuatorError> {
        pin.set(false)?;

        Ok(Self { pin: Some(pin), source, thresholds, state: FanState::Off })
    }

    pub fn state(&self) -> FanState {
        self.state
    }

    /// Reads the temperature once and switches the fan if a threshold is crossed
    ///
    /// A failed read leaves the fan as it is.
    pub fn check(&mut self) {
        match self.source.read_celsius() {
            Ok(temp) => self.apply(temp),
            Err(e) => error!("error reading fan control temperature: {}", e),
        }
    }

    /// Applies one temperature reading to the hysteresis
    ///
    /// # Arguments
    ///
    /// * 'temp' - the temperature reading
    pub fn apply(&mut self, temp: f64) {
        let wanted = self.state.next(temp, &self.thresholds);
        self.set_fan(wanted, temp);
    }

    /// Runs the control loop until shutdown is signalled
    ///
    /// # Arguments
    ///
    /// * 'interval' - time between two checks
    /// * 'shutdown' - stop signal
    pub fn run(&mut self, interval: Duration, shutdown: &Shutdown) {
        info!("fan control started, on at {:.1} °C, off at {:.1} °C", self.thresholds.temp_on, self.thresholds.temp_off);

        while !shutdown.is_triggered() {
            self.check();
            if shutdown.wait(interval) {
                break;
            }
        }

        info!("fan control stopped");
    }

    /// Switches the fan off and gives the pin back, safe to call more than once
    pub fn shutdown(&mut self) {
        if let Some(mut pin) = self.pin.take() {
            if self.state == FanState::On {
                match pin.set(false) {
                    Ok(()) => {
                        self.state = FanState::Off;
                        info!("fan {} (shutdown)", FanState::Off);
                    },
                    Err(e) => error!("could not switch fan off on shutdown: {}", e),
                }
            } else if let Err(e) = pin.set(false) {
                warn!("could not force fan pin low on shutdown: {}", e);
            }

            if let Err(e) = pin.release() {
                error!("could not release fan pin: {}", e);
            }
        }
    }

    /// Writes the wanted state to the pin, nothing happens if it is the current state
    ///
    /// # Arguments
    ///
    /// * 'wanted' - the wanted fan state
    /// * 'temp' - the temperature that triggered the change, for logging
    fn set_fan(&mut self, wanted: FanState, temp: f64) {
        if wanted == self.state {
            return;
        }

        if let Some(pin) = self.pin.as_mut() {
            match pin.set(wanted == FanState::On) {
                Ok(()) => {
                    self.state = wanted;
                    info!("fan {} (CPU {:.2} °C)", wanted, temp);
                },
                Err(e) => error!("could not switch fan {}: {}", wanted, e),
            }
        }
    }
}

impl<P: OutputPin, T: TemperatureSource> Drop for FanController<P, T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
