use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use crate::errors::SensorError;
use crate::manager_sensor::ClimateSensor;
use crate::models::sample::RawReading;

const TEMPERATURE_CHANNEL: &str = "in_temp_input";
const HUMIDITY_CHANNEL: &str = "in_humidityrelative_input";

/// DHT22 exposed by the kernel dht11 driver as an industrial I/O device
///
/// The driver reports both channels in milli units. The channel files are kept open
/// between reads of one acquisition and closed on release.
pub struct IioClimateSensor {
    device_dir: PathBuf,
    channels: Option<(File, File)>,
}

impl IioClimateSensor {
    /// Returns a new IioClimateSensor
    ///
    /// # Arguments
    ///
    /// * 'device_dir' - the iio device directory, e.g. /sys/bus/iio/devices/iio:device0
    pub fn new(device_dir: &str) -> Self {
        Self { device_dir: PathBuf::from(device_dir), channels: None }
    }

    fn open(&mut self) -> Result<&mut (File, File), SensorError> {
        if self.channels.is_none() {
            let temperature = File::open(self.device_dir.join(TEMPERATURE_CHANNEL))?;
            let humidity = File::open(self.device_dir.join(HUMIDITY_CHANNEL))?;
            self.channels = Some((temperature, humidity));
        }

        self.channels.as_mut()
            .ok_or_else(|| SensorError::Unexpected("sensor channels not open".to_string()))
    }
}

impl ClimateSensor for IioClimateSensor {
    fn read(&mut self) -> Result<RawReading, SensorError> {
        let (temperature, humidity) = self.open()?;

        Ok(RawReading {
            temperature_c: read_milli(temperature)?,
            humidity_percent: read_milli(humidity)?,
        })
    }

    fn release(&mut self) {
        self.channels = None;
    }
}

/// Reads a sysfs attribute holding an integer in milli units
///
/// Returns None if the attribute is empty or not a number
///
/// # Arguments
///
/// * 'file' - open attribute file, rewound before reading
fn read_milli(file: &mut File) -> Result<Option<f64>, SensorError> {
    file.seek(SeekFrom::Start(0))?;
    let mut raw = String::new();
    file.read_to_string(&mut raw)?;

    Ok(raw.trim().parse::<f64>().ok().map(|v| v / 1000.0))
}
