use std::env;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use anyhow::{Context, Result};
use log::{error, info, warn};
use hausserver::clock::SystemClock;
use hausserver::config::{load_config, Config};
use hausserver::logging::setup_logger;
use hausserver::manager_dwd::cache::WeatherCache;
use hausserver::manager_dwd::{HttpDownloader, WeatherFetcher};
use hausserver::manager_fan::gpio::SysfsPin;
use hausserver::manager_fan::{FanController, Thresholds};
use hausserver::manager_sensor::iio::IioClimateSensor;
use hausserver::manager_sensor::thermal::ThermalZone;
use hausserver::manager_sensor::SensorAcquirer;
use hausserver::shutdown::Shutdown;
use hausserver::store::TimeSeriesStore;
use hausserver::worker::MeasurementScheduler;

const DEFAULT_CONFIG_PATH: &str = "/etc/hausserver/config.toml";

fn main() -> Result<()> {
    let config_path = config_path();
    let config = load_config(&config_path).with_context(|| format!("loading configuration from {}", config_path))?;
    let _log_handle = setup_logger(&config.general)?;

    info!("hausserver {} starting with {}", env!("CARGO_PKG_VERSION"), config_path);

    let shutdown = Shutdown::new();
    let stopper = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("termination requested");
        stopper.trigger();
    })?;

    let store = Arc::new(TimeSeriesStore::new(
        &config.database.path,
        Duration::from_secs(config.database.timeout_secs),
        config.database.retention_months,
        config.general.timezone,
    ));
    store.init().with_context(|| format!("initializing database {}", config.database.path))?;

    let measurement = spawn_measurement(&config, store.clone(), shutdown.clone())?;
    let fan = spawn_fan(&config, shutdown.clone())?;

    let fetcher = WeatherFetcher::new(
        HttpDownloader::new(Duration::from_secs(config.weather.timeout_secs)),
        SystemClock,
        config.general.timezone,
        &config.weather,
    );
    let weather = WeatherCache::new(fetcher, SystemClock, config.weather.cache_ttl());
    let refresh = config.weather.refresh_interval();

    loop {
        let snapshot = weather.get();
        info!("weather as of {}: {} forecast hours, {} warnings",
              snapshot.updated_at.format("%Y-%m-%d %H:%M"), snapshot.hourly.len(), snapshot.warnings.len());

        match store.latest() {
            Ok(Some(sample)) => info!("latest measurement {}: {:.2} °C, {:.2} %",
                                      sample.timestamp.format("%Y-%m-%d %H:%M"), sample.temperature_c, sample.humidity_percent),
            Ok(None) => info!("no measurements stored yet"),
            Err(e) => error!("error reading latest measurement: {}", e),
        }

        if shutdown.wait(refresh) {
            break;
        }
    }

    join("measurement", measurement);
    join("fan", fan);
    info!("hausserver stopped");

    Ok(())
}

/// Config path from --config=<path>, then HAUSSERVER_CONFIG, then the default
fn config_path() -> String {
    env::args()
        .find_map(|a| a.strip_prefix("--config=").map(str::to_string))
        .or_else(|| env::var("HAUSSERVER_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

/// Starts the measurement loop on its own thread
///
/// # Arguments
///
/// * 'config' - configuration
/// * 'store' - store the samples go to
/// * 'shutdown' - stop signal
fn spawn_measurement(config: &Config, store: Arc<TimeSeriesStore>, shutdown: Shutdown) -> Result<JoinHandle<()>> {
    let sensor = IioClimateSensor::new(&config.sensor.device_dir);
    let acquirer = SensorAcquirer::new(
        sensor,
        SystemClock,
        config.general.timezone,
        config.sensor.retries,
        config.sensor.retry_delay(),
    );
    let interval = config.sensor.interval();

    let handle = thread::Builder::new()
        .name("measurement".to_string())
        .spawn(move || {
            let mut scheduler = MeasurementScheduler::new(acquirer, store.as_ref(), interval);
            scheduler.run(&shutdown);
        })?;

    Ok(handle)
}

/// Starts the fan control loop on its own thread, the fan is switched off when the thread ends
///
/// # Arguments
///
/// * 'config' - configuration
/// * 'shutdown' - stop signal
fn spawn_fan(config: &Config, shutdown: Shutdown) -> Result<JoinHandle<()>> {
    let fan = config.fan.clone();
    let thresholds = Thresholds { temp_on: fan.temp_on, temp_off: fan.temp_off };

    let handle = thread::Builder::new()
        .name("fan".to_string())
        .spawn(move || {
            let pin = match SysfsPin::open(&fan.gpio_root, fan.gpio_pin) {
                Ok(pin) => pin,
                Err(e) => {
                    error!("fan control disabled, could not open gpio {}: {}", fan.gpio_pin, e);
                    return;
                },
            };

            match FanController::new(pin, ThermalZone::new(&fan.thermal_path), thresholds) {
                Ok(mut controller) => {
                    controller.run(fan.check_interval(), &shutdown);
                    controller.shutdown();
                },
                Err(e) => error!("fan control disabled: {}", e),
            }
        })?;

    Ok(handle)
}

fn join(name: &str, handle: JoinHandle<()>) {
    if handle.join().is_err() {
        warn!("{} thread panicked", name);
    }
}
