pub mod cache;
pub mod cap;
pub mod errors;
pub mod mosmix;

use std::time::Duration;
use chrono::DateTime;
use chrono_tz::Tz;
use log::{error, info};
use serde::Deserialize;
use ureq::Agent;
use crate::clock::Clock;
use crate::config::Weather;
use crate::manager_dwd::errors::WeatherError;
use crate::models::weather::{DailySummary, HourlyForecast, Warning, WeatherSnapshot};

const MOSMIX_SINGLE_STATION_URL: &str =
    "https://opendata.dwd.de/weather/local_forecasts/mos/MOSMIX_L/single_stations/{station}/kml/MOSMIX_L_LATEST_{station}.kmz";
const CAP_LISTING_URL: &str = "https://opendata.dwd.de/weather/alerts/cap/COMMUNEUNION_DWD_STAT/";
const CAP_ARCHIVE_URL: &str =
    "https://opendata.dwd.de/weather/alerts/cap/COMMUNEUNION_DWD_STAT/Z_CAP_C_EDZW_LATEST_PVW_STATUS_PREMIUMDWD_COMMUNEUNION_DE.zip";

const MAX_DOWNLOAD_BYTES: u64 = 64 * 1024 * 1024;

/// Pair of forecast and alert formats to fetch from
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceProfile {
    /// Single station kmz forecast, alerts from the latest document in a directory listing
    MosmixKmzCap,
    /// Kml or kmz forecast, alerts from a zip archive of per event documents
    MosmixKmlZip,
}

/// How the alert feed is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertFeed {
    Listing,
    Archive,
}

impl SourceProfile {
    pub fn default_forecast_url(&self) -> &'static str {
        MOSMIX_SINGLE_STATION_URL
    }

    pub fn default_alerts_url(&self) -> &'static str {
        match self {
            SourceProfile::MosmixKmzCap => CAP_LISTING_URL,
            SourceProfile::MosmixKmlZip => CAP_ARCHIVE_URL,
        }
    }

    pub fn alert_feed(&self) -> AlertFeed {
        match self {
            SourceProfile::MosmixKmzCap => AlertFeed::Listing,
            SourceProfile::MosmixKmlZip => AlertFeed::Archive,
        }
    }

    /// Element names carrying the probability of precipitation, in order of preference
    pub fn precip_aliases(&self) -> &'static [&'static str] {
        match self {
            SourceProfile::MosmixKmzCap => &["wwP", "wwP6"],
            SourceProfile::MosmixKmlZip => &["R101", "wwP"],
        }
    }
}

/// Anything that can fetch the raw bytes behind a URL
pub trait Downloader: Send + Sync {
    fn get(&self, url: &str) -> Result<Vec<u8>, WeatherError>;
}

/// Downloader over HTTP(S)
pub struct HttpDownloader {
    agent: Agent,
}

impl HttpDownloader {
    /// Returns a HttpDownloader
    ///
    /// # Arguments
    ///
    /// * 'timeout' - global timeout for each request, connect and body included
    pub fn new(timeout: Duration) -> HttpDownloader {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();

        let agent = config.into();

        Self { agent }
    }
}

impl Downloader for HttpDownloader {
    fn get(&self, url: &str) -> Result<Vec<u8>, WeatherError> {
        let bytes = self.agent
            .get(url)
            .call()?
            .body_mut()
            .with_config()
            .limit(MAX_DOWNLOAD_BYTES)
            .read_to_vec()?;

        Ok(bytes)
    }
}

/// Anything that can produce a weather snapshot, never fails
pub trait SnapshotSource: Send + Sync {
    fn fetch(&self) -> WeatherSnapshot;
}

/// Fetches forecast and alerts and merges them into one snapshot
pub struct WeatherFetcher<D: Downloader, C: Clock> {
    downloader: D,
    clock: C,
    tz: Tz,
    profile: SourceProfile,
    forecast_url: String,
    alerts_url: String,
    area: String,
}

impl<D: Downloader, C: Clock> WeatherFetcher<D, C> {
    /// Returns a WeatherFetcher for the configured station and warning area
    ///
    /// Configured URL overrides win over the profile defaults, a {station} placeholder
    /// is replaced by the station id.
    ///
    /// # Arguments
    ///
    /// * 'downloader' - transport to use
    /// * 'clock' - clock deciding what today is
    /// * 'tz' - civil timezone
    /// * 'config' - weather configuration
    pub fn new(downloader: D, clock: C, tz: Tz, config: &Weather) -> Self {
        let profile = config.profile;
        let forecast_url = config.forecast_url.as_deref().unwrap_or(profile.default_forecast_url());
        let alerts_url = config.alerts_url.as_deref().unwrap_or(profile.default_alerts_url());

        Self {
            downloader,
            clock,
            tz,
            profile,
            forecast_url: forecast_url.replace("{station}", &config.station_id),
            alerts_url: alerts_url.replace("{station}", &config.station_id),
            area: config.warning_area.clone(),
        }
    }

    /// Downloads and parses the forecast
    ///
    /// # Arguments
    ///
    /// * 'now' - current time in the civil timezone
    pub fn fetch_forecast(&self, now: DateTime<Tz>) -> Result<(Vec<HourlyForecast>, DailySummary), WeatherError> {
        let export = self.downloader.get(&self.forecast_url)?;
        let kml = mosmix::extract_kml(export)?;

        mosmix::parse_forecast(&kml, now, self.profile.precip_aliases())
    }

    /// Downloads and parses the alert feed, keeping warnings for the configured area
    pub fn fetch_warnings(&self) -> Result<Vec<Warning>, WeatherError> {
        match self.profile.alert_feed() {
            AlertFeed::Listing => {
                let listing = self.downloader.get(&self.alerts_url)?;
                let listing = String::from_utf8_lossy(&listing);
                let name = cap::latest_warning_file(&listing)
                    .ok_or(WeatherError::from("no warning document in listing"))?;

                let xml = self.downloader.get(&join_url(&self.alerts_url, &name))?;
                cap::parse_warnings(&xml, &self.area)
            },
            AlertFeed::Archive => {
                let archive = self.downloader.get(&self.alerts_url)?;
                cap::warnings_from_archive(archive, &self.area)
            },
        }
    }
}

impl<D: Downloader, C: Clock> SnapshotSource for WeatherFetcher<D, C> {
    /// Returns a snapshot, a half that fails is logged and left empty
    fn fetch(&self) -> WeatherSnapshot {
        let now = self.clock.now().with_timezone(&self.tz);

        let (hourly, today_summary) = match self.fetch_forecast(now) {
            Ok(forecast) => forecast,
            Err(e) => {
                error!("error fetching forecast from {}: {}", self.forecast_url, e);
                (Vec::new(), DailySummary::default())
            },
        };

        let warnings = match self.fetch_warnings() {
            Ok(warnings) => warnings,
            Err(e) => {
                error!("error fetching warnings from {}: {}", self.alerts_url, e);
                Vec::new()
            },
        };

        info!("weather fetched: {} forecast hours, {} warnings for {}", hourly.len(), warnings.len(), self.area);

        WeatherSnapshot { updated_at: now, hourly, today_summary, warnings }
    }
}

fn join_url(base: &str, name: &str) -> String {
    if base.ends_with('/') {
        format!("{}{}", base, name)
    } else {
        format!("{}/{}", base, name)
    }
}
