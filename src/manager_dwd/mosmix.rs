use std::borrow::Cow;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use chrono::{DateTime, Days, NaiveDate};
use chrono_tz::Tz;
use roxmltree::{Document, Node};
use zip::ZipArchive;
use crate::dew_point::round2;
use crate::manager_dwd::errors::WeatherError;
use crate::models::weather::{DailySummary, HourlyForecast, WeatherSymbol};

const KELVIN_OFFSET: f64 = 273.15;

/// Tokens MOSMIX uses for "no value"
const SENTINELS: [&str; 4] = ["-", "", "-999", "-999.0"];

/// Returns the markup document of a forecast export
///
/// If the export is a zip archive (kmz) the first member ending in .kml is returned,
/// otherwise the bytes are assumed to be the document itself.
///
/// # Arguments
///
/// * 'bytes' - the downloaded export
pub fn extract_kml(bytes: Vec<u8>) -> Result<Vec<u8>, WeatherError> {
    if !is_zip(&bytes) {
        return Ok(bytes);
    }

    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.name().to_lowercase().ends_with(".kml") {
            let mut kml = Vec::new();
            file.read_to_end(&mut kml)?;
            return Ok(kml);
        }
    }

    Err(WeatherError::from("archive contains no kml document"))
}

pub fn is_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(b"PK\x03\x04")
}

/// Decodes a markup document, MOSMIX declares ISO-8859-1 so anything that isn't
/// valid UTF-8 is taken as Latin-1
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => Cow::Owned(bytes.iter().map(|&b| b as char).collect()),
    }
}

/// Parses one token of a forecast series, sentinels become None
///
/// # Arguments
///
/// * 'token' - the token
pub fn parse_token(token: &str) -> Result<Option<f64>, WeatherError> {
    if SENTINELS.contains(&token) {
        return Ok(None);
    }

    token.parse::<f64>()
        .map(Some)
        .map_err(|e| WeatherError::Format(format!("bad value '{}': {}", token, e)))
}

/// Parses a whitespace separated forecast series
///
/// # Arguments
///
/// * 'raw' - the element's value text
pub fn parse_series(raw: &str) -> Result<Vec<Option<f64>>, WeatherError> {
    raw.split_whitespace().map(parse_token).collect()
}

fn has_name(node: &Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

/// Raw forecast series of one station keyed by element name
struct StationForecast {
    series: HashMap<String, String>,
}

impl StationForecast {
    fn from_placemark(placemark: Node) -> Self {
        let series = placemark
            .descendants()
            .filter(|n| has_name(n, "Forecast"))
            .filter_map(|n| {
                let element = n.attributes().find(|a| a.name() == "elementName")?.value();
                let value = n.children()
                    .find(|c| has_name(c, "value"))
                    .and_then(|c| c.text())
                    .unwrap_or("");
                Some((element.to_string(), value.to_string()))
            })
            .collect();

        Self { series }
    }

    /// Returns the parsed series, empty if the element isn't there
    fn get(&self, name: &str) -> Result<Vec<Option<f64>>, WeatherError> {
        self.series.get(name).map_or(Ok(Vec::new()), |raw| parse_series(raw))
    }

    /// Returns the first of the given elements that has a non empty series
    fn first_of(&self, names: &[&str]) -> Result<Vec<Option<f64>>, WeatherError> {
        for name in names {
            let series = self.get(name)?;
            if !series.is_empty() {
                return Ok(series);
            }
        }
        Ok(Vec::new())
    }
}

/// Parses a MOSMIX kml document into hourly forecasts for today and tomorrow
/// and a summary for today
///
/// Elements are matched on local name only since namespace URIs differ between
/// product variants.
///
/// # Arguments
///
/// * 'kml' - the kml document
/// * 'now' - current time in the civil timezone, decides what today is
/// * 'precip_aliases' - element names that may carry the probability of precipitation
pub fn parse_forecast(kml: &[u8], now: DateTime<Tz>, precip_aliases: &[&str]) -> Result<(Vec<HourlyForecast>, DailySummary), WeatherError> {
    let text = decode_text(kml);
    let doc = Document::parse(&text)?;
    let tz = now.timezone();

    let time_steps = doc
        .descendants()
        .filter(|n| has_name(n, "TimeStep"))
        .filter_map(|n| n.text().map(str::trim).filter(|t| !t.is_empty()))
        .map(|t| DateTime::parse_from_rfc3339(t).map(|d| d.with_timezone(&tz)))
        .collect::<Result<Vec<DateTime<Tz>>, chrono::ParseError>>()?;

    let placemark = doc
        .descendants()
        .find(|n| has_name(n, "Placemark"))
        .ok_or(WeatherError::from("forecast contains no station"))?;
    let station = StationForecast::from_placemark(placemark);

    let temps_k = station.get("TTT")?;
    let precip_prob = station.first_of(precip_aliases)?;
    let precip_amount = station.get("RR1c")?;
    let wind_speed = station.get("FF")?;
    let wind_dir = station.get("DD")?;
    let weather_code = station.get("ww")?;
    let sunshine = station.get("SunD1")?;

    let today = now.date_naive();
    let tomorrow = today.checked_add_days(Days::new(1));

    let hourly = time_steps
        .iter()
        .enumerate()
        .filter(|(_, ts)| ts.date_naive() == today || Some(ts.date_naive()) == tomorrow)
        .map(|(idx, ts)| {
            let at = |series: &[Option<f64>]| series.get(idx).copied().flatten();
            HourlyForecast {
                time: *ts,
                temperature_c: at(&temps_k).map(|k| round2(k - KELVIN_OFFSET)),
                precip_probability: at(&precip_prob),
                precip_amount: at(&precip_amount),
                wind_speed: at(&wind_speed),
                wind_direction: at(&wind_dir),
                weather_code: at(&weather_code).map(|c| c as i64),
            }
        })
        .collect::<Vec<HourlyForecast>>();

    let summary = summarize(&hourly, &sunshine, today);

    Ok((hourly, summary))
}

/// Builds the day summary from the filtered hourly forecasts
///
/// # Arguments
///
/// * 'hourly' - hourly forecasts for today and tomorrow
/// * 'sunshine' - the daily sunshine duration series in minutes
/// * 'today' - the current civil date
fn summarize(hourly: &[HourlyForecast], sunshine: &[Option<f64>], today: NaiveDate) -> DailySummary {
    let today_temps = hourly
        .iter()
        .filter(|h| h.time.date_naive() == today)
        .filter_map(|h| h.temperature_c);

    let (max_temp, min_temp) = today_temps.fold((None, None), |(max, min): (Option<f64>, Option<f64>), t| {
        (Some(max.map_or(t, |m| m.max(t))), Some(min.map_or(t, |m| m.min(t))))
    });

    DailySummary {
        max_temp,
        min_temp,
        sunshine_hours: sunshine.first().copied().flatten().map(|minutes| (minutes / 60.0 * 10.0).round() / 10.0),
        weather_symbol: Some(WeatherSymbol::from_code(hourly.first().and_then(|h| h.weather_code))),
    }
}
