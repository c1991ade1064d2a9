use std::fmt;
use std::fmt::Formatter;
use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;

/// One forecast time step for the configured station
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct HourlyForecast {
    pub time: DateTime<Tz>,
    pub temperature_c: Option<f64>,
    pub precip_probability: Option<f64>,
    pub precip_amount: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub weather_code: Option<i64>,
}

/// Symbol class derived from a present weather code
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WeatherSymbol {
    Clear,
    PartlyCloudy,
    Fog,
    Rain,
    Snow,
    Showers,
    Storm,
    Cloudy,
    Unknown,
}

impl WeatherSymbol {
    /// Maps a present weather code (ww) to a symbol class
    ///
    /// # Arguments
    ///
    /// * 'code' - the weather code, None if the source had no value
    pub fn from_code(code: Option<i64>) -> WeatherSymbol {
        match code {
            None => WeatherSymbol::Unknown,
            Some(0..=2) => WeatherSymbol::Clear,
            Some(3..=4) => WeatherSymbol::PartlyCloudy,
            Some(45) | Some(48) => WeatherSymbol::Fog,
            Some(51..=67) => WeatherSymbol::Rain,
            Some(71..=77) => WeatherSymbol::Snow,
            Some(80..=82) => WeatherSymbol::Showers,
            Some(95..=99) => WeatherSymbol::Storm,
            Some(_) => WeatherSymbol::Cloudy,
        }
    }

    /// Glyph used when rendering the symbol on a page
    pub fn glyph(&self) -> &'static str {
        match self {
            WeatherSymbol::Clear => "☀️",
            WeatherSymbol::PartlyCloudy => "⛅",
            WeatherSymbol::Fog => "🌫️",
            WeatherSymbol::Rain => "🌦️",
            WeatherSymbol::Snow => "❄️",
            WeatherSymbol::Showers => "🌧️",
            WeatherSymbol::Storm => "⛈️",
            WeatherSymbol::Cloudy => "☁️",
            WeatherSymbol::Unknown => "❔",
        }
    }
}

impl fmt::Display for WeatherSymbol {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.glyph())
    }
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct DailySummary {
    pub max_temp: Option<f64>,
    pub min_temp: Option<f64>,
    pub sunshine_hours: Option<f64>,
    pub weather_symbol: Option<WeatherSymbol>,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Warning {
    pub area: String,
    pub severity: String,
    pub onset: String,
    pub expires: String,
    pub headline: String,
    pub description: String,
}

/// Everything known about the weather at one point in time
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub updated_at: DateTime<Tz>,
    pub hourly: Vec<HourlyForecast>,
    pub today_summary: DailySummary,
    pub warnings: Vec<Warning>,
}
