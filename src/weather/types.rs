//! Response types for the OpenWeatherMap-compatible API

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::favorites::Coordinates;

/// Measurement system requested from the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Celsius, metres per second
    #[default]
    Metric,
    /// Fahrenheit, miles per hour
    Imperial,
    /// Kelvin, metres per second
    Standard,
}

impl Units {
    /// Value of the `units` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
            Self::Standard => "standard",
        }
    }

    pub fn temperature_symbol(&self) -> &'static str {
        match self {
            Self::Metric => "°C",
            Self::Imperial => "°F",
            Self::Standard => "K",
        }
    }

    pub fn speed_symbol(&self) -> &'static str {
        match self {
            Self::Imperial => "mph",
            Self::Metric | Self::Standard => "m/s",
        }
    }
}

/// Broad weather categories derived from condition ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeatherCondition {
    Clear,
    PartlyCloudy,
    Cloudy,
    Drizzle,
    Rain,
    Thunderstorm,
    Snow,
    Fog,
}

impl WeatherCondition {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::Thunderstorm => "Thunderstorm",
            Self::Snow => "Snow",
            Self::Fog => "Fog",
        }
    }
}

/// Map an OpenWeatherMap condition id to a WeatherCondition
///
/// Condition groups:
/// - 2xx: Thunderstorm
/// - 3xx: Drizzle
/// - 5xx: Rain
/// - 6xx: Snow
/// - 7xx: Atmosphere (mist, smoke, haze, fog...)
/// - 800: Clear sky
/// - 801-802: Few/scattered clouds
/// - 803-804: Broken/overcast clouds
pub fn condition_from_id(id: u16) -> WeatherCondition {
    match id {
        200..=299 => WeatherCondition::Thunderstorm,
        300..=399 => WeatherCondition::Drizzle,
        500..=599 => WeatherCondition::Rain,
        600..=699 => WeatherCondition::Snow,
        700..=799 => WeatherCondition::Fog,
        800 => WeatherCondition::Clear,
        801..=802 => WeatherCondition::PartlyCloudy,
        _ => WeatherCondition::Cloudy,
    }
}

/// One entry of the `weather` array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherDescription {
    pub id: u16,
    pub main: String,
    pub description: String,
    pub icon: String,
}

/// Temperature, pressure and humidity readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainReadings {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: f64,
    pub humidity: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
    #[serde(default)]
    pub deg: Option<f64>,
    #[serde(default)]
    pub gust: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WeatherSys {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub sunrise: Option<i64>,
    #[serde(default)]
    pub sunset: Option<i64>,
}

/// Current conditions at a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherData {
    pub coord: Coordinates,
    pub weather: Vec<WeatherDescription>,
    pub main: MainReadings,
    pub wind: Wind,
    #[serde(default)]
    pub visibility: Option<u32>,
    /// Observation time, seconds since the Unix epoch
    pub dt: i64,
    #[serde(default)]
    pub sys: WeatherSys,
    /// Offset from UTC in seconds
    #[serde(default)]
    pub timezone: i64,
    pub name: String,
}

impl WeatherData {
    /// Condition of the primary weather entry
    pub fn condition(&self) -> Option<WeatherCondition> {
        self.weather.first().map(|w| condition_from_id(w.id))
    }

    /// Free-text description of the primary weather entry
    pub fn summary(&self) -> &str {
        self.weather
            .first()
            .map(|w| w.description.as_str())
            .unwrap_or("unknown")
    }
}

/// One three-hourly forecast step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub dt: i64,
    pub main: MainReadings,
    pub weather: Vec<WeatherDescription>,
    pub wind: Wind,
    /// Probability of precipitation (0.0 to 1.0)
    #[serde(default)]
    pub pop: Option<f64>,
    pub dt_txt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastCity {
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    pub coord: Coordinates,
    #[serde(default)]
    pub timezone: i64,
}

/// Five-day forecast in three-hour steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastData {
    pub list: Vec<ForecastEntry>,
    pub city: ForecastCity,
}

/// A place returned by direct or reverse geocoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodingResponse {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub country: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub local_names: Option<HashMap<String, String>>,
}

impl GeocodingResponse {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lon)
    }
}
