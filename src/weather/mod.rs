//! Weather and geocoding API client
//!
//! Provides current conditions, forecasts and place lookup for favorites and
//! the current location.

mod client;
mod types;

pub use client::{ApiConfig, ApiError, WeatherApiClient, DEFAULT_BASE_URL};
pub use types::{
    condition_from_id, ForecastCity, ForecastData, ForecastEntry, GeocodingResponse,
    MainReadings, Units, WeatherCondition, WeatherData, WeatherDescription, WeatherSys, Wind,
};
