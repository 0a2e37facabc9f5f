//! OpenWeatherMap-compatible API client
//!
//! Stateless wrapper around the current weather, forecast and geocoding
//! endpoints. The client is built explicitly from an [`ApiConfig`]; tests
//! point `base_url` at a mock server or inject their own `reqwest::Client`.

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

use super::types::{ForecastData, GeocodingResponse, Units, WeatherData};
use crate::favorites::Coordinates;

/// Base URL for the OpenWeatherMap API
pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

/// Number of results requested from location search
const SEARCH_LIMIT: u8 = 5;

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Errors that can occur when calling the weather API
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("Weather API request failed: {status} {reason}")]
    Status { status: u16, reason: String },

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Connection settings for the weather API
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: String,
    pub units: Units,
}

impl ApiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            units: Units::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }
}

/// Client for the weather and geocoding endpoints
#[derive(Debug, Clone)]
pub struct WeatherApiClient {
    client: Client,
    config: ApiConfig,
}

impl WeatherApiClient {
    /// Create a new client with a default HTTP client
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Create a new client with a custom HTTP client
    pub fn with_client(client: Client, config: ApiConfig) -> Self {
        Self { client, config }
    }

    pub fn units(&self) -> Units {
        self.config.units
    }

    /// Fetch current conditions at `coords`
    pub async fn get_current_weather(&self, coords: Coordinates) -> Result<WeatherData, ApiError> {
        self.get_json(
            "/data/2.5/weather",
            &[
                ("lat", coords.lat.to_string()),
                ("lon", coords.lon.to_string()),
                ("units", self.config.units.as_str().to_string()),
            ],
        )
        .await
    }

    /// Fetch the five-day, three-hourly forecast at `coords`
    pub async fn get_forecast(&self, coords: Coordinates) -> Result<ForecastData, ApiError> {
        self.get_json(
            "/data/2.5/forecast",
            &[
                ("lat", coords.lat.to_string()),
                ("lon", coords.lon.to_string()),
                ("units", self.config.units.as_str().to_string()),
            ],
        )
        .await
    }

    /// Look up the place nearest to `coords`
    pub async fn reverse_geocode(
        &self,
        coords: Coordinates,
    ) -> Result<Vec<GeocodingResponse>, ApiError> {
        self.get_json(
            "/geo/1.0/reverse",
            &[
                ("lat", coords.lat.to_string()),
                ("lon", coords.lon.to_string()),
                ("limit", "1".to_string()),
            ],
        )
        .await
    }

    /// Search places by name
    ///
    /// Blank queries return no results without contacting the API.
    pub async fn search_locations(&self, text: &str) -> Result<Vec<GeocodingResponse>, ApiError> {
        let query = text.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        self.get_json(
            "/geo/1.0/direct",
            &[
                ("q", query.to_string()),
                ("limit", SEARCH_LIMIT.to_string()),
            ],
        )
        .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.config.base_url, path);
        tracing::debug!(url = %url, "Calling weather API");

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("appid", self.config.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = status.as_u16(), "Weather API returned an error");
            return Err(ApiError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}
