//! Current-location acquisition
//!
//! A [`GeolocationProvider`] produces coordinates for the device. The
//! [`LocationTracker`] wraps a provider with a bounded wait and keeps the
//! latest outcome (coordinates or error message) for display code to read.

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::favorites::Coordinates;

/// Default wait before giving up on a location fix
pub const DEFAULT_LOCATION_TIMEOUT: Duration = Duration::from_secs(10);

const IP_API_URL: &str = "http://ip-api.com/json";

/// Errors that can occur when acquiring the current location
#[derive(Debug, Error)]
pub enum LocationError {
    /// The provider did not answer in time
    #[error("Timed out after {0:?} waiting for location")]
    Timeout(Duration),

    /// The provider answered but could not locate the device
    #[error("Location unavailable: {0}")]
    Unavailable(String),

    /// HTTP request failed
    #[error("Location request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Source of the device's current coordinates
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    async fn locate(&self) -> Result<Coordinates, LocationError>;
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
}

/// Approximates the location from the public IP address
#[derive(Debug, Clone)]
pub struct IpGeolocation {
    client: Client,
    url: String,
}

impl IpGeolocation {
    pub fn new() -> Self {
        Self::with_url(IP_API_URL)
    }

    /// Creates a provider that queries a custom endpoint (for testing)
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

impl Default for IpGeolocation {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GeolocationProvider for IpGeolocation {
    async fn locate(&self) -> Result<Coordinates, LocationError> {
        let response: IpApiResponse = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match (response.status.as_str(), response.lat, response.lon) {
            ("success", Some(lat), Some(lon)) => Ok(Coordinates::new(lat, lon)),
            _ => Err(LocationError::Unavailable(
                response
                    .message
                    .unwrap_or_else(|| "no coordinates in response".to_string()),
            )),
        }
    }
}

#[derive(Debug, Default)]
struct LocationState {
    coordinates: Option<Coordinates>,
    error: Option<String>,
    is_loading: bool,
}

/// Latest location fix and its loading/error status
pub struct LocationTracker<P> {
    provider: P,
    timeout: Duration,
    state: RwLock<LocationState>,
}

impl<P: GeolocationProvider> LocationTracker<P> {
    pub fn new(provider: P) -> Self {
        Self::with_timeout(provider, DEFAULT_LOCATION_TIMEOUT)
    }

    pub fn with_timeout(provider: P, timeout: Duration) -> Self {
        Self {
            provider,
            timeout,
            state: RwLock::new(LocationState::default()),
        }
    }

    /// Coordinates from the last successful attempt
    pub fn coordinates(&self) -> Option<Coordinates> {
        self.state.read().coordinates
    }

    /// Message from the last failed attempt
    pub fn error(&self) -> Option<String> {
        self.state.read().error.clone()
    }

    /// Whether an attempt is in progress
    pub fn is_loading(&self) -> bool {
        self.state.read().is_loading
    }

    /// Asks the provider for a fresh fix, waiting at most the configured timeout
    pub async fn retry(&self) -> Result<Coordinates, LocationError> {
        self.state.write().is_loading = true;

        let result = match tokio::time::timeout(self.timeout, self.provider.locate()).await {
            Ok(result) => result,
            Err(_) => Err(LocationError::Timeout(self.timeout)),
        };

        let mut state = self.state.write();
        state.is_loading = false;
        match &result {
            Ok(coords) => {
                tracing::info!(lat = coords.lat, lon = coords.lon, "Location acquired");
                state.coordinates = Some(*coords);
                state.error = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to acquire location");
                state.coordinates = None;
                state.error = Some(e.to_string());
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FixedProvider(Coordinates);

    #[async_trait]
    impl GeolocationProvider for FixedProvider {
        async fn locate(&self) -> Result<Coordinates, LocationError> {
            Ok(self.0)
        }
    }

    struct SlowProvider(Duration);

    #[async_trait]
    impl GeolocationProvider for SlowProvider {
        async fn locate(&self) -> Result<Coordinates, LocationError> {
            tokio::time::sleep(self.0).await;
            Ok(Coordinates::new(1.0, 2.0))
        }
    }

    struct DeniedProvider;

    #[async_trait]
    impl GeolocationProvider for DeniedProvider {
        async fn locate(&self) -> Result<Coordinates, LocationError> {
            Err(LocationError::Unavailable("permission denied".to_string()))
        }
    }

    #[tokio::test]
    async fn test_tracker_starts_empty() {
        let tracker = LocationTracker::new(DeniedProvider);

        assert!(tracker.coordinates().is_none());
        assert!(tracker.error().is_none());
        assert!(!tracker.is_loading());
    }

    #[tokio::test]
    async fn test_retry_success_stores_coordinates() {
        let tracker = LocationTracker::new(FixedProvider(Coordinates::new(51.5, -0.1)));

        let coords = tracker.retry().await.expect("Provider should succeed");

        assert_eq!(coords, Coordinates::new(51.5, -0.1));
        assert_eq!(tracker.coordinates(), Some(coords));
        assert!(tracker.error().is_none());
        assert!(!tracker.is_loading());
    }

    #[tokio::test]
    async fn test_retry_failure_stores_error() {
        let tracker = LocationTracker::new(DeniedProvider);

        assert!(tracker.retry().await.is_err());

        assert!(tracker.coordinates().is_none());
        assert!(tracker.error().unwrap().contains("permission denied"));
    }

    #[tokio::test]
    async fn test_retry_times_out() {
        let tracker = LocationTracker::with_timeout(
            SlowProvider(Duration::from_secs(5)),
            Duration::from_millis(20),
        );

        let err = tracker.retry().await.unwrap_err();

        assert!(matches!(err, LocationError::Timeout(_)));
        assert!(tracker.error().unwrap().contains("Timed out"));
        assert!(!tracker.is_loading());
    }

    #[tokio::test]
    async fn test_is_loading_during_retry() {
        let tracker = Arc::new(LocationTracker::new(SlowProvider(Duration::from_millis(100))));

        let task = {
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move { tracker.retry().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(tracker.is_loading());

        task.await.unwrap().expect("Provider should succeed");
        assert!(!tracker.is_loading());
    }

    #[tokio::test]
    async fn test_ip_geolocation_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"status": "success", "country": "Canada", "city": "Vancouver", "lat": 49.2827, "lon": -123.1207}"#,
            ))
            .mount(&server)
            .await;

        let provider = IpGeolocation::with_url(server.uri());
        let coords = provider.locate().await.expect("Lookup should succeed");

        assert_eq!(coords, Coordinates::new(49.2827, -123.1207));
    }

    #[tokio::test]
    async fn test_ip_geolocation_failure_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"status": "fail", "message": "private range"}"#),
            )
            .mount(&server)
            .await;

        let provider = IpGeolocation::with_url(server.uri());
        let err = provider.locate().await.unwrap_err();

        assert!(err.to_string().contains("private range"));
    }
}
