//! Command-line interface parsing for wxfav
//!
//! This module handles parsing of CLI arguments using clap and resolves them,
//! together with their environment variable fallbacks, into an `AppConfig`.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::favorites::Coordinates;
use crate::weather::{ApiConfig, Units, DEFAULT_BASE_URL};

/// Error types for CLI arguments and configuration
#[derive(Debug, Error)]
pub enum CliError {
    /// A latitude or longitude was not a number in range
    #[error("Invalid {axis}: '{value}'. Expected a number between {min} and {max}")]
    InvalidCoordinate {
        axis: &'static str,
        value: String,
        min: f64,
        max: f64,
    },

    /// A weather command was run without an API key
    #[error("No API key configured. Pass --api-key or set OPENWEATHER_API_KEY")]
    MissingApiKey,

    /// No favorite has the given id
    #[error("No favorite with id '{0}'. Run `wxfav list` to see saved ids")]
    UnknownFavorite(String),

    /// A search result number was out of range
    #[error("No search result #{index}; the search returned {count} result(s)")]
    InvalidSelection { index: usize, count: usize },
}

/// wxfav - Keep favorite locations and check their weather
#[derive(Parser, Debug)]
#[command(name = "wxfav")]
#[command(about = "Favorite locations and their weather")]
#[command(version)]
pub struct Cli {
    /// Directory holding favorites.json (defaults to the platform data directory)
    #[arg(long, global = true, env = "WXFAV_DATA_DIR", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// OpenWeatherMap API key, required for weather and search commands
    #[arg(long, global = true, env = "OPENWEATHER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the weather API
    #[arg(long, global = true, env = "WXFAV_API_URL", default_value = DEFAULT_BASE_URL)]
    pub api_url: String,

    /// Measurement system for temperatures and wind speed
    #[arg(long, global = true, env = "WXFAV_UNITS", value_enum, default_value_t = Units::Metric)]
    pub units: Units,

    /// Seconds to wait for a location fix
    #[arg(long, global = true, default_value_t = 10, value_name = "SECS")]
    pub location_timeout: u64,

    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// List saved favorites
    List,

    /// Save a location as a favorite
    Add {
        /// Latitude in decimal degrees
        #[arg(long, allow_negative_numbers = true, value_parser = parse_latitude)]
        lat: f64,
        /// Longitude in decimal degrees
        #[arg(long, allow_negative_numbers = true, value_parser = parse_longitude)]
        lon: f64,
        /// Display name
        #[arg(long)]
        name: String,
        /// Country code, e.g. GB
        #[arg(long)]
        country: String,
        /// Region or state
        #[arg(long)]
        state: Option<String>,
    },

    /// Remove a favorite by id
    Remove {
        /// Favorite id as shown by `wxfav list`
        #[arg(allow_hyphen_values = true)]
        id: String,
    },

    /// Check whether a location is a favorite
    Check {
        #[arg(long, allow_negative_numbers = true, value_parser = parse_latitude)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true, value_parser = parse_longitude)]
        lon: f64,
    },

    /// Search locations by name
    Search {
        /// Place name, e.g. "Portland, US"
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        /// Save the Nth result (1-based) as a favorite
        #[arg(long, value_name = "N")]
        add: Option<usize>,
    },

    /// Show weather for a favorite, coordinates, or the current location
    ///
    /// Examples:
    ///   wxfav weather                        # Current location
    ///   wxfav weather 51.5--0.1              # A saved favorite
    ///   wxfav weather --lat 51.5 --lon -0.1  # Any coordinates
    Weather {
        /// Favorite id
        #[arg(allow_hyphen_values = true, conflicts_with_all = ["lat", "lon"])]
        id: Option<String>,
        #[arg(long, allow_negative_numbers = true, value_parser = parse_latitude, requires = "lon")]
        lat: Option<f64>,
        #[arg(long, allow_negative_numbers = true, value_parser = parse_longitude, requires = "lat")]
        lon: Option<f64>,
        /// Show the five-day forecast instead of current conditions
        #[arg(long)]
        forecast: bool,
    },

    /// Current weather for every favorite
    Overview,
}

/// What a `weather` command should show weather for
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherTarget {
    Favorite(String),
    Coordinates(Coordinates),
    CurrentLocation,
}

impl WeatherTarget {
    pub fn from_args(id: Option<String>, lat: Option<f64>, lon: Option<f64>) -> Self {
        match (id, lat, lon) {
            (Some(id), _, _) => Self::Favorite(id),
            (None, Some(lat), Some(lon)) => Self::Coordinates(Coordinates::new(lat, lon)),
            _ => Self::CurrentLocation,
        }
    }
}

fn parse_coordinate(
    s: &str,
    axis: &'static str,
    min: f64,
    max: f64,
) -> Result<f64, CliError> {
    let invalid = || CliError::InvalidCoordinate {
        axis,
        value: s.to_string(),
        min,
        max,
    };
    let value: f64 = s.trim().parse().map_err(|_| invalid())?;
    if !value.is_finite() || value < min || value > max {
        return Err(invalid());
    }
    Ok(value)
}

/// Parses a latitude argument in [-90, 90]
pub fn parse_latitude(s: &str) -> Result<f64, CliError> {
    parse_coordinate(s, "latitude", -90.0, 90.0)
}

/// Parses a longitude argument in [-180, 180]
pub fn parse_longitude(s: &str) -> Result<f64, CliError> {
    parse_coordinate(s, "longitude", -180.0, 180.0)
}

/// Configuration derived from CLI arguments and environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Explicit data directory, if one was given
    pub data_dir: Option<PathBuf>,
    /// API key, if one was given
    pub api_key: Option<String>,
    pub api_url: String,
    pub units: Units,
    pub location_timeout: Duration,
    /// Log verbosity passed to the tracing subscriber
    pub verbose: u8,
}

impl AppConfig {
    /// Creates an AppConfig from parsed CLI arguments
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            data_dir: cli.data_dir.clone(),
            api_key: cli
                .api_key
                .as_ref()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            api_url: cli.api_url.clone(),
            units: cli.units,
            location_timeout: Duration::from_secs(cli.location_timeout),
            verbose: cli.verbose,
        }
    }

    /// Weather API settings
    ///
    /// # Returns
    /// * `Err(CliError::MissingApiKey)` if no key was configured
    pub fn api_config(&self) -> Result<ApiConfig, CliError> {
        let key = self.api_key.as_ref().ok_or(CliError::MissingApiKey)?;
        Ok(ApiConfig::new(key.clone())
            .with_base_url(self.api_url.clone())
            .with_units(self.units))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            api_key: None,
            api_url: DEFAULT_BASE_URL.to_string(),
            units: Units::default(),
            location_timeout: Duration::from_secs(10),
            verbose: 0,
        }
    }
}
