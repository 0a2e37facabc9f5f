//! Command execution for wxfav
//!
//! The `App` owns the favorites manager and builds the weather client on
//! demand, so commands that only touch favorites work without an API key.
//! Output is written to any `io::Write`, which keeps commands testable.

use std::io::{self, Write};
use std::sync::Arc;
use thiserror::Error;

use crate::cli::{AppConfig, CliError, Commands, WeatherTarget};
use crate::favorites::{Coordinates, FavoritesManager, NewFavorite};
use crate::location::{IpGeolocation, LocationError, LocationTracker};
use crate::output;
use crate::store::{DiskStore, MemoryStore, SlotStorage};
use crate::weather::{ApiError, WeatherApiClient};

/// Errors surfaced to the user by a command
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Cli(#[from] CliError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error("Failed to write output: {0}")]
    Io(#[from] io::Error),
}

/// Picks the storage backend for favorites
///
/// An explicit data directory wins; otherwise the platform data directory is
/// used. With neither available favorites are kept in memory for this run.
pub fn open_storage(config: &AppConfig) -> Arc<dyn SlotStorage> {
    if let Some(dir) = &config.data_dir {
        return Arc::new(DiskStore::with_dir(dir.clone()));
    }
    match DiskStore::new() {
        Some(store) => {
            tracing::debug!(data_dir = ?store.data_dir(), "Using platform data directory");
            Arc::new(store)
        }
        None => {
            tracing::warn!("No data directory available; favorites will not be saved");
            Arc::new(MemoryStore::new())
        }
    }
}

/// Main application struct tying configuration, favorites and API access together
pub struct App {
    config: AppConfig,
    favorites: FavoritesManager,
}

impl App {
    /// Creates an App storing favorites according to `config`
    pub fn new(config: AppConfig) -> Self {
        let storage = open_storage(&config);
        Self::with_storage(config, storage)
    }

    /// Creates an App with a specific storage backend (for testing)
    pub fn with_storage(config: AppConfig, storage: Arc<dyn SlotStorage>) -> Self {
        Self {
            config,
            favorites: FavoritesManager::new(storage),
        }
    }

    pub fn favorites(&self) -> &FavoritesManager {
        &self.favorites
    }

    fn weather_client(&self) -> Result<WeatherApiClient, AppError> {
        Ok(WeatherApiClient::new(self.config.api_config()?)?)
    }

    /// Runs one command, writing its output to `out`
    pub async fn run<W: Write>(&self, command: Commands, out: &mut W) -> Result<(), AppError> {
        match command {
            Commands::List => {
                write!(out, "{}", output::format_favorites(&self.favorites.read()))?;
            }
            Commands::Add {
                lat,
                lon,
                name,
                country,
                state,
            } => {
                let mut attrs = NewFavorite::new(name, country, lat, lon);
                attrs.state = state;
                self.add_favorite(attrs, out)?;
            }
            Commands::Remove { id } => {
                let before = self.favorites.read().len();
                let after = self.favorites.remove(&id);
                if after.len() < before {
                    writeln!(out, "Removed {}", id)?;
                } else {
                    writeln!(out, "No favorite with id {}", id)?;
                }
            }
            Commands::Check { lat, lon } => {
                if self.favorites.is_favorite(lat, lon) {
                    writeln!(out, "{} is a favorite", Coordinates::new(lat, lon))?;
                } else {
                    writeln!(out, "{} is not a favorite", Coordinates::new(lat, lon))?;
                }
            }
            Commands::Search { query, add } => {
                self.search(&query.join(" "), add, out).await?;
            }
            Commands::Weather {
                id,
                lat,
                lon,
                forecast,
            } => {
                self.weather(WeatherTarget::from_args(id, lat, lon), forecast, out)
                    .await?;
            }
            Commands::Overview => {
                self.overview(out).await?;
            }
        }
        Ok(())
    }

    fn add_favorite<W: Write>(&self, attrs: NewFavorite, out: &mut W) -> Result<(), AppError> {
        let label = attrs.name.clone();
        let already = self.favorites.is_favorite(attrs.lat, attrs.lon);
        let favorites = self.favorites.add(attrs);

        if already {
            writeln!(out, "{} is already a favorite", label)?;
        } else if let Some(city) = favorites.last() {
            writeln!(out, "Added {} as {}", city.display_name(), city.id)?;
        }
        Ok(())
    }

    async fn search<W: Write>(
        &self,
        text: &str,
        add: Option<usize>,
        out: &mut W,
    ) -> Result<(), AppError> {
        let client = self.weather_client()?;
        let results = client.search_locations(text).await?;

        write!(
            out,
            "{}",
            output::format_search_results(&results, |lat, lon| {
                self.favorites.is_favorite(lat, lon)
            })
        )?;

        if let Some(index) = add {
            let place = index
                .checked_sub(1)
                .and_then(|i| results.get(i))
                .ok_or(CliError::InvalidSelection {
                    index,
                    count: results.len(),
                })?;
            let mut attrs =
                NewFavorite::new(place.name.clone(), place.country.clone(), place.lat, place.lon);
            attrs.state = place.state.clone();
            self.add_favorite(attrs, out)?;
        }
        Ok(())
    }

    async fn weather<W: Write>(
        &self,
        target: WeatherTarget,
        forecast: bool,
        out: &mut W,
    ) -> Result<(), AppError> {
        let client = self.weather_client()?;

        let (label, coords) = match target {
            WeatherTarget::Favorite(id) => {
                let city = self
                    .favorites
                    .get(&id)
                    .ok_or(CliError::UnknownFavorite(id))?;
                (city.display_name(), city.coordinates())
            }
            WeatherTarget::Coordinates(coords) => (coords.to_string(), coords),
            WeatherTarget::CurrentLocation => {
                let tracker = LocationTracker::with_timeout(
                    IpGeolocation::new(),
                    self.config.location_timeout,
                );
                let coords = tracker.retry().await?;
                let label = match client.reverse_geocode(coords).await {
                    Ok(places) => places
                        .first()
                        .map(|p| format!("Current location: {}, {}", p.name, p.country))
                        .unwrap_or_else(|| format!("Current location: {}", coords)),
                    Err(e) => {
                        tracing::debug!(error = %e, "Reverse geocoding failed");
                        format!("Current location: {}", coords)
                    }
                };
                (label, coords)
            }
        };

        if forecast {
            let data = client.get_forecast(coords).await?;
            write!(out, "{}", output::format_forecast(&data, client.units()))?;
        } else {
            let data = client.get_current_weather(coords).await?;
            let favorite = self.favorites.is_favorite(coords.lat, coords.lon);
            write!(
                out,
                "{}",
                output::format_weather(&label, &data, client.units(), favorite)
            )?;
        }
        Ok(())
    }

    async fn overview<W: Write>(&self, out: &mut W) -> Result<(), AppError> {
        let favorites = self.favorites.read();
        if favorites.is_empty() {
            write!(out, "{}", output::format_favorites(&favorites))?;
            return Ok(());
        }

        let client = self.weather_client()?;
        let requests = favorites
            .iter()
            .map(|city| client.get_current_weather(city.coordinates()));
        let results = futures::future::join_all(requests).await;

        for (city, result) in favorites.iter().zip(results) {
            match result {
                Ok(weather) => write!(
                    out,
                    "{}",
                    output::format_weather(&city.display_name(), &weather, client.units(), true)
                )?,
                Err(e) => {
                    tracing::warn!(id = %city.id, error = %e, "Failed to fetch weather");
                    writeln!(out, "{}\n  unavailable: {}", city.display_name(), e)?;
                }
            }
        }
        Ok(())
    }
}
