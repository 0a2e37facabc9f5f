//! Favorite location records and their identity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Decimal places kept when deriving a favorite's id (about 11 m at the equator)
pub const ID_PRECISION: usize = 4;

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lon)
    }
}

/// A location the user has saved
///
/// Serialized with camelCase keys; `state` is omitted when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteCity {
    /// Derived from the coordinates, see [`favorite_id`]
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Milliseconds since the Unix epoch
    pub added_at: i64,
}

impl FavoriteCity {
    /// Builds a favorite from user-supplied fields, stamping it with `added_at`
    pub fn from_new(attrs: NewFavorite, added_at: i64) -> Self {
        Self {
            id: favorite_id(attrs.lat, attrs.lon),
            name: attrs.name,
            lat: attrs.lat,
            lon: attrs.lon,
            country: attrs.country,
            state: attrs.state,
            added_at,
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lon)
    }

    /// "Name, State, Country" with the state left out when absent
    pub fn display_name(&self) -> String {
        match &self.state {
            Some(state) if !state.is_empty() => {
                format!("{}, {}, {}", self.name, state, self.country)
            }
            _ => format!("{}, {}", self.name, self.country),
        }
    }

    /// Time the favorite was added, if the stored timestamp is representable
    pub fn added_at_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.added_at)
    }
}

/// Fields supplied when adding a favorite
#[derive(Debug, Clone, PartialEq)]
pub struct NewFavorite {
    pub name: String,
    pub country: String,
    pub state: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

impl NewFavorite {
    pub fn new(name: impl Into<String>, country: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            name: name.into(),
            country: country.into(),
            state: None,
            lat,
            lon,
        }
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }
}

/// Derives the id of a favorite at the given coordinates
///
/// Each coordinate is rendered in canonical form and the two are joined with
/// `-`, so `(51.5, -0.1)` becomes `"51.5--0.1"`. Coordinates that agree to
/// [`ID_PRECISION`] decimal places share an id.
pub fn favorite_id(lat: f64, lon: f64) -> String {
    format!("{}-{}", canonical_coordinate(lat), canonical_coordinate(lon))
}

/// Renders a coordinate rounded to [`ID_PRECISION`] places with trailing zeros trimmed
pub fn canonical_coordinate(value: f64) -> String {
    let fixed = format!("{:.*}", ID_PRECISION, value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}
