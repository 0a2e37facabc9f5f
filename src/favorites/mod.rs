//! Favorite locations
//!
//! The favorites collection is stored as a single slot and read through a
//! query cache that is invalidated after every change.

mod manager;
mod model;

pub use manager::{FavoritesManager, FAVORITES_KEY};
pub use model::{
    canonical_coordinate, favorite_id, Coordinates, FavoriteCity, NewFavorite, ID_PRECISION,
};
