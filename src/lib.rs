//! wxfav Library
//!
//! Favorite weather locations persisted on the device, plus the weather and
//! geolocation clients used to show conditions for them.

pub mod app;
pub mod cli;
pub mod favorites;
pub mod location;
pub mod logging;
pub mod output;
pub mod query;
pub mod store;
pub mod weather;
