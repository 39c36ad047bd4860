//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - Configuration handling
//! - Geocoding, forecast and device-position collaborators
//! - An offline-first local store with location and weather repositories
//! - Display-unit conversion
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod location;
pub mod model;
pub mod position;
pub mod provider;
pub mod services;
pub mod store;
pub mod units;
pub mod weather;

pub use config::{Config, PositionSource};
pub use error::{Error, Result, Synced};
pub use location::{LocationDataSource, LocationRepository};
pub use model::{
    Coordinate, Location, LocationId, LocationWithWeather, NewLocation, Place, SavedCity, Weather,
};
pub use position::{PositionProvider, Priority};
pub use provider::{GeocodingApi, WeatherProvider};
pub use services::Services;
pub use store::Database;
pub use units::{DisplayWeather, UnitPreferences, convert_saved_cities, convert_weather};
pub use weather::{RefreshReport, WeatherRepository};
