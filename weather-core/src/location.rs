//! Coordinate <-> city lookups.
//!
//! Two data sources answer the same questions: the geocoding service and the
//! local store. [`LocationRepository`] writes what the remote says into the
//! store and always answers from the store.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::Result,
    model::{Coordinate, NewLocation},
};

pub mod local;
pub mod remote;
pub mod repository;

pub use local::LocalLocationDataSource;
pub use remote::RemoteLocationDataSource;
pub use repository::LocationRepository;

#[async_trait]
pub trait LocationDataSource: Send + Sync + Debug {
    async fn get_coordinate(&self, city: &str) -> Result<Coordinate>;

    async fn get_city_name(&self, coordinate: Coordinate) -> Result<String>;

    async fn save_location(&self, location: NewLocation) -> Result<()>;
}
