use async_trait::async_trait;

use crate::{
    error::{Error, Result},
    location::LocationDataSource,
    model::{Coordinate, NewLocation},
    store::LocationStore,
};

/// Store-backed data source. Saving upserts by city.
#[derive(Debug, Clone)]
pub struct LocalLocationDataSource {
    store: LocationStore,
}

impl LocalLocationDataSource {
    pub fn new(store: LocationStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &LocationStore {
        &self.store
    }
}

#[async_trait]
impl LocationDataSource for LocalLocationDataSource {
    async fn get_coordinate(&self, city: &str) -> Result<Coordinate> {
        self.store
            .get_by_city(city)
            .await?
            .map(|l| l.coordinate)
            .ok_or_else(|| Error::NotFound("Location".into()))
    }

    async fn get_city_name(&self, coordinate: Coordinate) -> Result<String> {
        self.store
            .get_by_coordinate(coordinate)
            .await?
            .map(|l| l.city)
            .ok_or_else(|| Error::NotFound("City".into()))
    }

    async fn save_location(&self, location: NewLocation) -> Result<()> {
        self.store.upsert(location).await.map(|_| ())
    }
}
