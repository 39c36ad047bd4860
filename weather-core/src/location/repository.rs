use std::{sync::Arc, time::Duration};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::{
    error::{Error, Result, Synced},
    location::{LocalLocationDataSource, LocationDataSource, RemoteLocationDataSource},
    model::{Coordinate, Location, LocationId, NewLocation, Place},
    position::{PositionProvider, Priority},
};

/// Suggestions are only looked up from this many characters on.
const MIN_SEARCH_LEN: usize = 2;

/// Offline-first location lookups.
///
/// Forced lookups write the remote answer into the local store, then read the
/// local store; a failed write phase is reported next to the cached value
/// instead of failing the read.
#[derive(Debug, Clone)]
pub struct LocationRepository {
    local: LocalLocationDataSource,
    remote: RemoteLocationDataSource,
    position: Arc<dyn PositionProvider>,
    position_timeout: Duration,
}

async fn sync_by_city(
    remote: &dyn LocationDataSource,
    local: &dyn LocationDataSource,
    city: &str,
) -> Result<()> {
    let coordinate = remote.get_coordinate(city).await?;
    local.save_location(NewLocation::new(city, coordinate)).await
}

async fn sync_by_coordinate(
    remote: &dyn LocationDataSource,
    local: &dyn LocationDataSource,
    coordinate: Coordinate,
) -> Result<()> {
    let city = remote.get_city_name(coordinate).await?;
    local.save_location(NewLocation::new(city, coordinate)).await
}

impl LocationRepository {
    pub fn new(
        local: LocalLocationDataSource,
        remote: RemoteLocationDataSource,
        position: Arc<dyn PositionProvider>,
        position_timeout: Duration,
    ) -> Self {
        Self { local, remote, position, position_timeout }
    }

    #[instrument(skip(self))]
    pub async fn get_coordinate_by_city(
        &self,
        city: &str,
        force_update: bool,
    ) -> Result<Synced<Coordinate>> {
        let city = city.trim();
        let refresh_error = if force_update {
            sync_by_city(&self.remote, &self.local, city).await.err()
        } else {
            None
        };
        if let Some(err) = &refresh_error {
            warn!(city, error = %err, "Location refresh failed, serving stored value");
        }

        let value = self.local.get_coordinate(city).await?;
        Ok(Synced { value, refresh_error })
    }

    #[instrument(skip(self), fields(coordinate = %coordinate))]
    pub async fn get_city_by_coordinate(
        &self,
        coordinate: Coordinate,
        force_update: bool,
    ) -> Result<Synced<String>> {
        let refresh_error = if force_update {
            sync_by_coordinate(&self.remote, &self.local, coordinate).await.err()
        } else {
            None
        };
        if let Some(err) = &refresh_error {
            warn!(error = %err, "City refresh failed, serving stored value");
        }

        let value = self.local.get_city_name(coordinate.unified()).await?;
        Ok(Synced { value, refresh_error })
    }

    /// High-accuracy fix, bounded by the configured position timeout.
    pub async fn get_current_coordinate(&self) -> Result<Coordinate> {
        timeout(self.position_timeout, self.position.current_position(Priority::HighAccuracy))
            .await
            .map_err(|_| Error::Timeout("Position fix".into()))?
    }

    pub async fn get_locations(&self) -> Result<Vec<Location>> {
        self.local.store().get_all().await
    }

    pub async fn get_location(&self, id: LocationId) -> Result<Location> {
        self.local
            .store()
            .get_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Location {id}")))
    }

    #[instrument(skip(self))]
    pub async fn delete_location(&self, id: LocationId) -> Result<()> {
        if self.local.store().delete_by_id(id).await? {
            info!(id, "Location deleted");
            Ok(())
        } else {
            Err(Error::NotFound(format!("Location {id}")))
        }
    }

    /// Suggestions for a search box. Short queries return nothing without a lookup.
    pub async fn search_places(&self, query: &str) -> Result<Vec<Place>> {
        let query = query.trim();
        if query.chars().count() < MIN_SEARCH_LEN {
            return Ok(Vec::new());
        }
        self.remote.search(query).await
    }

    pub async fn save_place(&self, place: Place) -> Result<Location> {
        self.local.store().upsert(NewLocation::from(place)).await
    }

    /// Re-derive the current location from a fresh position fix.
    ///
    /// A previous current location that only ever came from a position fix is
    /// dropped once the device is elsewhere, or when location access is denied
    /// or disabled. Locations the user saved keep their row and lose the flag.
    #[instrument(skip(self))]
    pub async fn update_current_location(&self) -> Result<Location> {
        let store = self.local.store();
        let previous = store.get_current().await?;

        let coordinate = match self.get_current_coordinate().await {
            Ok(c) => c,
            Err(err) => {
                if err.is_location_access() {
                    if let Some(stale) = &previous {
                        self.retire_current(stale).await?;
                    }
                }
                return Err(err);
            }
        };

        let place = self.remote.place_at(coordinate).await?;
        let saved = store.upsert(NewLocation::from(place).current().from_position()).await?;

        if let Some(old) = previous.filter(|old| old.id != saved.id && old.from_position) {
            debug!(id = old.id, city = %old.city, "Dropping previous current location");
            store.delete_by_id(old.id).await?;
        }

        info!(id = saved.id, city = %saved.city, "Current location updated");
        Ok(saved)
    }

    async fn retire_current(&self, stale: &Location) -> Result<()> {
        let store = self.local.store();
        if stale.from_position {
            debug!(id = stale.id, "Removing current location after access loss");
            store.delete_by_id(stale.id).await?;
        } else {
            debug!(id = stale.id, "Unflagging saved current location after access loss");
            store.clear_current().await?;
        }
        Ok(())
    }
}
