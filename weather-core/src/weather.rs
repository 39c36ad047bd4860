//! Forecast refresh and read-back for stored locations.

use std::{sync::Arc, time::Duration};
use tokio::time::timeout;
use tracing::{info, instrument, warn};

use crate::{
    error::{Error, Result},
    model::{Location, LocationId, LocationWithWeather, SavedCity},
    provider::WeatherProvider,
    store::{LocationStore, WeatherStore},
};

/// A location whose refresh failed.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshFailure {
    pub location_id: LocationId,
    pub city: String,
    pub error: Error,
}

/// Outcome of refreshing every stored location.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshReport {
    pub refreshed: Vec<LocationId>,
    pub failures: Vec<RefreshFailure>,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct WeatherRepository {
    provider: Arc<dyn WeatherProvider>,
    locations: LocationStore,
    weather: WeatherStore,
    refresh_timeout: Duration,
}

impl WeatherRepository {
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        locations: LocationStore,
        weather: WeatherStore,
        refresh_timeout: Duration,
    ) -> Self {
        Self { provider, locations, weather, refresh_timeout }
    }

    /// Refresh every stored location concurrently.
    ///
    /// One location failing does not stop the others; failures are collected
    /// in the report. Only failing to list the locations fails the call.
    #[instrument(skip(self))]
    pub async fn refresh_weather_of_locations(&self) -> Result<RefreshReport> {
        let locations = self.locations.get_all().await?;

        let tasks: Vec<_> = locations
            .into_iter()
            .map(|location| {
                let repo = self.clone();
                let key = (location.id, location.city.clone());
                (key, tokio::spawn(async move { repo.refresh_location(&location).await }))
            })
            .collect();

        let mut report = RefreshReport::default();
        for ((location_id, city), task) in tasks {
            match task.await.map_err(Error::from).and_then(|r| r) {
                Ok(()) => report.refreshed.push(location_id),
                Err(error) => {
                    warn!(location_id, city = %city, error = %error, "Weather refresh failed");
                    report.failures.push(RefreshFailure { location_id, city, error });
                }
            }
        }

        info!(
            refreshed = report.refreshed.len(),
            failed = report.failures.len(),
            "Weather refresh finished"
        );
        Ok(report)
    }

    pub async fn refresh_weather_of_location(&self, id: LocationId) -> Result<()> {
        let location = self
            .locations
            .get_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Location {id}")))?;
        self.refresh_location(&location).await
    }

    async fn refresh_location(&self, location: &Location) -> Result<()> {
        let weather = timeout(
            self.refresh_timeout,
            self.provider.get_weather(location.coordinate, &location.time_zone),
        )
        .await
        .map_err(|_| Error::Timeout(format!("Weather refresh of {}", location.city)))??;

        self.weather.replace(location.id, weather).await
    }

    pub async fn get_location_with_weather(&self, id: LocationId) -> Result<LocationWithWeather> {
        let location = self
            .locations
            .get_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Location {id}")))?;
        let weather = self.weather.get(id).await?;
        Ok(LocationWithWeather { location, weather })
    }

    /// List rows for locations with stored weather: current location first, then by id.
    pub async fn get_saved_cities(&self) -> Result<Vec<SavedCity>> {
        let mut cities = Vec::new();
        for location in self.locations.get_all().await? {
            let weather = self.weather.get(location.id).await?;
            if let Some(city) = SavedCity::from_location(&location, &weather) {
                cities.push(city);
            }
        }
        cities.sort_by_key(|c| (!c.is_current, c.id));
        Ok(cities)
    }
}
