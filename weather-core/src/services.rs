use anyhow::Context;

use crate::{
    Config,
    location::{LocalLocationDataSource, LocationRepository, RemoteLocationDataSource},
    position::position_provider_from_config,
    provider::{geocoder_from_config, weather_provider_from_config},
    store::Database,
    weather::WeatherRepository,
};

/// Repositories wired from a [`Config`] and an open local store.
#[derive(Debug, Clone)]
pub struct Services {
    config: Config,
    db: Database,
}

impl Services {
    /// Open the configured database.
    pub fn open(config: Config) -> anyhow::Result<Self> {
        let path = config.database_path()?;
        let db = Database::open(&path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        Ok(Self::with_database(config, db))
    }

    pub fn with_database(config: Config, db: Database) -> Self {
        Self { config, db }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Needs a geocoding API key.
    pub fn location_repository(&self) -> anyhow::Result<LocationRepository> {
        let geocoder = geocoder_from_config(&self.config)?;
        let position = position_provider_from_config(&self.config)?;

        Ok(LocationRepository::new(
            LocalLocationDataSource::new(self.db.locations()),
            RemoteLocationDataSource::new(geocoder),
            position,
            self.config.position_timeout(),
        ))
    }

    pub fn weather_repository(&self) -> anyhow::Result<WeatherRepository> {
        let provider = weather_provider_from_config(&self.config)?;

        Ok(WeatherRepository::new(
            provider,
            self.db.locations(),
            self.db.weather(),
            self.config.refresh_timeout(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_repository_requires_api_key() {
        let db = Database::open_in_memory().expect("open");
        let services = Services::with_database(Config::default(), db);

        let err = services.location_repository().unwrap_err();
        assert!(err.to_string().contains("No geocoding API key configured"));
        assert!(services.weather_repository().is_ok());
    }

    #[test]
    fn configured_services_build() {
        let mut config = Config::default();
        config.set_geocoding_api_key("KEY".into());
        let services = Services::with_database(config, Database::open_in_memory().expect("open"));

        assert!(services.location_repository().is_ok());
        assert_eq!(services.config().geocoding_api_key(), Some("KEY"));
    }
}
