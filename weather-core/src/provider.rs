use crate::{
    Config,
    error::Result,
    model::{Coordinate, Weather},
    provider::{opencage::OpenCageClient, openmeteo::OpenMeteoClient},
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod opencage;
pub mod openmeteo;

/// One forward or reverse geocoding hit.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeResult {
    pub coordinate: Coordinate,
    /// City component; falls back to town, village or county.
    pub city: Option<String>,
    pub time_zone: Option<String>,
}

/// Geocoding collaborator.
#[async_trait]
pub trait GeocodingApi: Send + Sync + Debug {
    async fn forward(&self, city: &str) -> Result<Vec<GeocodeResult>>;

    /// `query` is a `"lat+lon"` key, see [`Coordinate::as_query`].
    async fn reverse(&self, query: &str) -> Result<Vec<GeocodeResult>>;
}

/// Forecast collaborator. Values come back in canonical units.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn get_weather(&self, coordinate: Coordinate, time_zone: &str) -> Result<Weather>;
}

/// Construct the geocoding client from config.
pub fn geocoder_from_config(config: &Config) -> anyhow::Result<Arc<dyn GeocodingApi>> {
    let api_key = config.geocoding_api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No geocoding API key configured.\n\
                 Hint: run `weather configure` and enter your API key."
        )
    })?;

    let client = OpenCageClient::new(
        config.geocoding.base_url.clone(),
        api_key.to_owned(),
        config.request_timeout(),
    )?;

    Ok(Arc::new(client))
}

/// Construct the forecast client from config.
pub fn weather_provider_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let client = OpenMeteoClient::new(config.forecast.base_url.clone(), config.request_timeout())?;
    Ok(Arc::new(client))
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geocoder_from_config_errors_when_missing_api_key() {
        let cfg = Config::default();
        let err = geocoder_from_config(&cfg).unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("No geocoding API key configured"));
        assert!(msg.contains("Hint: run `weather configure`"));
    }

    #[test]
    fn geocoder_from_config_works_when_configured() {
        let mut cfg = Config::default();
        cfg.set_geocoding_api_key("KEY".to_string());

        assert!(geocoder_from_config(&cfg).is_ok());
    }

    #[test]
    fn weather_provider_needs_no_key() {
        assert!(weather_provider_from_config(&Config::default()).is_ok());
    }

    #[test]
    fn truncate_body_caps_long_bodies() {
        let long = "x".repeat(500);
        let short = truncate_body(&long);
        assert_eq!(short.len(), 203);
        assert!(short.ends_with("..."));
        assert_eq!(truncate_body("ok"), "ok");
    }
}
