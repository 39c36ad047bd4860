//! Device position providers.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::{fmt::Debug, sync::Arc, time::Duration};
use tracing::debug;

use crate::{
    config::{Config, PositionSource},
    error::{Error, Result},
    model::Coordinate,
};

/// Accuracy requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    HighAccuracy,
    Balanced,
}

/// Single-shot position fix.
#[async_trait]
pub trait PositionProvider: Send + Sync + Debug {
    async fn current_position(&self, priority: Priority) -> Result<Coordinate>;
}

/// Location access switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeniedPosition;

#[async_trait]
impl PositionProvider for DeniedPosition {
    async fn current_position(&self, _priority: Priority) -> Result<Coordinate> {
        Err(Error::PermissionDenied)
    }
}

/// A configured, fixed position. `None` behaves like a disabled location service.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Option<Coordinate>);

#[async_trait]
impl PositionProvider for FixedPosition {
    async fn current_position(&self, _priority: Priority) -> Result<Coordinate> {
        self.0.ok_or(Error::ServiceDisabled)
    }
}

/// Position from an ip-api compatible lookup service.
#[derive(Debug, Clone)]
pub struct IpPosition {
    lookup_url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    status: String,
    lat: Option<f64>,
    lon: Option<f64>,
}

impl IpPosition {
    pub fn new(lookup_url: String, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { lookup_url, http })
    }
}

#[async_trait]
impl PositionProvider for IpPosition {
    async fn current_position(&self, priority: Priority) -> Result<Coordinate> {
        debug!(?priority, url = %self.lookup_url, "IP position lookup");

        let res = self.http.get(&self.lookup_url).send().await?;
        if !res.status().is_success() {
            return Err(Error::Request(format!("position lookup returned {}", res.status())));
        }

        let body: IpLookupResponse = res.json().await?;
        match (body.status.as_str(), body.lat, body.lon) {
            ("success", Some(lat), Some(lon)) => Ok(Coordinate::new(lat, lon)),
            _ => Err(Error::ServiceDisabled),
        }
    }
}

/// Pick the position provider named by `[position] source`.
pub fn position_provider_from_config(config: &Config) -> Result<Arc<dyn PositionProvider>> {
    let pos = &config.position;
    let provider: Arc<dyn PositionProvider> = match pos.source {
        PositionSource::Off => Arc::new(DeniedPosition),
        PositionSource::Fixed => {
            let coordinate =
                pos.latitude.zip(pos.longitude).map(|(lat, lon)| Coordinate::new(lat, lon));
            Arc::new(FixedPosition(coordinate))
        }
        PositionSource::Ip => {
            Arc::new(IpPosition::new(pos.lookup_url.clone(), config.request_timeout())?)
        }
    };
    Ok(provider)
}
