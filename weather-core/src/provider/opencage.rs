use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::{
    error::{Error, Result},
    model::Coordinate,
    provider::{GeocodeResult, GeocodingApi, truncate_body},
};

const RESULT_LIMIT: &str = "5";

/// Client for an OpenCage-compatible geocoding endpoint.
#[derive(Debug, Clone)]
pub struct OpenCageClient {
    base_url: String,
    api_key: String,
    http: Client,
}

impl OpenCageClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, api_key, http })
    }

    async fn geocode(&self, query: &str) -> Result<Vec<GeocodeResult>> {
        debug!(query, "Geocoding request");

        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("key", self.api_key.as_str()),
                ("limit", RESULT_LIMIT),
                ("no_record", "1"),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(Error::Request(format!(
                "geocoding request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        let parsed: OcResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Parse(format!("geocoding JSON: {e}")))?;

        Ok(parsed.results.into_iter().map(GeocodeResult::from).collect())
    }
}

#[derive(Debug, Deserialize)]
struct OcGeometry {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Default, Deserialize)]
struct OcComponents {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    county: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OcTimezone {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct OcAnnotations {
    timezone: Option<OcTimezone>,
}

#[derive(Debug, Deserialize)]
struct OcResult {
    geometry: OcGeometry,
    #[serde(default)]
    components: OcComponents,
    #[serde(default)]
    annotations: OcAnnotations,
}

#[derive(Debug, Deserialize)]
struct OcResponse {
    #[serde(default)]
    results: Vec<OcResult>,
}

impl From<OcResult> for GeocodeResult {
    fn from(r: OcResult) -> Self {
        let c = r.components;
        Self {
            coordinate: Coordinate::new(r.geometry.lat, r.geometry.lng),
            city: c.city.or(c.town).or(c.village).or(c.county),
            time_zone: r.annotations.timezone.map(|tz| tz.name),
        }
    }
}

#[async_trait]
impl GeocodingApi for OpenCageClient {
    async fn forward(&self, city: &str) -> Result<Vec<GeocodeResult>> {
        self.geocode(city).await
    }

    async fn reverse(&self, query: &str) -> Result<Vec<GeocodeResult>> {
        self.geocode(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    fn client(server: &MockServer) -> OpenCageClient {
        OpenCageClient::new(
            format!("{}/geocode/v1/json", server.uri()),
            "TEST_KEY".into(),
            Duration::from_secs(5),
        )
        .expect("client")
    }

    fn hanoi_response() -> serde_json::Value {
        serde_json::json!({
            "results": [{
                "geometry": { "lat": 21.0283334, "lng": 105.854041 },
                "components": { "city": "Hanoi", "country": "Vietnam" },
                "annotations": { "timezone": { "name": "Asia/Bangkok" } }
            }],
            "status": { "code": 200, "message": "OK" }
        })
    }

    #[tokio::test]
    async fn forward_parses_first_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geocode/v1/json"))
            .and(query_param("q", "Hanoi"))
            .and(query_param("key", "TEST_KEY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(hanoi_response()))
            .expect(1)
            .mount(&server)
            .await;

        let results = client(&server).forward("Hanoi").await.expect("geocode");

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].coordinate, Coordinate::new(21.0283334, 105.854041));
        assert_eq!(results[0].city.as_deref(), Some("Hanoi"));
        assert_eq!(results[0].time_zone.as_deref(), Some("Asia/Bangkok"));
    }

    #[tokio::test]
    async fn reverse_sends_lat_plus_lon_and_falls_back_to_town() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "47.3+8.5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{
                    "geometry": { "lat": 47.3, "lng": 8.5 },
                    "components": { "town": "Adliswil" }
                }]
            })))
            .mount(&server)
            .await;

        let results = client(&server).reverse("47.3+8.5").await.expect("geocode");

        assert_eq!(results[0].city.as_deref(), Some("Adliswil"));
        assert_eq!(results[0].time_zone, None);
    }

    #[tokio::test]
    async fn empty_results_are_not_an_error_here() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "results": [] })),
            )
            .mount(&server)
            .await;

        let results = client(&server).forward("Atlantis").await.expect("geocode");
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn error_status_maps_to_request_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid API key"))
            .mount(&server)
            .await;

        let err = client(&server).forward("Hanoi").await.unwrap_err();
        match err {
            Error::Request(msg) => {
                assert!(msg.contains("401"));
                assert!(msg.contains("invalid API key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_maps_to_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client(&server).forward("Hanoi").await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[tokio::test]
    async fn unreachable_host_maps_to_network_error() {
        let client = OpenCageClient::new(
            "http://127.0.0.1:1/geocode/v1/json".into(),
            "KEY".into(),
            Duration::from_secs(2),
        )
        .expect("client");

        let err = client.forward("Hanoi").await.unwrap_err();
        assert!(matches!(err, Error::NetworkUnreachable(_)), "got {err:?}");
    }
}
