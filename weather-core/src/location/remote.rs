use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    error::{Error, Result},
    location::LocationDataSource,
    model::{Coordinate, NewLocation, Place},
    provider::GeocodingApi,
};

/// Geocoding-backed data source. Read-only: saving is a no-op.
#[derive(Debug, Clone)]
pub struct RemoteLocationDataSource {
    api: Arc<dyn GeocodingApi>,
}

impl RemoteLocationDataSource {
    pub fn new(api: Arc<dyn GeocodingApi>) -> Self {
        Self { api }
    }

    /// All named hits for a free-text query.
    pub async fn search(&self, query: &str) -> Result<Vec<Place>> {
        let results = self.api.forward(query).await?;
        Ok(results
            .into_iter()
            .filter_map(|r| {
                Some(Place { city: r.city?, coordinate: r.coordinate, time_zone: r.time_zone })
            })
            .collect())
    }

    /// Reverse lookup keeping the time zone; the place carries the queried coordinate.
    pub async fn place_at(&self, coordinate: Coordinate) -> Result<Place> {
        let first = self
            .api
            .reverse(&coordinate.as_query())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound("City".into()))?;

        Ok(Place {
            city: first.city.ok_or_else(|| Error::NotFound("City".into()))?,
            coordinate,
            time_zone: first.time_zone,
        })
    }
}

#[async_trait]
impl LocationDataSource for RemoteLocationDataSource {
    async fn get_coordinate(&self, city: &str) -> Result<Coordinate> {
        self.api
            .forward(city)
            .await?
            .into_iter()
            .next()
            .map(|r| r.coordinate)
            .ok_or_else(|| Error::NotFound("Location".into()))
    }

    async fn get_city_name(&self, coordinate: Coordinate) -> Result<String> {
        self.place_at(coordinate).await.map(|p| p.city)
    }

    async fn save_location(&self, _location: NewLocation) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::provider::GeocodeResult;
    use std::{
        collections::HashMap,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };

    /// In-memory geocoder keyed by query string.
    #[derive(Debug, Default)]
    pub(crate) struct FakeGeocoder {
        pub results: Mutex<HashMap<String, Vec<GeocodeResult>>>,
        pub failure: Mutex<Option<Error>>,
        pub calls: AtomicUsize,
    }

    impl FakeGeocoder {
        pub fn with(
            self,
            query: &str,
            city: Option<&str>,
            coordinate: Coordinate,
            tz: Option<&str>,
        ) -> Self {
            self.results.lock().unwrap().entry(query.to_string()).or_default().push(GeocodeResult {
                coordinate,
                city: city.map(str::to_string),
                time_zone: tz.map(str::to_string),
            });
            self
        }

        pub fn fail_with(&self, error: Error) {
            *self.failure.lock().unwrap() = Some(error);
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn lookup(&self, query: &str) -> Result<Vec<GeocodeResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.failure.lock().unwrap().clone() {
                return Err(err);
            }
            Ok(self.results.lock().unwrap().get(query).cloned().unwrap_or_default())
        }
    }

    #[async_trait]
    impl GeocodingApi for FakeGeocoder {
        async fn forward(&self, city: &str) -> Result<Vec<GeocodeResult>> {
            self.lookup(city)
        }

        async fn reverse(&self, query: &str) -> Result<Vec<GeocodeResult>> {
            self.lookup(query)
        }
    }

    #[tokio::test]
    async fn forward_returns_first_coordinate() {
        let api = FakeGeocoder::default()
            .with("Springfield", Some("Springfield"), Coordinate::new(39.78, -89.65), None)
            .with("Springfield", Some("Springfield"), Coordinate::new(37.21, -93.29), None);
        let source = RemoteLocationDataSource::new(Arc::new(api));

        assert_eq!(source.get_coordinate("Springfield").await, Ok(Coordinate::new(39.78, -89.65)));
    }

    #[tokio::test]
    async fn empty_results_are_not_found() {
        let source = RemoteLocationDataSource::new(Arc::new(FakeGeocoder::default()));

        assert_eq!(
            source.get_coordinate("Atlantis").await,
            Err(Error::NotFound("Location".into()))
        );
        assert_eq!(
            source.get_city_name(Coordinate::new(0.0, 0.0)).await,
            Err(Error::NotFound("City".into()))
        );
    }

    #[tokio::test]
    async fn reverse_uses_lat_plus_lon_key() {
        let paris = Coordinate::new(48.8566, 2.3522);
        let api = FakeGeocoder::default().with(
            "48.8566+2.3522",
            Some("Paris"),
            paris,
            Some("Europe/Paris"),
        );
        let source = RemoteLocationDataSource::new(Arc::new(api));

        assert_eq!(source.get_city_name(paris).await, Ok("Paris".to_string()));

        let place = source.place_at(paris).await.expect("place");
        assert_eq!(place.time_zone.as_deref(), Some("Europe/Paris"));
    }

    #[tokio::test]
    async fn network_failure_propagates() {
        let api = Arc::new(FakeGeocoder::default());
        api.fail_with(Error::NetworkUnreachable("dns".into()));
        let source = RemoteLocationDataSource::new(api);

        assert_eq!(
            source.get_coordinate("Paris").await,
            Err(Error::NetworkUnreachable("dns".into()))
        );
    }

    #[tokio::test]
    async fn search_skips_unnamed_hits() {
        let api = FakeGeocoder::default()
            .with(
                "San",
                Some("San Jose"),
                Coordinate::new(37.33, -121.89),
                Some("America/Los_Angeles"),
            )
            .with("San", None, Coordinate::new(0.0, 0.0), None);
        let source = RemoteLocationDataSource::new(Arc::new(api));

        let places = source.search("San").await.expect("search");
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].city, "San Jose");
    }

    #[tokio::test]
    async fn save_is_a_no_op() {
        let api = Arc::new(FakeGeocoder::default());
        let source = RemoteLocationDataSource::new(api.clone());

        let location = NewLocation::new("X", Coordinate::new(1.0, 1.0));
        assert!(source.save_location(location).await.is_ok());
        assert_eq!(api.calls(), 0);
    }
}
