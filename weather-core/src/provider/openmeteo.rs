use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::{collections::HashMap, time::Duration};
use tracing::debug;

use crate::{
    error::{Error, Result},
    model::{Coordinate, DailyWeather, HourlyWeather, Weather},
    provider::{WeatherProvider, truncate_body},
};

const HOURLY_FIELDS: &str = "temperature_2m,wind_speed_10m,surface_pressure,weather_code";
const DAILY_FIELDS: &str = "weather_code,temperature_2m_max,temperature_2m_min,wind_speed_10m_max";

/// Client for the Open-Meteo forecast endpoint.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    base_url: String,
    http: Client,
}

impl OpenMeteoClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, http })
    }
}

#[derive(Debug, Deserialize)]
struct OmHourly {
    time: Vec<String>,
    temperature_2m: Vec<Option<f64>>,
    wind_speed_10m: Vec<Option<f64>>,
    surface_pressure: Vec<Option<f64>>,
    weather_code: Vec<Option<i32>>,
}

#[derive(Debug, Deserialize)]
struct OmDaily {
    time: Vec<String>,
    weather_code: Vec<Option<i32>>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
    wind_speed_10m_max: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    hourly: OmHourly,
    daily: OmDaily,
}

fn check_len(series: &str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(Error::Parse(format!(
            "forecast series '{series}' has {actual} values, expected {expected}"
        )));
    }
    Ok(())
}

impl OmHourly {
    /// Zips the parallel arrays; hours with a missing value are dropped.
    fn into_records(self) -> Result<Vec<HourlyWeather>> {
        let n = self.time.len();
        check_len("temperature_2m", n, self.temperature_2m.len())?;
        check_len("wind_speed_10m", n, self.wind_speed_10m.len())?;
        check_len("surface_pressure", n, self.surface_pressure.len())?;
        check_len("weather_code", n, self.weather_code.len())?;

        let records = self
            .time
            .into_iter()
            .enumerate()
            .filter_map(|(i, time)| {
                Some(HourlyWeather {
                    time,
                    temperature: self.temperature_2m[i]?,
                    wind_speed: self.wind_speed_10m[i]?,
                    pressure: self.surface_pressure[i]?,
                    weather_code: self.weather_code[i]?,
                })
            })
            .collect();

        Ok(records)
    }
}

impl OmDaily {
    fn into_records(self, hourly: &[HourlyWeather]) -> Result<Vec<DailyWeather>> {
        let n = self.time.len();
        check_len("weather_code", n, self.weather_code.len())?;
        check_len("temperature_2m_max", n, self.temperature_2m_max.len())?;
        check_len("temperature_2m_min", n, self.temperature_2m_min.len())?;
        check_len("wind_speed_10m_max", n, self.wind_speed_10m_max.len())?;

        let pressure = daily_mean_pressure(hourly);

        let records = self
            .time
            .into_iter()
            .enumerate()
            .filter_map(|(i, time)| {
                Some(DailyWeather {
                    pressure: pressure.get(time.as_str()).copied(),
                    temperature_max: self.temperature_2m_max[i]?,
                    temperature_min: self.temperature_2m_min[i]?,
                    wind_speed: self.wind_speed_10m_max[i]?,
                    weather_code: self.weather_code[i]?,
                    time,
                })
            })
            .collect();

        Ok(records)
    }
}

/// Mean hourly pressure keyed by the `YYYY-MM-DD` prefix of each timestamp.
fn daily_mean_pressure(hourly: &[HourlyWeather]) -> HashMap<&str, f64> {
    let mut sums: HashMap<&str, (f64, u32)> = HashMap::new();
    for h in hourly {
        let Some(date) = h.time.get(..10) else { continue };
        let entry = sums.entry(date).or_insert((0.0, 0));
        entry.0 += h.pressure;
        entry.1 += 1;
    }
    sums.into_iter().map(|(date, (sum, count))| (date, sum / f64::from(count))).collect()
}

#[async_trait]
impl WeatherProvider for OpenMeteoClient {
    async fn get_weather(&self, coordinate: Coordinate, time_zone: &str) -> Result<Weather> {
        debug!(%coordinate, time_zone, "Forecast request");

        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("latitude", coordinate.latitude.to_string()),
                ("longitude", coordinate.longitude.to_string()),
                ("timezone", time_zone.to_string()),
                ("hourly", HOURLY_FIELDS.to_string()),
                ("daily", DAILY_FIELDS.to_string()),
                ("wind_speed_unit", "kmh".to_string()),
                ("temperature_unit", "celsius".to_string()),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(Error::Request(format!(
                "forecast request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        let parsed: OmResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Parse(format!("forecast JSON: {e}")))?;

        let hourly = parsed.hourly.into_records()?;
        let daily = parsed.daily.into_records(&hourly)?;

        Ok(Weather { daily, hourly })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    fn client(server: &MockServer) -> OpenMeteoClient {
        OpenMeteoClient::new(format!("{}/v1/forecast", server.uri()), Duration::from_secs(5))
            .expect("client")
    }

    fn forecast_body() -> serde_json::Value {
        serde_json::json!({
            "latitude": 21.0,
            "longitude": 105.75,
            "timezone": "Asia/Bangkok",
            "hourly": {
                "time": ["2024-03-01T00:00", "2024-03-01T01:00", "2024-03-02T00:00"],
                "temperature_2m": [18.5, 18.1, 20.0],
                "wind_speed_10m": [7.2, 6.8, 3.6],
                "surface_pressure": [1010.0, 1012.0, 1008.0],
                "weather_code": [3, 3, 61]
            },
            "daily": {
                "time": ["2024-03-01", "2024-03-02", "2024-03-03"],
                "weather_code": [3, 61, 0],
                "temperature_2m_max": [25.0, 24.0, 26.0],
                "temperature_2m_min": [17.0, 18.0, 19.0],
                "wind_speed_10m_max": [12.0, 14.0, 9.0]
            }
        })
    }

    #[tokio::test]
    async fn parses_daily_and_hourly_series() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("latitude", "21.0285"))
            .and(query_param("longitude", "105.8048"))
            .and(query_param("timezone", "Asia/Bangkok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
            .expect(1)
            .mount(&server)
            .await;

        let weather = client(&server)
            .get_weather(Coordinate::new(21.0285, 105.8048), "Asia/Bangkok")
            .await
            .expect("forecast");

        assert_eq!(weather.hourly.len(), 3);
        assert_eq!(weather.hourly[1].time, "2024-03-01T01:00");
        assert_eq!(weather.hourly[1].temperature, 18.1);
        assert_eq!(weather.hourly[2].weather_code, 61);

        assert_eq!(weather.daily.len(), 3);
        assert_eq!(weather.daily[0].temperature_max, 25.0);
        assert_eq!(weather.daily[0].pressure, Some(1011.0));
        assert_eq!(weather.daily[1].pressure, Some(1008.0));
        assert_eq!(weather.daily[2].pressure, None);
    }

    #[tokio::test]
    async fn null_values_drop_the_record() {
        let mut body = forecast_body();
        body["hourly"]["temperature_2m"][0] = serde_json::Value::Null;

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let weather = client(&server)
            .get_weather(Coordinate::new(21.0, 105.0), "auto")
            .await
            .expect("forecast");

        assert_eq!(weather.hourly.len(), 2);
        assert_eq!(weather.hourly[0].time, "2024-03-01T01:00");
    }

    #[tokio::test]
    async fn mismatched_series_length_is_a_parse_error() {
        let mut body = forecast_body();
        body["daily"]["temperature_2m_min"] = serde_json::json!([17.0]);

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let err = client(&server)
            .get_weather(Coordinate::new(21.0, 105.0), "auto")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Parse(msg) if msg.contains("temperature_2m_min")));
    }

    #[tokio::test]
    async fn server_error_is_reported_with_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": true, "reason": "Invalid timezone"
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .get_weather(Coordinate::new(21.0, 105.0), "Mars/Olympus")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Request(msg) if msg.contains("400") && msg.contains("Invalid timezone")
        ));
    }
}
