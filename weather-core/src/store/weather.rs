use rusqlite::params;
use tracing::debug;

use super::Database;
use crate::{
    error::Result,
    model::{DailyWeather, HourlyWeather, LocationId, Weather},
};

/// `daily_weather` / `hourly_weather` access, keyed by owning location.
#[derive(Debug, Clone)]
pub struct WeatherStore {
    db: Database,
}

impl WeatherStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Replace all stored weather of a location in one transaction.
    pub async fn replace(&self, location_id: LocationId, weather: Weather) -> Result<()> {
        self.db
            .run(move |conn| {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM daily_weather WHERE location_id = ?1", [location_id])?;
                tx.execute("DELETE FROM hourly_weather WHERE location_id = ?1", [location_id])?;

                {
                    let mut daily = tx.prepare(
                        "INSERT OR REPLACE INTO daily_weather
                            (location_id, time, temperature_max, temperature_min,
                             wind_speed, pressure, weather_code)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    )?;
                    for d in &weather.daily {
                        daily.execute(params![
                            location_id,
                            d.time,
                            d.temperature_max,
                            d.temperature_min,
                            d.wind_speed,
                            d.pressure,
                            d.weather_code
                        ])?;
                    }

                    let mut hourly = tx.prepare(
                        "INSERT OR REPLACE INTO hourly_weather
                         (location_id, time, temperature, wind_speed, pressure, weather_code)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    )?;
                    for h in &weather.hourly {
                        hourly.execute(params![
                            location_id,
                            h.time,
                            h.temperature,
                            h.wind_speed,
                            h.pressure,
                            h.weather_code
                        ])?;
                    }
                }

                tx.commit()?;
                debug!(
                    location_id,
                    daily = weather.daily.len(),
                    hourly = weather.hourly.len(),
                    "Replaced stored weather"
                );
                Ok(())
            })
            .await
    }

    /// Stored weather, ordered by time. Empty when nothing has been fetched yet.
    pub async fn get(&self, location_id: LocationId) -> Result<Weather> {
        self.db
            .run(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT time, temperature_max, temperature_min, wind_speed, pressure,
                            weather_code
                     FROM daily_weather WHERE location_id = ?1 ORDER BY time",
                )?;
                let daily = stmt
                    .query_map([location_id], |row| {
                        Ok(DailyWeather {
                            time: row.get(0)?,
                            temperature_max: row.get(1)?,
                            temperature_min: row.get(2)?,
                            wind_speed: row.get(3)?,
                            pressure: row.get(4)?,
                            weather_code: row.get(5)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                let mut stmt = conn.prepare(
                    "SELECT time, temperature, wind_speed, pressure, weather_code
                     FROM hourly_weather WHERE location_id = ?1 ORDER BY time",
                )?;
                let hourly = stmt
                    .query_map([location_id], |row| {
                        Ok(HourlyWeather {
                            time: row.get(0)?,
                            temperature: row.get(1)?,
                            wind_speed: row.get(2)?,
                            pressure: row.get(3)?,
                            weather_code: row.get(4)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                Ok(Weather { daily, hourly })
            })
            .await
    }
}
