use rusqlite::{OptionalExtension, Row, params};
use tracing::{debug, instrument};

use super::Database;
use crate::{
    error::Result,
    model::{Coordinate, Location, LocationId, NewLocation},
};

const COLUMNS: &str = "id, city, latitude, longitude, time_zone, is_current, from_position";

/// `locations` table access.
#[derive(Debug, Clone)]
pub struct LocationStore {
    db: Database,
}

fn row_to_location(row: &Row<'_>) -> rusqlite::Result<Location> {
    Ok(Location {
        id: row.get(0)?,
        city: row.get(1)?,
        coordinate: Coordinate::new(row.get(2)?, row.get(3)?),
        time_zone: row.get(4)?,
        is_current: row.get(5)?,
        from_position: row.get(6)?,
    })
}

impl LocationStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn get_all(&self) -> Result<Vec<Location>> {
        self.db
            .run(|conn| {
                let mut stmt =
                    conn.prepare(&format!("SELECT {COLUMNS} FROM locations ORDER BY id"))?;
                let rows = stmt.query_map([], row_to_location)?;
                Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
            })
            .await
    }

    pub async fn get_by_id(&self, id: LocationId) -> Result<Option<Location>> {
        self.db
            .run(move |conn| {
                Ok(conn
                    .query_row(
                        &format!("SELECT {COLUMNS} FROM locations WHERE id = ?1"),
                        [id],
                        row_to_location,
                    )
                    .optional()?)
            })
            .await
    }

    /// Case-insensitive match on the stored city name.
    pub async fn get_by_city(&self, city: &str) -> Result<Option<Location>> {
        let city = city.trim().to_string();
        self.db
            .run(move |conn| {
                Ok(conn
                    .query_row(
                        &format!("SELECT {COLUMNS} FROM locations WHERE city = ?1"),
                        [city],
                        row_to_location,
                    )
                    .optional()?)
            })
            .await
    }

    /// Exact match on the unified coordinate.
    pub async fn get_by_coordinate(&self, coordinate: Coordinate) -> Result<Option<Location>> {
        let c = coordinate.unified();
        self.db
            .run(move |conn| {
                Ok(conn
                    .query_row(
                        &format!(
                            "SELECT {COLUMNS} FROM locations WHERE latitude = ?1 AND longitude = ?2
                             ORDER BY id LIMIT 1"
                        ),
                        params![c.latitude, c.longitude],
                        row_to_location,
                    )
                    .optional()?)
            })
            .await
    }

    pub async fn get_current(&self) -> Result<Option<Location>> {
        self.db
            .run(|conn| {
                Ok(conn
                    .query_row(
                        &format!("SELECT {COLUMNS} FROM locations WHERE is_current = 1 LIMIT 1"),
                        [],
                        row_to_location,
                    )
                    .optional()?)
            })
            .await
    }

    /// Insert or overwrite the row with the same city.
    ///
    /// Saving a current location clears the flag on every other row in the
    /// same transaction. Re-saving never demotes the current row, and one
    /// explicit save keeps the row from counting as position-derived.
    #[instrument(skip(self, location), fields(city = %location.city))]
    pub async fn upsert(&self, location: NewLocation) -> Result<Location> {
        let c = location.coordinate.unified();
        self.db
            .run(move |conn| {
                let tx = conn.transaction()?;
                if location.is_current {
                    tx.execute(
                        "UPDATE locations SET is_current = 0 WHERE city <> ?1",
                        [&location.city],
                    )?;
                }
                let saved = tx.query_row(
                    &format!(
                        "INSERT INTO locations
                            (city, latitude, longitude, time_zone, is_current, from_position)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                         ON CONFLICT (city) DO UPDATE SET
                            latitude = excluded.latitude,
                            longitude = excluded.longitude,
                            time_zone = excluded.time_zone,
                            is_current = MAX(locations.is_current, excluded.is_current),
                            from_position = MIN(locations.from_position, excluded.from_position)
                         RETURNING {COLUMNS}"
                    ),
                    params![
                        location.city,
                        c.latitude,
                        c.longitude,
                        location.time_zone,
                        location.is_current,
                        location.from_position
                    ],
                    row_to_location,
                )?;
                tx.commit()?;

                debug!(id = saved.id, "Saved location");
                Ok(saved)
            })
            .await
    }

    /// Unflags the current row, if any.
    pub async fn clear_current(&self) -> Result<()> {
        self.db
            .run(|conn| {
                let cleared =
                    conn.execute("UPDATE locations SET is_current = 0 WHERE is_current = 1", [])?;
                debug!(cleared, "Cleared current location");
                Ok(())
            })
            .await
    }

    /// Returns whether a row was removed. Stored weather goes with it.
    pub async fn delete_by_id(&self, id: LocationId) -> Result<bool> {
        self.db
            .run(move |conn| {
                let removed = conn.execute("DELETE FROM locations WHERE id = ?1", [id])?;
                debug!(id, removed, "Deleted location");
                Ok(removed > 0)
            })
            .await
    }
}
