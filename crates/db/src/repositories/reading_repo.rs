//! Repository for the `sensor_readings` table (append-only time-series).

use linewatch_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::reading::{LatestReading, ReadingRow};

/// Column list for `sensor_readings` SELECT queries.
const COLUMNS: &str = "id, sensor_id, value, recorded_at";

/// Provides query operations for sensor readings.
pub struct ReadingRepo;

impl ReadingRepo {
    /// Append one reading. Duplicates are tolerated; the table has no
    /// uniqueness constraint on (sensor_id, recorded_at).
    pub async fn insert(
        pool: &PgPool,
        sensor_id: DbId,
        value: f64,
        recorded_at: Timestamp,
    ) -> Result<ReadingRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO sensor_readings (sensor_id, value, recorded_at) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ReadingRow>(&query)
            .bind(sensor_id)
            .bind(value)
            .bind(recorded_at)
            .fetch_one(pool)
            .await
    }

    /// Get readings for a sensor within a closed time range, oldest first.
    pub async fn get_range(
        pool: &PgPool,
        sensor_id: DbId,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<ReadingRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sensor_readings \
             WHERE sensor_id = $1 AND recorded_at >= $2 AND recorded_at <= $3 \
             ORDER BY recorded_at"
        );
        sqlx::query_as::<_, ReadingRow>(&query)
            .bind(sensor_id)
            .bind(from)
            .bind(to)
            .fetch_all(pool)
            .await
    }

    /// Get just the values for a sensor within a time range, for
    /// statistics computation.
    pub async fn values_in_range(
        pool: &PgPool,
        sensor_id: DbId,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<f64>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT value FROM sensor_readings \
             WHERE sensor_id = $1 AND recorded_at >= $2 AND recorded_at <= $3",
        )
        .bind(sensor_id)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await
    }

    /// Get the most recent reading per sensor, joined with sensor
    /// metadata and current bounds.
    ///
    /// Uses `DISTINCT ON` to select the max-`recorded_at` row per sensor;
    /// insertion order is irrelevant.
    pub async fn latest_per_sensor(pool: &PgPool) -> Result<Vec<LatestReading>, sqlx::Error> {
        let query = "\
            SELECT DISTINCT ON (r.sensor_id) \
                r.sensor_id, s.name AS sensor_name, pl.name AS location_name, \
                s.active, r.value, r.recorded_at, \
                b.min_value, b.max_value \
            FROM sensor_readings r \
            JOIN sensors s ON s.id = r.sensor_id \
            JOIN production_lines pl ON pl.id = s.location_id \
            LEFT JOIN operating_bounds b ON b.sensor_id = r.sensor_id \
            ORDER BY r.sensor_id, r.recorded_at DESC";
        sqlx::query_as::<_, LatestReading>(query)
            .fetch_all(pool)
            .await
    }
}
