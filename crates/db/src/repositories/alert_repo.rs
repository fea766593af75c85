//! Repository for the `alert_events` table (append-only).

use linewatch_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::event::{AlertRow, AlertWithSensor};

/// Column list for `alert_events` SELECT queries.
const COLUMNS: &str = "id, sensor_id, description, raised_by, recorded_at";

/// Column list for joined queries (qualified, plus sensor name).
const JOINED_COLUMNS: &str = "\
    a.id, a.sensor_id, s.name AS sensor_name, \
    a.description, a.raised_by, a.recorded_at";

/// Provides query operations for alert events.
pub struct AlertRepo;

impl AlertRepo {
    /// Append one alert event.
    pub async fn insert(
        pool: &PgPool,
        sensor_id: DbId,
        description: &str,
        raised_by: DbId,
        recorded_at: Timestamp,
    ) -> Result<AlertRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO alert_events (sensor_id, description, raised_by, recorded_at) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AlertRow>(&query)
            .bind(sensor_id)
            .bind(description)
            .bind(raised_by)
            .bind(recorded_at)
            .fetch_one(pool)
            .await
    }

    /// List alerts within an optional time range, newest first.
    pub async fn list_range(
        pool: &PgPool,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Result<Vec<AlertWithSensor>, sqlx::Error> {
        let query = format!(
            "SELECT {JOINED_COLUMNS} FROM alert_events a \
             JOIN sensors s ON s.id = a.sensor_id \
             WHERE ($1::timestamptz IS NULL OR a.recorded_at >= $1) \
               AND ($2::timestamptz IS NULL OR a.recorded_at <= $2) \
             ORDER BY a.recorded_at DESC"
        );
        sqlx::query_as::<_, AlertWithSensor>(&query)
            .bind(from)
            .bind(to)
            .fetch_all(pool)
            .await
    }

    /// Get the most recent alerts, newest first.
    pub async fn recent(pool: &PgPool, limit: i64) -> Result<Vec<AlertWithSensor>, sqlx::Error> {
        let query = format!(
            "SELECT {JOINED_COLUMNS} FROM alert_events a \
             JOIN sensors s ON s.id = a.sensor_id \
             ORDER BY a.recorded_at DESC \
             LIMIT $1"
        );
        sqlx::query_as::<_, AlertWithSensor>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Count alerts recorded at or after the given cutoff.
    pub async fn count_since(pool: &PgPool, cutoff: Timestamp) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM alert_events WHERE recorded_at >= $1")
            .bind(cutoff)
            .fetch_one(pool)
            .await
    }
}
