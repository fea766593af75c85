//! Repository for the `sensors` and `operating_bounds` tables.

use linewatch_core::types::DbId;
use sqlx::PgPool;

use crate::models::sensor::{OperatingBoundsRow, Sensor};

/// Column list for `sensors` SELECT queries.
const SENSOR_COLUMNS: &str = "id, name, location_id, active";

/// Column list for `operating_bounds` SELECT queries.
const BOUNDS_COLUMNS: &str = "id, sensor_id, min_value, max_value";

/// Provides query operations for sensors and their operating bounds.
pub struct SensorRepo;

impl SensorRepo {
    /// Get a sensor by id.
    pub async fn get(pool: &PgPool, id: DbId) -> Result<Option<Sensor>, sqlx::Error> {
        let query = format!("SELECT {SENSOR_COLUMNS} FROM sensors WHERE id = $1");
        sqlx::query_as::<_, Sensor>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Get a sensor by its unique name.
    pub async fn get_by_name(pool: &PgPool, name: &str) -> Result<Option<Sensor>, sqlx::Error> {
        let query = format!("SELECT {SENSOR_COLUMNS} FROM sensors WHERE name = $1");
        sqlx::query_as::<_, Sensor>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// List all registered sensors, active or not.
    pub async fn list(pool: &PgPool) -> Result<Vec<Sensor>, sqlx::Error> {
        let query = format!("SELECT {SENSOR_COLUMNS} FROM sensors ORDER BY id");
        sqlx::query_as::<_, Sensor>(&query).fetch_all(pool).await
    }

    /// List active sensors on one production line.
    pub async fn list_active(pool: &PgPool, location_id: DbId) -> Result<Vec<Sensor>, sqlx::Error> {
        let query = format!(
            "SELECT {SENSOR_COLUMNS} FROM sensors \
             WHERE active = TRUE AND location_id = $1 \
             ORDER BY id"
        );
        sqlx::query_as::<_, Sensor>(&query)
            .bind(location_id)
            .fetch_all(pool)
            .await
    }

    /// Count sensors currently marked active.
    pub async fn count_active(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM sensors WHERE active = TRUE")
            .fetch_one(pool)
            .await
    }

    /// Get the configured bounds for a sensor, if any.
    pub async fn get_bounds(
        pool: &PgPool,
        sensor_id: DbId,
    ) -> Result<Option<OperatingBoundsRow>, sqlx::Error> {
        let query = format!("SELECT {BOUNDS_COLUMNS} FROM operating_bounds WHERE sensor_id = $1");
        sqlx::query_as::<_, OperatingBoundsRow>(&query)
            .bind(sensor_id)
            .fetch_optional(pool)
            .await
    }

    /// Get the name of the production line a sensor belongs to.
    pub async fn location_name(pool: &PgPool, sensor_id: DbId) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT pl.name FROM production_lines pl \
             JOIN sensors s ON s.location_id = pl.id \
             WHERE s.id = $1",
        )
        .bind(sensor_id)
        .fetch_optional(pool)
        .await
    }
}
