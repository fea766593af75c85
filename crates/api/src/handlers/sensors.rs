//! Handlers for sensor listing, latest values, history, and statistics.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use linewatch_core::error::CoreError;
use linewatch_core::reading::OperatingBounds;
use linewatch_core::stats::{self, round2};
use linewatch_core::threshold::evaluate;
use linewatch_core::topics::unit_for_sensor;
use linewatch_core::types::DbId;
use linewatch_db::repositories::{ReadingRepo, SensorRepo};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::handlers::parse_timestamp;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for history and statistics windows.
///
/// Both bounds default to the last 24 hours when omitted.
#[derive(Debug, Deserialize)]
pub struct WindowParams {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl WindowParams {
    fn resolve(&self) -> AppResult<(linewatch_core::types::Timestamp, linewatch_core::types::Timestamp)> {
        let now = Utc::now();
        let from = parse_timestamp(&self.from, now - chrono::Duration::hours(24))?;
        let to = parse_timestamp(&self.to, now)?;
        Ok((from, to))
    }
}

/// Query parameters for sensor listings.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Restrict to active sensors on this production line.
    pub location_id: Option<DbId>,
}

/// GET /sensors -- list registered sensors with their units and bounds.
/// With `location_id` set, only that line's active sensors are returned.
pub async fn list_sensors(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<DataResponse<Vec<Value>>>> {
    let sensors = match params.location_id {
        Some(location_id) => SensorRepo::list_active(&state.pool, location_id).await?,
        None => SensorRepo::list(&state.pool).await?,
    };

    let mut data = Vec::with_capacity(sensors.len());
    for sensor in sensors {
        let bounds = SensorRepo::get_bounds(&state.pool, sensor.id).await?;
        data.push(json!({
            "id": sensor.id,
            "name": sensor.name,
            "location_id": sensor.location_id,
            "active": sensor.active,
            "unit": unit_for_sensor(&sensor.name),
            "min_value": bounds.as_ref().map(|b| b.min_value),
            "max_value": bounds.as_ref().map(|b| b.max_value),
        }));
    }

    Ok(Json(DataResponse { data }))
}

/// GET /sensors/latest -- the most recent reading per sensor, evaluated
/// against the currently configured bounds.
pub async fn latest_readings(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Value>>>> {
    let latest = ReadingRepo::latest_per_sensor(&state.pool).await?;

    let data = latest
        .into_iter()
        .map(|row| {
            let bounds = match (row.min_value, row.max_value) {
                (Some(min_value), Some(max_value)) => Some(OperatingBounds {
                    min_value,
                    max_value,
                }),
                _ => None,
            };
            let status = evaluate(row.value, bounds.as_ref());
            json!({
                "sensor_id": row.sensor_id,
                "name": row.sensor_name,
                "location": row.location_name,
                "active": row.active,
                "unit": unit_for_sensor(&row.sensor_name),
                "value": round2(row.value),
                "status": status.as_str(),
                "recorded_at": row.recorded_at,
                "min_value": row.min_value,
                "max_value": row.max_value,
            })
        })
        .collect();

    Ok(Json(DataResponse { data }))
}

/// GET /sensors/{id}/readings -- reading history for one sensor within
/// a time window (default: last 24 hours).
pub async fn reading_history(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<WindowParams>,
) -> AppResult<Json<DataResponse<Vec<linewatch_db::models::ReadingRow>>>> {
    require_sensor(&state, id).await?;
    let (from, to) = params.resolve()?;

    let readings = ReadingRepo::get_range(&state.pool, id, from, to).await?;
    Ok(Json(DataResponse { data: readings }))
}

/// Statistics response for one sensor's window.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub sensor_id: DbId,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub deviation_count: u64,
    pub deviation_percent: f64,
    pub count: u64,
}

/// GET /sensors/{id}/stats -- window aggregates for one sensor
/// (default window: last 24 hours). Values are rounded to two decimals
/// here, at the presentation boundary.
pub async fn reading_stats(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<WindowParams>,
) -> AppResult<Json<DataResponse<StatsResponse>>> {
    require_sensor(&state, id).await?;
    let (from, to) = params.resolve()?;

    let values = ReadingRepo::values_in_range(&state.pool, id, from, to).await?;
    let bounds = SensorRepo::get_bounds(&state.pool, id)
        .await?
        .map(|row| row.as_bounds());

    let window = stats::compute(&values, bounds.as_ref());
    Ok(Json(DataResponse {
        data: StatsResponse {
            sensor_id: id,
            avg: round2(window.avg),
            min: round2(window.min),
            max: round2(window.max),
            deviation_count: window.deviation_count,
            deviation_percent: round2(window.deviation_percent),
            count: window.count,
        },
    }))
}

/// 404 unless the sensor exists.
async fn require_sensor(state: &AppState, id: DbId) -> AppResult<()> {
    match SensorRepo::get(&state.pool, id).await? {
        Some(_) => Ok(()),
        None => Err(CoreError::NotFound {
            entity: "sensor",
            id,
        }
        .into()),
    }
}
