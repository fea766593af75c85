//! Handlers for alert history.

use axum::extract::{Query, State};
use axum::Json;
use linewatch_db::models::AlertWithSensor;
use linewatch_db::repositories::AlertRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for alert listings. Both bounds are optional; an
/// unbounded query returns the full history, newest first.
#[derive(Debug, Deserialize)]
pub struct AlertParams {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// GET /alerts -- alert history within an optional time window.
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(params): Query<AlertParams>,
) -> AppResult<Json<DataResponse<Vec<AlertWithSensor>>>> {
    let from = parse_optional(&params.from)?;
    let to = parse_optional(&params.to)?;

    let alerts = AlertRepo::list_range(&state.pool, from, to).await?;
    Ok(Json(DataResponse { data: alerts }))
}

fn parse_optional(
    s: &Option<String>,
) -> AppResult<Option<linewatch_core::types::Timestamp>> {
    match s {
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("Invalid timestamp '{v}'"))),
        None => Ok(None),
    }
}
