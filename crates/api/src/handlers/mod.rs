//! HTTP handlers, one module per resource.

pub mod alerts;
pub mod sensors;

use linewatch_core::types::Timestamp;

use crate::error::{AppError, AppResult};

/// Parse an optional ISO 8601 timestamp query parameter, with a fallback.
pub(crate) fn parse_timestamp(s: &Option<String>, fallback: Timestamp) -> AppResult<Timestamp> {
    match s {
        Some(v) => v
            .parse::<Timestamp>()
            .map_err(|_| AppError::BadRequest(format!("Invalid timestamp '{v}'"))),
        None => Ok(fallback),
    }
}
