//! JSON handler for the circuit log.

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;

use circuit_domain::log::{LogCategory, LogEntry};

use crate::error::ApiError;
use crate::state::AppState;

/// Query string of `GET /api/logs`.
#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    /// `condition`, `error` or `response`, case-insensitive.
    pub category: Option<String>,
}

/// `GET /api/logs?category=` — log entries, oldest first.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Vec<LogEntry>>, ApiError> {
    let category = query
        .category
        .as_deref()
        .map(str::parse::<LogCategory>)
        .transpose()?;
    Ok(Json(state.circuit.logs(category)))
}
