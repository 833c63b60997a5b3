//! JSON handlers for circuit status and control.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use circuit_app::circuit::CircuitStatus;
use circuit_domain::constraint::RunCounters;
use circuit_domain::id::ConditionId;

use crate::state::AppState;

/// Snapshot returned by `GET /api/status`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: CircuitStatus,
    pub counters: RunCounters,
    /// Conditions currently counted as satisfied.
    pub satisfied: Vec<ConditionId>,
    pub content_hash: String,
    /// Unit names of the compiled script, in execution order.
    pub units: Vec<String>,
}

/// `GET /api/status` — lifecycle, counters and compiled script summary.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let script = state.circuit.script();
    Json(StatusResponse {
        status: state.circuit.status(),
        counters: state.circuit.counters(),
        satisfied: state.circuit.satisfied_conditions(),
        content_hash: script.content_hash(),
        units: script.units().iter().map(|u| u.name.clone()).collect(),
    })
}

/// `POST /api/stop` — request the circuit to stop.
///
/// Answers `202 Accepted`: the circuit halts once in-flight work completes.
pub async fn stop(State(state): State<AppState>) -> StatusCode {
    tracing::info!("stop requested over http");
    state.circuit.stop();
    StatusCode::ACCEPTED
}
