//! JSON API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod control;
#[allow(clippy::missing_errors_doc)]
pub mod logs;

use axum::Router;
use axum::routing::{get, post};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/logs", get(logs::list))
        .route("/status", get(control::status))
        .route("/stop", post(control::stop))
}
