//! Shared application state for axum handlers.

use circuit_app::circuit::Circuit;

/// Application state shared across all axum handlers.
///
/// [`Circuit`] is a cheap handle, so cloning the state shares the same
/// circuit with the task running it.
#[derive(Clone)]
pub struct AppState {
    pub circuit: Circuit,
}

impl AppState {
    #[must_use]
    pub fn new(circuit: Circuit) -> Self {
        Self { circuit }
    }
}
