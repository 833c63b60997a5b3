//! # circuit-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a small **JSON API** over a running circuit:
//!   `/api/logs`, `/api/status` and `/api/stop`
//! - Map HTTP requests into circuit calls (driving adapter)
//! - Map circuit state and errors into HTTP responses
//!
//! ## Dependency rule
//! Depends on `circuit-app` (for the circuit controller) and `circuit-domain`
//! (for the types used in responses). Never leaks axum types into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
