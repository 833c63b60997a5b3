//! # circuit-adapter-virtual
//!
//! Virtual implementations of every circuit port, for testing and
//! demonstration purposes. Nothing here talks to a network.
//!
//! ## Provided adapters
//!
//! | Port | Adapter | Behaviour |
//! |------|---------|-----------|
//! | `ConditionWatcher` | [`ScriptedWatcher`] | Replays a fixed pattern of observations, one per cycle |
//! | `ScriptExecutor` | [`EchoExecutor`] | Answers with a digest of the request, optionally failing |
//! | `IdentityIssuer` | [`LocalIdentityIssuer`] | Derives a stable key from the script hash |
//!
//! ## Dependency rule
//!
//! Depends on `circuit-app` (port traits) and `circuit-domain` only.

mod executor;
mod identity;
mod watcher;

pub use executor::EchoExecutor;
pub use identity::LocalIdentityIssuer;
pub use watcher::{Observation, ScriptedWatcher};
