//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the circuit controller and the outside world.
//! They are defined here (in `app`) so that both the controller and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod executor;
pub mod identity;
pub mod watcher;

pub use executor::{ExecutionRequest, ExecutorError, ScriptExecutor};
pub use identity::{IdentityIssuer, IssuedIdentity};
pub use watcher::{ConditionCallbacks, ConditionWatcher, WatcherError};
