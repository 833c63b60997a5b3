//! Condition watcher port — observation of one external condition.

use async_trait::async_trait;

/// Callback slots the circuit installs on each condition.
///
/// A watcher calls [`on_matched`](Self::on_matched) when its condition starts
/// to hold and [`on_unmatched`](Self::on_unmatched) when it stops holding.
#[async_trait]
pub trait ConditionCallbacks: Send + Sync {
    async fn on_matched(&self);

    async fn on_unmatched(&self);
}

/// Observes one external condition (contract event, webhook poll, …).
#[async_trait]
pub trait ConditionWatcher: Send + Sync {
    /// Short description used in log entries.
    fn describe(&self) -> String {
        "condition".to_string()
    }

    /// Observe the condition once, reporting through `callbacks`.
    ///
    /// Returns when the observation settles. Called once per circuit cycle.
    ///
    /// # Errors
    ///
    /// Returns a [`WatcherError`] when the observation fails. The circuit
    /// logs it and keeps running.
    async fn observe(&self, callbacks: &dyn ConditionCallbacks) -> Result<(), WatcherError>;
}

/// Failure of a single observation.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct WatcherError(pub String);
