//! Scripted condition watcher — replays a pattern of observations.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use circuit_app::ports::{ConditionCallbacks, ConditionWatcher, WatcherError};

/// What a [`ScriptedWatcher`] reports in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Observation {
    Match,
    Unmatch,
    /// Report nothing.
    Idle,
    /// Fail the observation.
    Fail,
}

/// A watcher cycling through a fixed list of observations.
///
/// The pattern wraps around, so `[Idle, Match]` matches every other cycle.
/// An empty pattern always reports nothing.
pub struct ScriptedWatcher {
    name: String,
    pattern: Vec<Observation>,
    latency: Duration,
    cursor: AtomicUsize,
}

impl ScriptedWatcher {
    #[must_use]
    pub fn new(name: impl Into<String>, pattern: Vec<Observation>) -> Self {
        Self {
            name: name.into(),
            pattern,
            latency: Duration::ZERO,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Delay every observation by `latency` before reporting.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn next_observation(&self) -> Observation {
        if self.pattern.is_empty() {
            return Observation::Idle;
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.pattern.len();
        self.pattern[index]
    }
}

#[async_trait]
impl ConditionWatcher for ScriptedWatcher {
    fn describe(&self) -> String {
        format!("virtual:{}", self.name)
    }

    async fn observe(&self, callbacks: &dyn ConditionCallbacks) -> Result<(), WatcherError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let observation = self.next_observation();
        tracing::trace!(watcher = %self.name, ?observation, "virtual observation");
        match observation {
            Observation::Match => callbacks.on_matched().await,
            Observation::Unmatch => callbacks.on_unmatched().await,
            Observation::Idle => {}
            Observation::Fail => {
                return Err(WatcherError(format!("{} failed to observe", self.name)));
            }
        }
        Ok(())
    }
}
