//! One-way stop signal shared between a circuit and whoever may stop it.

use std::sync::Arc;

use tokio::sync::watch;

/// A flag raised to stop a run. Once raised it stays raised.
///
/// Cloning shares the same flag.
#[derive(Debug, Clone)]
pub struct StopSignal {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for StopSignal {
    fn default() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }
}

impl StopSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Raising it again has no effect.
    pub fn raise(&self) {
        self.sender.send_replace(true);
    }

    #[must_use]
    pub fn is_raised(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolve once the flag is raised (immediately if it already is).
    pub async fn raised(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives as long as `self`, so waiting cannot fail.
        let _ = receiver.wait_for(|raised| *raised).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn should_start_lowered() {
        assert!(!StopSignal::new().is_raised());
    }

    #[test]
    fn should_share_flag_between_clones() {
        let signal = StopSignal::new();
        let other = signal.clone();
        other.raise();
        assert!(signal.is_raised());
    }

    #[test]
    fn should_stay_raised_when_raised_twice() {
        let signal = StopSignal::new();
        signal.raise();
        signal.raise();
        assert!(signal.is_raised());
    }

    #[tokio::test]
    async fn should_resolve_immediately_when_already_raised() {
        let signal = StopSignal::new();
        signal.raise();
        tokio::time::timeout(Duration::from_millis(100), signal.raised())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn should_wake_waiter_when_raised_later() {
        let signal = StopSignal::new();
        let waiter = signal.clone();
        let raise = async {
            tokio::task::yield_now().await;
            signal.raise();
        };
        let wait = tokio::time::timeout(Duration::from_secs(1), waiter.raised());
        let ((), waited) = futures::join!(raise, wait);
        assert!(waited.is_ok());
    }
}
