//! Shutdown coordination.

use tokio_util::sync::CancellationToken;

/// Process-wide shutdown signal.
///
/// Cloning shares the same signal. The host wires it to OS signals (see
/// `signals.rs`); the service runner listens on it as its termination hook.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    /// Create a new, untriggered shutdown signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger the shutdown signal. Repeated calls have no further effect.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolve once the signal has been triggered.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn clones_share_the_signal() {
        let shutdown = Shutdown::new();
        let observer = shutdown.clone();
        assert!(!observer.is_triggered());

        let waiter = tokio::spawn(async move { observer.cancelled().await });
        shutdown.trigger();
        shutdown.trigger();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter not released")
            .unwrap();
        assert!(shutdown.is_triggered());
    }
}
