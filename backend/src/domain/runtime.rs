//! Time and cancellation helpers shared by the coordination loops.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

/// Sleep abstraction used by the coordination loops.
#[async_trait]
pub trait CoordinationSleeper: Send + Sync {
    /// Suspend execution for `duration`.
    ///
    /// ```rust,no_run
    /// use std::time::Duration;
    /// use webhook_receiver::domain::{CoordinationSleeper, TokioSleeper};
    ///
    /// # async fn demo() {
    /// TokioSleeper.sleep(Duration::from_millis(25)).await;
    /// # }
    /// ```
    async fn sleep(&self, duration: Duration);
}

/// Tokio-based sleeper implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl CoordinationSleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Return whether shutdown has been requested on `shutdown`.
pub fn shutdown_requested(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}

/// Sleep for `duration` unless shutdown is signalled first.
///
/// Returns `true` when the caller should stop. A dropped sender counts as a
/// shutdown request.
pub async fn sleep_or_shutdown(
    sleeper: &dyn CoordinationSleeper,
    duration: Duration,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    if shutdown_requested(shutdown) {
        return true;
    }
    tokio::select! {
        () = sleeper.sleep(duration) => shutdown_requested(shutdown),
        changed = shutdown.changed() => match changed {
            Ok(()) => shutdown_requested(shutdown),
            Err(_) => true,
        },
    }
}
