//! Leader heartbeat loop.
//!
//! Runs only while this instance leads. Each cycle refreshes the lease, then
//! sleeps for the regular interval, or for the shorter retry interval after a
//! failed write. Shutdown is checked before every write, so a cancelled loop
//! never starts a new store update.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use super::HeartbeatStatus;
use super::leader_election::LeaderElector;
use super::runtime::{CoordinationSleeper, shutdown_requested, sleep_or_shutdown};

/// Pacing of the heartbeat loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatSchedule {
    /// Delay after a successful refresh.
    pub interval: Duration,
    /// Delay after a failed refresh.
    pub retry: Duration,
}

impl Default for HeartbeatSchedule {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            retry: Duration::from_secs(5),
        }
    }
}

/// Why the heartbeat loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatExit {
    /// Shutdown was requested.
    Shutdown,
    /// The store no longer records this instance as leader.
    LeadershipLost(HeartbeatStatus),
}

/// Periodic lease refresher for the current leader.
pub struct HeartbeatLoop {
    elector: Arc<LeaderElector>,
    sleeper: Arc<dyn CoordinationSleeper>,
    schedule: HeartbeatSchedule,
}

impl HeartbeatLoop {
    /// Build a loop refreshing `elector`'s row on `schedule`.
    pub fn new(
        elector: Arc<LeaderElector>,
        sleeper: Arc<dyn CoordinationSleeper>,
        schedule: HeartbeatSchedule,
    ) -> Self {
        Self {
            elector,
            sleeper,
            schedule,
        }
    }

    /// Run until shutdown or until the store reports lost leadership.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> HeartbeatExit {
        let instance_id = self.elector.instance_id();
        info!(%instance_id, "heartbeat loop started");
        loop {
            if shutdown_requested(&shutdown) {
                info!(%instance_id, "heartbeat loop stopped");
                return HeartbeatExit::Shutdown;
            }
            let delay = match self.elector.update_heartbeat().await {
                Ok(HeartbeatStatus::Leader) => self.schedule.interval,
                Ok(status) => {
                    warn!(%instance_id, ?status, "heartbeat loop lost leadership");
                    return HeartbeatExit::LeadershipLost(status);
                }
                Err(_) => self.schedule.retry,
            };
            if sleep_or_shutdown(self.sleeper.as_ref(), delay, &mut shutdown).await {
                info!(%instance_id, "heartbeat loop stopped");
                return HeartbeatExit::Shutdown;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::domain::ports::{CoordinationStoreError, MockCoordinationStore};
    use crate::domain::{AppName, leader_election::DEFAULT_LEASE_WINDOW};

    /// Records delays and requests shutdown after a fixed number of sleeps.
    struct StoppingSleeper {
        delays: Mutex<Vec<Duration>>,
        stop_after: usize,
        shutdown: watch::Sender<bool>,
    }

    #[async_trait]
    impl CoordinationSleeper for StoppingSleeper {
        async fn sleep(&self, duration: Duration) {
            let mut delays = self.delays.lock().expect("delays mutex");
            delays.push(duration);
            if delays.len() >= self.stop_after {
                self.shutdown.send_replace(true);
            }
        }
    }

    fn heartbeat_loop(
        store: MockCoordinationStore,
        stop_after: usize,
    ) -> (HeartbeatLoop, Arc<StoppingSleeper>, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        let sleeper = Arc::new(StoppingSleeper {
            delays: Mutex::new(Vec::new()),
            stop_after,
            shutdown: tx,
        });
        let elector = Arc::new(LeaderElector::new(
            Arc::new(store),
            AppName::new("Svc").expect("app name"),
            DEFAULT_LEASE_WINDOW,
        ));
        let heartbeat = HeartbeatLoop::new(elector, sleeper.clone(), HeartbeatSchedule::default());
        (heartbeat, sleeper, rx)
    }

    #[tokio::test]
    async fn refreshes_on_the_regular_interval_until_shutdown() {
        let mut store = MockCoordinationStore::new();
        store
            .expect_refresh_heartbeat()
            .times(3)
            .returning(|_| Ok(HeartbeatStatus::Leader));
        let (heartbeat, sleeper, rx) = heartbeat_loop(store, 3);

        assert_eq!(heartbeat.run(rx).await, HeartbeatExit::Shutdown);
        assert_eq!(
            *sleeper.delays.lock().expect("delays mutex"),
            vec![Duration::from_secs(10); 3]
        );
    }

    #[tokio::test]
    async fn failed_refresh_shortens_the_next_sleep() {
        let mut store = MockCoordinationStore::new();
        let mut calls = 0;
        store.expect_refresh_heartbeat().times(3).returning(move |_| {
            calls += 1;
            if calls == 2 {
                Err(CoordinationStoreError::connection("reset"))
            } else {
                Ok(HeartbeatStatus::Leader)
            }
        });
        let (heartbeat, sleeper, rx) = heartbeat_loop(store, 3);

        assert_eq!(heartbeat.run(rx).await, HeartbeatExit::Shutdown);
        assert_eq!(
            *sleeper.delays.lock().expect("delays mutex"),
            vec![
                Duration::from_secs(10),
                Duration::from_secs(5),
                Duration::from_secs(10)
            ]
        );
    }

    #[tokio::test]
    async fn demotion_ends_the_loop() {
        let mut store = MockCoordinationStore::new();
        store
            .expect_refresh_heartbeat()
            .times(1)
            .returning(|_| Ok(HeartbeatStatus::Follower));
        let (heartbeat, sleeper, rx) = heartbeat_loop(store, 10);

        assert_eq!(
            heartbeat.run(rx).await,
            HeartbeatExit::LeadershipLost(HeartbeatStatus::Follower)
        );
        assert!(sleeper.delays.lock().expect("delays mutex").is_empty());
    }

    #[tokio::test]
    async fn pending_shutdown_prevents_any_write() {
        let mut store = MockCoordinationStore::new();
        store.expect_refresh_heartbeat().never();
        let (heartbeat, sleeper, rx) = heartbeat_loop(store, 10);
        sleeper.shutdown.send_replace(true);

        assert_eq!(heartbeat.run(rx).await, HeartbeatExit::Shutdown);
    }
}
