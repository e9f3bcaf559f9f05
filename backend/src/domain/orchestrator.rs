//! Startup sequencing for the coordination layer.
//!
//! After a settling delay the orchestrator provisions the schema once, then
//! alternates between claiming leadership and, while leading, reconciling the
//! subscription and running the heartbeat loop. Followers re-attempt the claim
//! on a fixed period so a dead leader is replaced without restarts.
//!
//! Reconciliation runs between the claim and the first heartbeat, so it is
//! bounded by [`OrchestratorSchedule::reconcile_budget`]; the budget must stay
//! well inside the lease window or the fresh lease lapses before it is renewed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{info, warn};

use super::heartbeat::{HeartbeatExit, HeartbeatLoop, HeartbeatSchedule};
use super::leader_election::{DEFAULT_LEASE_WINDOW, LeaderElector};
use super::reconciler::SubscriptionReconciler;
use super::runtime::{CoordinationSleeper, shutdown_requested, sleep_or_shutdown};
use super::schema_initializer::{SchemaInitError, SchemaInitializer};

/// Fatal coordination failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrchestratorError {
    /// The coordination store could not be provisioned.
    #[error("coordination store initialization failed: {0}")]
    SchemaInit(#[from] SchemaInitError),
}

/// Timing knobs for the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSchedule {
    /// Delay before provisioning, giving the HTTP listener time to bind.
    pub startup_delay: Duration,
    /// Period between election attempts while following.
    pub follower_retry: Duration,
    /// Heartbeat pacing while leading.
    pub heartbeat: HeartbeatSchedule,
    /// Longest a newly elected leader spends reconciling before heartbeats.
    pub reconcile_budget: Duration,
}

impl Default for OrchestratorSchedule {
    fn default() -> Self {
        let heartbeat = HeartbeatSchedule::default();
        Self {
            startup_delay: Duration::from_secs(6),
            follower_retry: heartbeat.interval,
            heartbeat,
            reconcile_budget: DEFAULT_LEASE_WINDOW / 2,
        }
    }
}

/// Sequences schema provisioning, election, reconciliation and heartbeats.
pub struct RegistrationOrchestrator {
    schema: SchemaInitializer,
    elector: Arc<LeaderElector>,
    reconciler: SubscriptionReconciler,
    sleeper: Arc<dyn CoordinationSleeper>,
    schedule: OrchestratorSchedule,
}

impl RegistrationOrchestrator {
    /// Assemble an orchestrator from its collaborators.
    pub fn new(
        schema: SchemaInitializer,
        elector: Arc<LeaderElector>,
        reconciler: SubscriptionReconciler,
        sleeper: Arc<dyn CoordinationSleeper>,
        schedule: OrchestratorSchedule,
    ) -> Self {
        Self {
            schema,
            elector,
            reconciler,
            sleeper,
            schedule,
        }
    }

    /// Elector shared with the HTTP probes.
    pub fn elector(&self) -> &Arc<LeaderElector> {
        &self.elector
    }

    /// Run until `shutdown` fires.
    ///
    /// Only schema provisioning failures are returned; everything after that
    /// is logged and retried. On exit this instance's row is removed on a
    /// best-effort basis.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), OrchestratorError> {
        if sleep_or_shutdown(
            self.sleeper.as_ref(),
            self.schedule.startup_delay,
            &mut shutdown,
        )
        .await
        {
            info!("shutdown requested before coordination started");
            return Ok(());
        }

        let report = self.schema.initialize_blocking().await?;
        info!(
            database = ?report.database,
            purged_instances = report.purged_instances,
            "coordination store ready"
        );

        self.coordinate(&mut shutdown).await;
        self.elector.resign().await;
        Ok(())
    }

    async fn coordinate(&self, shutdown: &mut watch::Receiver<bool>) {
        let instance_id = self.elector.instance_id();
        let heartbeat = HeartbeatLoop::new(
            Arc::clone(&self.elector),
            Arc::clone(&self.sleeper),
            self.schedule.heartbeat,
        );
        loop {
            if shutdown_requested(shutdown) {
                return;
            }
            if self.elector.try_become_leader().await {
                self.register_subscription().await;
                match heartbeat.run(shutdown.clone()).await {
                    HeartbeatExit::Shutdown => return,
                    HeartbeatExit::LeadershipLost(status) => {
                        warn!(%instance_id, ?status, "leadership lost; rejoining election");
                    }
                }
            } else if sleep_or_shutdown(
                self.sleeper.as_ref(),
                self.schedule.follower_retry,
                shutdown,
            )
            .await
            {
                return;
            }
        }
    }

    async fn register_subscription(&self) {
        let instance_id = self.elector.instance_id();
        let budget = self.schedule.reconcile_budget;
        match timeout(budget, self.reconciler.get_or_create_subscription()).await {
            Ok(Some(subscription_id)) => {
                info!(%instance_id, %subscription_id, "leader registered subscription");
            }
            Ok(None) => warn!(%instance_id, "leader holds no subscription"),
            Err(_) => warn!(
                %instance_id,
                ?budget,
                "reconciliation overran its budget; continuing with heartbeats"
            ),
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
