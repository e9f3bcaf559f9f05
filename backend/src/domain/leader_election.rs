//! Leader election over the shared coordination store.
//!
//! The elector owns this process's [`InstanceId`] and publishes the result of
//! every claim through a [`LeadershipFlag`]. Store failures never escape: a
//! failed claim reads as "follower" and a failed heartbeat is logged and left
//! to lease expiry.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::ports::{CoordinationStore, CoordinationStoreError};
use super::{AppName, ClaimOutcome, HeartbeatStatus, InstanceId, LeadershipFlag};

/// Default lease window after which a silent leader may be replaced.
pub const DEFAULT_LEASE_WINDOW: Duration = Duration::from_secs(30);

/// Claims and maintains leadership for one instance within one app name.
pub struct LeaderElector {
    store: Arc<dyn CoordinationStore>,
    instance_id: InstanceId,
    app_name: AppName,
    lease: Duration,
    leadership: LeadershipFlag,
}

impl LeaderElector {
    /// Create an elector with a freshly generated instance id.
    pub fn new(store: Arc<dyn CoordinationStore>, app_name: AppName, lease: Duration) -> Self {
        Self::with_instance_id(store, InstanceId::generate(), app_name, lease)
    }

    /// Create an elector for a known instance id.
    pub fn with_instance_id(
        store: Arc<dyn CoordinationStore>,
        instance_id: InstanceId,
        app_name: AppName,
        lease: Duration,
    ) -> Self {
        Self {
            store,
            instance_id,
            app_name,
            lease,
            leadership: LeadershipFlag::default(),
        }
    }

    /// Stable identifier for this process's lifetime.
    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    /// Leadership partition this elector competes in.
    pub fn app_name(&self) -> &AppName {
        &self.app_name
    }

    /// Shared handle to the published leadership state.
    pub fn leadership(&self) -> LeadershipFlag {
        self.leadership.clone()
    }

    /// Register this instance and attempt to claim leadership.
    ///
    /// Returns `true` when this instance leads after the claim. Store failures
    /// are logged and reported as `false`.
    pub async fn try_become_leader(&self) -> bool {
        match self
            .store
            .try_claim_leadership(&self.instance_id, &self.app_name, self.lease)
            .await
        {
            Ok(outcome) => {
                match outcome {
                    ClaimOutcome::Acquired => info!(
                        instance_id = %self.instance_id,
                        app_name = %self.app_name,
                        "acquired leadership"
                    ),
                    ClaimOutcome::AlreadyLeader => debug!(
                        instance_id = %self.instance_id,
                        app_name = %self.app_name,
                        "leadership retained"
                    ),
                    ClaimOutcome::LeaderPresent => debug!(
                        instance_id = %self.instance_id,
                        app_name = %self.app_name,
                        "another instance holds leadership"
                    ),
                }
                self.leadership.set(outcome.is_leader());
                outcome.is_leader()
            }
            Err(err) => {
                error!(
                    instance_id = %self.instance_id,
                    app_name = %self.app_name,
                    error = %err,
                    "leadership claim failed"
                );
                self.leadership.set(false);
                false
            }
        }
    }

    /// Read this instance's leader flag from the store.
    ///
    /// This reports what the last claim recorded; it does not check whether
    /// other rows hold a fresher lease. Store failures read as `false`.
    pub async fn is_leader(&self) -> bool {
        match self.store.is_leader(&self.instance_id).await {
            Ok(is_leader) => is_leader,
            Err(err) => {
                warn!(
                    instance_id = %self.instance_id,
                    error = %err,
                    "failed to read leader flag"
                );
                false
            }
        }
    }

    /// Refresh this instance's heartbeat.
    ///
    /// Failures are logged here; callers only use the result to pace retries.
    /// A demoted or missing row clears the shared leadership flag.
    pub async fn update_heartbeat(&self) -> Result<HeartbeatStatus, CoordinationStoreError> {
        match self.store.refresh_heartbeat(&self.instance_id).await {
            Ok(status) => {
                match status {
                    HeartbeatStatus::Leader => debug!(instance_id = %self.instance_id, "heartbeat"),
                    HeartbeatStatus::Follower => {
                        warn!(instance_id = %self.instance_id, "instance was demoted");
                        self.leadership.set(false);
                    }
                    HeartbeatStatus::Missing => {
                        warn!(instance_id = %self.instance_id, "instance row disappeared");
                        self.leadership.set(false);
                    }
                }
                Ok(status)
            }
            Err(err) => {
                error!(
                    instance_id = %self.instance_id,
                    error = %err,
                    "heartbeat update failed"
                );
                Err(err)
            }
        }
    }

    /// Best-effort removal of this instance's row on shutdown.
    pub async fn resign(&self) {
        self.leadership.set(false);
        match self.store.remove_instance(&self.instance_id).await {
            Ok(true) => info!(instance_id = %self.instance_id, "instance deregistered"),
            Ok(false) => debug!(instance_id = %self.instance_id, "instance row already gone"),
            Err(err) => warn!(
                instance_id = %self.instance_id,
                error = %err,
                "failed to deregister instance"
            ),
        }
    }
}
