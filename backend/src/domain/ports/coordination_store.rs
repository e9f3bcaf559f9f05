//! Driven port for the shared instance registry used for leader election.
//!
//! The store owns the atomicity of a leadership claim: adapters must ensure
//! that at most one live leader exists per app name, even when several
//! instances claim concurrently.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{AppName, ClaimOutcome, HeartbeatStatus, InstanceId, InstanceRecord};

use super::define_port_error;

define_port_error! {
    /// Errors raised by coordination store adapters.
    pub enum CoordinationStoreError {
        /// Store connection could not be established.
        Connection { message: String } =>
            "coordination store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "coordination store query failed: {message}",
    }
}

/// Port for registering instances and arbitrating leadership.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Register `instance` under `app_name`, refresh its heartbeat, and
    /// promote it when no other instance holds a lease younger than `lease`.
    ///
    /// The whole claim is one atomic unit. A leader whose heartbeat is older
    /// than `lease` is demoted as part of the claim.
    async fn try_claim_leadership(
        &self,
        instance: &InstanceId,
        app_name: &AppName,
        lease: Duration,
    ) -> Result<ClaimOutcome, CoordinationStoreError>;

    /// Return whether the row for `instance` is currently marked leader.
    ///
    /// Missing rows report `false`.
    async fn is_leader(&self, instance: &InstanceId) -> Result<bool, CoordinationStoreError>;

    /// Advance the heartbeat of `instance` to the store's current time.
    ///
    /// Heartbeats never move backwards.
    async fn refresh_heartbeat(
        &self,
        instance: &InstanceId,
    ) -> Result<HeartbeatStatus, CoordinationStoreError>;

    /// Delete the row for `instance`, returning whether a row existed.
    async fn remove_instance(&self, instance: &InstanceId) -> Result<bool, CoordinationStoreError>;

    /// Load the row for `instance`, if present.
    async fn find_instance(
        &self,
        instance: &InstanceId,
    ) -> Result<Option<InstanceRecord>, CoordinationStoreError>;
}
