//! In-memory coordination store mirroring the PostgreSQL adapter's rules.
//!
//! Claims are serialised by one mutex, leases are judged against an injected
//! [`Clock`], and heartbeats never move backwards. The same value also acts
//! as a [`SchemaProvisioner`] so startup purging can be exercised.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;

use crate::domain::ports::{
    CoordinationStore, CoordinationStoreError, DatabaseProvisioning, SchemaProvisionError,
    SchemaProvisioner, SubscriptionMappingRepository, SubscriptionMappingRepositoryError,
};
use crate::domain::{
    AppName, ClaimOutcome, HeartbeatStatus, InstanceId, InstanceRecord, NewSubscriptionMapping,
    SubscriptionMapping,
};

#[derive(Default)]
struct StoreState {
    rows: HashMap<InstanceId, InstanceRecord>,
    database_exists: bool,
    unavailable: bool,
}

/// Shared instance table held in memory.
pub struct InMemoryCoordinationStore {
    clock: Arc<dyn Clock>,
    state: Mutex<StoreState>,
}

impl InMemoryCoordinationStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Make every subsequent call fail with a connection error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock_state().unavailable = unavailable;
    }

    /// Seed a row directly, bypassing claim rules.
    pub fn insert_record(&self, record: InstanceRecord) {
        self.lock_state().rows.insert(record.id, record);
    }

    /// Snapshot of every row.
    pub fn records(&self) -> Vec<InstanceRecord> {
        self.lock_state().rows.values().cloned().collect()
    }

    /// Instances of `app_name` currently flagged leader, live or not.
    pub fn flagged_leaders(&self, app_name: &AppName) -> Vec<InstanceId> {
        self.lock_state()
            .rows
            .values()
            .filter(|row| row.is_leader && &row.app_name == app_name)
            .map(|row| row.id)
            .collect()
    }

    fn lock_state(&self) -> MutexGuard<'_, StoreState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("coordination store mutex"),
        }
    }

    fn available_state(&self) -> Result<MutexGuard<'_, StoreState>, CoordinationStoreError> {
        let state = self.lock_state();
        if state.unavailable {
            return Err(CoordinationStoreError::connection("store unavailable"));
        }
        Ok(state)
    }

    fn cutoff(&self, age: Duration) -> Result<DateTime<Utc>, String> {
        let age = TimeDelta::from_std(age).map_err(|err| err.to_string())?;
        Ok(self.clock.utc() - age)
    }
}

#[async_trait]
impl CoordinationStore for InMemoryCoordinationStore {
    async fn try_claim_leadership(
        &self,
        instance: &InstanceId,
        app_name: &AppName,
        lease: Duration,
    ) -> Result<ClaimOutcome, CoordinationStoreError> {
        let now = self.clock.utc();
        let cutoff = self.cutoff(lease).map_err(CoordinationStoreError::query)?;
        let mut state = self.available_state()?;

        state
            .rows
            .entry(*instance)
            .and_modify(|row| row.heartbeat_at = row.heartbeat_at.max(now))
            .or_insert_with(|| InstanceRecord {
                id: *instance,
                app_name: app_name.clone(),
                is_leader: false,
                heartbeat_at: now,
                created_at: now,
            });

        let mut live_leaders = Vec::new();
        for row in state.rows.values_mut() {
            if !row.is_leader || &row.app_name != app_name {
                continue;
            }
            if row.heartbeat_at <= cutoff {
                row.is_leader = false;
            } else {
                live_leaders.push(row.id);
            }
        }

        if live_leaders.contains(instance) {
            return Ok(ClaimOutcome::AlreadyLeader);
        }
        if !live_leaders.is_empty() {
            return Ok(ClaimOutcome::LeaderPresent);
        }
        if let Some(row) = state.rows.get_mut(instance) {
            row.is_leader = true;
        }
        Ok(ClaimOutcome::Acquired)
    }

    async fn is_leader(&self, instance: &InstanceId) -> Result<bool, CoordinationStoreError> {
        let state = self.available_state()?;
        Ok(state.rows.get(instance).is_some_and(|row| row.is_leader))
    }

    async fn refresh_heartbeat(
        &self,
        instance: &InstanceId,
    ) -> Result<HeartbeatStatus, CoordinationStoreError> {
        let now = self.clock.utc();
        let mut state = self.available_state()?;
        let Some(row) = state.rows.get_mut(instance) else {
            return Ok(HeartbeatStatus::Missing);
        };
        row.heartbeat_at = row.heartbeat_at.max(now);
        Ok(if row.is_leader {
            HeartbeatStatus::Leader
        } else {
            HeartbeatStatus::Follower
        })
    }

    async fn remove_instance(&self, instance: &InstanceId) -> Result<bool, CoordinationStoreError> {
        let mut state = self.available_state()?;
        Ok(state.rows.remove(instance).is_some())
    }

    async fn find_instance(
        &self,
        instance: &InstanceId,
    ) -> Result<Option<InstanceRecord>, CoordinationStoreError> {
        let state = self.available_state()?;
        Ok(state.rows.get(instance).cloned())
    }
}

impl SchemaProvisioner for InMemoryCoordinationStore {
    fn ensure_database(&self) -> Result<DatabaseProvisioning, SchemaProvisionError> {
        let mut state = self.lock_state();
        if state.unavailable {
            return Err(SchemaProvisionError::connection("store unavailable"));
        }
        if state.database_exists {
            return Ok(DatabaseProvisioning::Existing);
        }
        state.database_exists = true;
        Ok(DatabaseProvisioning::Created)
    }

    fn ensure_tables(&self) -> Result<(), SchemaProvisionError> {
        if self.lock_state().unavailable {
            return Err(SchemaProvisionError::connection("store unavailable"));
        }
        Ok(())
    }

    fn purge_stale_instances(&self, stale_after: Duration) -> Result<u64, SchemaProvisionError> {
        let cutoff = self
            .cutoff(stale_after)
            .map_err(SchemaProvisionError::query)?;
        let mut state = self.lock_state();
        let before = state.rows.len();
        state.rows.retain(|_, row| row.heartbeat_at >= cutoff);
        Ok(u64::try_from(before - state.rows.len()).unwrap_or(u64::MAX))
    }
}

/// Subscription mapping table held in memory.
pub struct InMemorySubscriptionMappings {
    clock: Arc<dyn Clock>,
    rows: Mutex<HashMap<AppName, SubscriptionMapping>>,
}

impl InMemorySubscriptionMappings {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            rows: Mutex::new(HashMap::new()),
        }
    }

    /// Seed a mapping directly.
    pub fn insert(&self, mapping: SubscriptionMapping) {
        self.lock_rows().insert(mapping.app_name.clone(), mapping);
    }

    /// Current mapping for `app_name`, if any.
    pub fn get(&self, app_name: &AppName) -> Option<SubscriptionMapping> {
        self.lock_rows().get(app_name).cloned()
    }

    fn lock_rows(&self) -> MutexGuard<'_, HashMap<AppName, SubscriptionMapping>> {
        match self.rows.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("mapping mutex"),
        }
    }
}

#[async_trait]
impl SubscriptionMappingRepository for InMemorySubscriptionMappings {
    async fn find_by_app(
        &self,
        app_name: &AppName,
    ) -> Result<Option<SubscriptionMapping>, SubscriptionMappingRepositoryError> {
        Ok(self.get(app_name))
    }

    async fn upsert(
        &self,
        mapping: &NewSubscriptionMapping,
    ) -> Result<SubscriptionMapping, SubscriptionMappingRepositoryError> {
        let now = self.clock.utc();
        let mut rows = self.lock_rows();
        let created_at = rows
            .get(&mapping.app_name)
            .map_or(now, |existing| existing.created_at);
        let stored = SubscriptionMapping {
            app_name: mapping.app_name.clone(),
            external_subscription_id: mapping.external_subscription_id.clone(),
            callback_url: mapping.callback_url.clone(),
            created_at,
            updated_at: now,
        };
        rows.insert(mapping.app_name.clone(), stored.clone());
        Ok(stored)
    }

    async fn delete_by_app(
        &self,
        app_name: &AppName,
    ) -> Result<bool, SubscriptionMappingRepositoryError> {
        Ok(self.lock_rows().remove(app_name).is_some())
    }
}
