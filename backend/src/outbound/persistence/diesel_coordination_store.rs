//! PostgreSQL-backed `CoordinationStore` implementation using Diesel.
//!
//! A leadership claim runs in one transaction that first takes a
//! transaction-scoped advisory lock keyed by the app name. Concurrent claims
//! for the same app therefore run one after another, and the second claimant
//! always observes the first one's promotion. The partial unique index on
//! `instances (app_name) WHERE is_leader` rejects any second leader row that
//! bypasses the lock.
//!
//! All timestamps come from the database clock (`now()`), so instances with
//! skewed local clocks still agree on lease age.

use std::time::Duration;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{Double, Text};
use diesel_async::RunQueryDsl;

use crate::domain::ports::{CoordinationStore, CoordinationStoreError};
use crate::domain::{AppName, ClaimOutcome, HeartbeatStatus, InstanceId, InstanceRecord};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::{InstanceRow, LeaderFlagRow};
use super::pool::{DbPool, PoolError};
use super::schema::instances;

const CLAIM_LOCK_SQL: &str = "SELECT pg_advisory_xact_lock(hashtext($1))";

const UPSERT_INSTANCE_SQL: &str = concat!(
    "INSERT INTO instances (id, app_name, is_leader, heartbeat_at, created_at) ",
    "VALUES ($1, $2, FALSE, now(), now()) ",
    "ON CONFLICT (id) DO UPDATE ",
    "SET heartbeat_at = GREATEST(instances.heartbeat_at, EXCLUDED.heartbeat_at)"
);

const DEMOTE_EXPIRED_SQL: &str = concat!(
    "UPDATE instances SET is_leader = FALSE ",
    "WHERE app_name = $1 AND is_leader ",
    "AND heartbeat_at <= now() - make_interval(secs => $2)"
);

const REFRESH_HEARTBEAT_SQL: &str = concat!(
    "UPDATE instances SET heartbeat_at = GREATEST(heartbeat_at, now()) ",
    "WHERE id = $1 RETURNING is_leader"
);

/// Diesel-backed implementation of the `CoordinationStore` port.
#[derive(Clone)]
pub struct DieselCoordinationStore {
    pool: DbPool,
}

impl DieselCoordinationStore {
    /// Create a new store with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn pool_error(error: PoolError) -> CoordinationStoreError {
    map_pool_error(error, CoordinationStoreError::connection)
}

fn diesel_error(error: diesel::result::Error) -> CoordinationStoreError {
    map_diesel_error(
        error,
        CoordinationStoreError::query,
        CoordinationStoreError::connection,
    )
}

fn row_to_record(row: InstanceRow) -> Result<InstanceRecord, CoordinationStoreError> {
    let id = row.id.parse::<InstanceId>().map_err(|err| {
        CoordinationStoreError::query(format!("corrupted instance id {}: {err}", row.id))
    })?;
    let app_name = AppName::new(row.app_name)
        .map_err(|err| CoordinationStoreError::query(format!("corrupted app name: {err}")))?;
    Ok(InstanceRecord {
        id,
        app_name,
        is_leader: row.is_leader,
        heartbeat_at: row.heartbeat_at,
        created_at: row.created_at,
    })
}

#[async_trait]
impl CoordinationStore for DieselCoordinationStore {
    async fn try_claim_leadership(
        &self,
        instance: &InstanceId,
        app_name: &AppName,
        lease: Duration,
    ) -> Result<ClaimOutcome, CoordinationStoreError> {
        use diesel_async::AsyncConnection as _;
        use diesel_async::scoped_futures::ScopedFutureExt as _;

        let instance_id = instance.to_string();
        let app = app_name.as_str().to_owned();
        let lease_secs = lease.as_secs_f64();
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        conn.transaction(|conn| {
            async move {
                sql_query(CLAIM_LOCK_SQL)
                    .bind::<Text, _>(&app)
                    .execute(conn)
                    .await?;

                sql_query(UPSERT_INSTANCE_SQL)
                    .bind::<Text, _>(&instance_id)
                    .bind::<Text, _>(&app)
                    .execute(conn)
                    .await?;

                sql_query(DEMOTE_EXPIRED_SQL)
                    .bind::<Text, _>(&app)
                    .bind::<Double, _>(lease_secs)
                    .execute(conn)
                    .await?;

                let live_leaders: Vec<String> = instances::table
                    .filter(instances::app_name.eq(&app))
                    .filter(instances::is_leader.eq(true))
                    .select(instances::id)
                    .load(conn)
                    .await?;

                if live_leaders.iter().any(|id| *id == instance_id) {
                    return Ok(ClaimOutcome::AlreadyLeader);
                }
                if !live_leaders.is_empty() {
                    return Ok(ClaimOutcome::LeaderPresent);
                }

                diesel::update(instances::table.find(&instance_id))
                    .set(instances::is_leader.eq(true))
                    .execute(conn)
                    .await?;
                Ok(ClaimOutcome::Acquired)
            }
            .scope_boxed()
        })
        .await
        .map_err(diesel_error)
    }

    async fn is_leader(&self, instance: &InstanceId) -> Result<bool, CoordinationStoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let flag: Option<bool> = instances::table
            .find(instance.to_string())
            .select(instances::is_leader)
            .first(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?;

        Ok(flag.unwrap_or(false))
    }

    async fn refresh_heartbeat(
        &self,
        instance: &InstanceId,
    ) -> Result<HeartbeatStatus, CoordinationStoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let row: Option<LeaderFlagRow> = sql_query(REFRESH_HEARTBEAT_SQL)
            .bind::<Text, _>(instance.to_string())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?;

        Ok(match row {
            Some(LeaderFlagRow { is_leader: true }) => HeartbeatStatus::Leader,
            Some(LeaderFlagRow { is_leader: false }) => HeartbeatStatus::Follower,
            None => HeartbeatStatus::Missing,
        })
    }

    async fn remove_instance(&self, instance: &InstanceId) -> Result<bool, CoordinationStoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let deleted = diesel::delete(instances::table.find(instance.to_string()))
            .execute(&mut conn)
            .await
            .map_err(diesel_error)?;

        Ok(deleted > 0)
    }

    async fn find_instance(
        &self,
        instance: &InstanceId,
    ) -> Result<Option<InstanceRecord>, CoordinationStoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let row: Option<InstanceRow> = instances::table
            .find(instance.to_string())
            .select(InstanceRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?;

        row.map(row_to_record).transpose()
    }
}
