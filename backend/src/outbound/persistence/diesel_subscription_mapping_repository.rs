//! PostgreSQL-backed `SubscriptionMappingRepository` using Diesel.

use async_trait::async_trait;
use diesel::dsl::now;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{SubscriptionMappingRepository, SubscriptionMappingRepositoryError};
use crate::domain::{AppName, NewSubscriptionMapping, SubscriptionMapping};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::{NewSubscriptionMappingRow, SubscriptionMappingRow};
use super::pool::{DbPool, PoolError};
use super::schema::subscription_mappings;

/// Diesel-backed implementation of the `SubscriptionMappingRepository` port.
#[derive(Clone)]
pub struct DieselSubscriptionMappingRepository {
    pool: DbPool,
}

impl DieselSubscriptionMappingRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn pool_error(error: PoolError) -> SubscriptionMappingRepositoryError {
    map_pool_error(error, SubscriptionMappingRepositoryError::connection)
}

fn diesel_error(error: diesel::result::Error) -> SubscriptionMappingRepositoryError {
    map_diesel_error(
        error,
        SubscriptionMappingRepositoryError::query,
        SubscriptionMappingRepositoryError::connection,
    )
}

fn row_to_mapping(
    row: SubscriptionMappingRow,
) -> Result<SubscriptionMapping, SubscriptionMappingRepositoryError> {
    let app_name = AppName::new(row.app_name).map_err(|err| {
        SubscriptionMappingRepositoryError::query(format!("corrupted app name: {err}"))
    })?;
    Ok(SubscriptionMapping {
        app_name,
        external_subscription_id: row.external_subscription_id,
        callback_url: row.callback_url,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[async_trait]
impl SubscriptionMappingRepository for DieselSubscriptionMappingRepository {
    async fn find_by_app(
        &self,
        app_name: &AppName,
    ) -> Result<Option<SubscriptionMapping>, SubscriptionMappingRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let row: Option<SubscriptionMappingRow> = subscription_mappings::table
            .filter(subscription_mappings::app_name.eq(app_name.as_str()))
            .select(SubscriptionMappingRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?;

        row.map(row_to_mapping).transpose()
    }

    async fn upsert(
        &self,
        mapping: &NewSubscriptionMapping,
    ) -> Result<SubscriptionMapping, SubscriptionMappingRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let new_row = NewSubscriptionMappingRow {
            app_name: mapping.app_name.as_str(),
            external_subscription_id: &mapping.external_subscription_id,
            callback_url: &mapping.callback_url,
        };

        let row: SubscriptionMappingRow = diesel::insert_into(subscription_mappings::table)
            .values(&new_row)
            .on_conflict(subscription_mappings::app_name)
            .do_update()
            .set((
                subscription_mappings::external_subscription_id
                    .eq(excluded(subscription_mappings::external_subscription_id)),
                subscription_mappings::callback_url
                    .eq(excluded(subscription_mappings::callback_url)),
                subscription_mappings::updated_at.eq(now),
            ))
            .returning(SubscriptionMappingRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(diesel_error)?;

        row_to_mapping(row)
    }

    async fn delete_by_app(
        &self,
        app_name: &AppName,
    ) -> Result<bool, SubscriptionMappingRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let deleted = diesel::delete(
            subscription_mappings::table
                .filter(subscription_mappings::app_name.eq(app_name.as_str())),
        )
        .execute(&mut conn)
        .await
        .map_err(diesel_error)?;

        Ok(deleted > 0)
    }
}
