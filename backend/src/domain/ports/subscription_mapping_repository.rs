//! Port abstraction for the local subscription mapping cache.

use async_trait::async_trait;

use crate::domain::{AppName, NewSubscriptionMapping, SubscriptionMapping};

use super::define_port_error;

define_port_error! {
    /// Errors raised by subscription mapping adapters.
    pub enum SubscriptionMappingRepositoryError {
        /// Store connection could not be established.
        Connection { message: String } =>
            "subscription mapping connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "subscription mapping query failed: {message}",
    }
}

/// Port for reading and writing the one mapping row each app name owns.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionMappingRepository: Send + Sync {
    /// Load the mapping for `app_name`, if any.
    async fn find_by_app(
        &self,
        app_name: &AppName,
    ) -> Result<Option<SubscriptionMapping>, SubscriptionMappingRepositoryError>;

    /// Insert the mapping or overwrite the existing row for the same app name.
    ///
    /// Overwrites keep `created_at` and advance `updated_at`.
    async fn upsert(
        &self,
        mapping: &NewSubscriptionMapping,
    ) -> Result<SubscriptionMapping, SubscriptionMappingRepositoryError>;

    /// Delete the mapping for `app_name`, returning whether a row existed.
    async fn delete_by_app(
        &self,
        app_name: &AppName,
    ) -> Result<bool, SubscriptionMappingRepositoryError>;
}
