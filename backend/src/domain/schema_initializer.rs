//! Startup provisioning of the coordination database.
//!
//! Provisioning is idempotent and never destructive to schema objects. Any
//! failure is fatal to startup: election must not run without a usable store.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::ports::{DatabaseProvisioning, SchemaProvisionError, SchemaProvisioner};

/// Default age after which an instance row is purged at startup.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(5 * 60);

/// Fatal provisioning failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaInitError {
    /// The target database could not be found or created.
    #[error("failed to ensure database: {0}")]
    Database(#[source] SchemaProvisionError),
    /// Tables or indexes could not be created.
    #[error("failed to ensure tables: {0}")]
    Tables(#[source] SchemaProvisionError),
    /// Stale instance rows could not be purged.
    #[error("failed to purge stale instances: {0}")]
    Purge(#[source] SchemaProvisionError),
    /// The blocking provisioning task did not complete.
    #[error("schema initialization task aborted: {message}")]
    Aborted {
        /// Join failure description.
        message: String,
    },
}

/// Summary of a successful initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaInitReport {
    /// Whether the database had to be created.
    pub database: DatabaseProvisioning,
    /// Number of stale instance rows deleted.
    pub purged_instances: u64,
}

/// Runs database, table and staleness provisioning in order.
#[derive(Clone)]
pub struct SchemaInitializer {
    provisioner: Arc<dyn SchemaProvisioner>,
    stale_after: Duration,
}

impl SchemaInitializer {
    /// Build an initializer purging rows older than `stale_after`.
    pub fn new(provisioner: Arc<dyn SchemaProvisioner>, stale_after: Duration) -> Self {
        Self {
            provisioner,
            stale_after,
        }
    }

    /// Provision synchronously on the current thread.
    pub fn initialize(&self) -> Result<SchemaInitReport, SchemaInitError> {
        let database = self
            .provisioner
            .ensure_database()
            .map_err(SchemaInitError::Database)?;
        match database {
            DatabaseProvisioning::Created => info!("created coordination database"),
            DatabaseProvisioning::Existing => info!("coordination database already exists"),
        }

        self.provisioner
            .ensure_tables()
            .map_err(SchemaInitError::Tables)?;
        info!("coordination schema initialized");

        let purged_instances = self
            .provisioner
            .purge_stale_instances(self.stale_after)
            .map_err(SchemaInitError::Purge)?;
        if purged_instances > 0 {
            info!(purged_instances, "purged stale instances");
        }

        Ok(SchemaInitReport {
            database,
            purged_instances,
        })
    }

    /// Provision on the blocking thread pool.
    pub async fn initialize_blocking(&self) -> Result<SchemaInitReport, SchemaInitError> {
        let initializer = self.clone();
        tokio::task::spawn_blocking(move || initializer.initialize())
            .await
            .map_err(|err| SchemaInitError::Aborted {
                message: err.to_string(),
            })?
    }
}
