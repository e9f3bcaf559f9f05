//! Port abstraction for provisioning the coordination database.
//!
//! Provisioning runs once at startup before any pooled connection is opened,
//! so the port is synchronous like other catalog-level operations.

use std::time::Duration;

use super::define_port_error;

define_port_error! {
    /// Errors raised while provisioning the coordination database.
    pub enum SchemaProvisionError {
        /// Connection to the server or target database failed.
        Connection { message: String } =>
            "schema provisioning connection failed: {message}",
        /// DDL or maintenance statement failed.
        Query { message: String } =>
            "schema provisioning query failed: {message}",
        /// The configured connection string could not be interpreted.
        InvalidDatabaseUrl { message: String } =>
            "invalid database url: {message}",
    }
}

/// Whether the target database had to be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseProvisioning {
    /// The database was created by this call.
    Created,
    /// The database already existed.
    Existing,
}

/// Port for idempotent database and table provisioning.
#[cfg_attr(test, mockall::automock)]
pub trait SchemaProvisioner: Send + Sync {
    /// Create the target database when missing.
    fn ensure_database(&self) -> Result<DatabaseProvisioning, SchemaProvisionError>;

    /// Create the coordination tables and indexes when missing.
    fn ensure_tables(&self) -> Result<(), SchemaProvisionError>;

    /// Delete instance rows whose heartbeat is older than `stale_after`.
    ///
    /// Returns the number of rows removed.
    fn purge_stale_instances(&self, stale_after: Duration) -> Result<u64, SchemaProvisionError>;
}
