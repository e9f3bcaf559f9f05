//! PostgreSQL persistence adapters for the coordination store.
//!
//! - **Thin adapters**: implementations only translate between Diesel rows
//!   and domain types; election rules live in SQL that the domain port
//!   describes, not in Rust branching over stale reads.
//! - **Internal models**: row structs (`models.rs`) and table definitions
//!   (`schema.rs`) never leave this module.
//! - **Async-safe pooling**: runtime queries use `diesel-async` over `bb8`.
//!   Provisioning uses the synchronous `postgres` client and must run on a
//!   blocking thread.
//!
//! # Example
//!
//! ```ignore
//! use webhook_receiver::outbound::persistence::{DbPool, DieselCoordinationStore, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/webhook_db")).await?;
//! let store = DieselCoordinationStore::new(pool);
//! ```

mod diesel_coordination_store;
mod diesel_error_mapping;
mod diesel_subscription_mapping_repository;
mod models;
mod pool;
mod postgres_schema_provisioner;
mod schema;

pub use diesel_coordination_store::DieselCoordinationStore;
pub use diesel_subscription_mapping_repository::DieselSubscriptionMappingRepository;
pub use pool::{DbPool, PoolConfig, PoolError};
pub use postgres_schema_provisioner::PostgresSchemaProvisioner;
