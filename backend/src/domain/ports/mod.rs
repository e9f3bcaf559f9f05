//! Domain ports defining the edges of the coordination hexagon.
//!
//! Ports describe how the coordination services expect to interact with the
//! shared database and the remote subscription registry. Each trait exposes a
//! strongly typed error so adapters map driver failures into predictable
//! variants.

mod macros;
pub(crate) use macros::define_port_error;

mod coordination_store;
mod schema_provisioner;
mod subscription_mapping_repository;
mod subscription_registry;

#[cfg(test)]
pub use coordination_store::MockCoordinationStore;
pub use coordination_store::{CoordinationStore, CoordinationStoreError};
#[cfg(test)]
pub use schema_provisioner::MockSchemaProvisioner;
pub use schema_provisioner::{DatabaseProvisioning, SchemaProvisionError, SchemaProvisioner};
#[cfg(test)]
pub use subscription_mapping_repository::MockSubscriptionMappingRepository;
pub use subscription_mapping_repository::{
    SubscriptionMappingRepository, SubscriptionMappingRepositoryError,
};
#[cfg(test)]
pub use subscription_registry::MockSubscriptionRegistry;
pub use subscription_registry::{SubscriptionRegistry, SubscriptionRegistryError};
