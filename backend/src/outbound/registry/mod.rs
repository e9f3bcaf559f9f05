//! Remote subscription registry adapters.
//!
//! This module provides a thin HTTP implementation of the
//! `SubscriptionRegistry` port.

mod dto;
mod http_registry;

pub use http_registry::{HttpSubscriptionRegistry, RegistryClientError};
