//! Outbound adapters implementing domain ports.
//!
//! - `persistence`: PostgreSQL coordination store, mapping repository and
//!   schema provisioning.
//! - `registry`: HTTP client for the remote subscription registry.

pub mod persistence;
pub mod registry;
