//! Coordination layer for a fleet of webhook receivers.
//!
//! Instances elect a single leader through PostgreSQL, keep its lease alive
//! with heartbeats, and let the leader reconcile the fleet's registration
//! with the remote subscription registry.

pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod settings;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
