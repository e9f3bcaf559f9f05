//! Inbound adapters that translate external requests into reads of domain
//! state while keeping framework details at the edge.
//!
//! Webhook payload receivers are served by other processes; this crate only
//! exposes the probes under [`http`].

pub mod http;
