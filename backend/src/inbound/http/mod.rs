//! HTTP inbound adapter exposing operational probes.

pub mod health;
