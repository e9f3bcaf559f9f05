//! Test utilities for the webhook receiver crate.
//!
//! This module provides shared doubles for both unit tests (in `src/`) and
//! integration tests (in `tests/`). It is only compiled for tests or with the
//! `test-support` feature.

pub mod coordination;
pub mod registry;
pub mod time;

pub use coordination::{InMemoryCoordinationStore, InMemorySubscriptionMappings};
pub use registry::ScriptedSubscriptionRegistry;
pub use time::{MutableClock, RecordingSleeper};
