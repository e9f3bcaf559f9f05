//! Coordination domain: value types, ports and services.
//!
//! Purpose: keep election, heartbeat and reconciliation logic independent of
//! PostgreSQL and HTTP so each rule can be exercised against in-memory ports.
//!
//! Public surface:
//! - [`LeaderElector`] claims leadership and refreshes its lease.
//! - [`HeartbeatLoop`] keeps the lease alive while leading.
//! - [`SubscriptionReconciler`] converges the local mapping on the registry.
//! - [`SchemaInitializer`] provisions the store at startup.
//! - [`RegistrationOrchestrator`] sequences all of the above.

pub mod heartbeat;
pub mod instance;
pub mod leader_election;
pub mod orchestrator;
pub mod ports;
pub mod reconciler;
pub mod runtime;
pub mod schema_initializer;
pub mod subscription;

pub use self::heartbeat::{HeartbeatExit, HeartbeatLoop, HeartbeatSchedule};
pub use self::instance::{
    AppName, AppNameValidationError, ClaimOutcome, HeartbeatStatus, InstanceId, InstanceRecord,
    LeadershipFlag,
};
pub use self::leader_election::{DEFAULT_LEASE_WINDOW, LeaderElector};
pub use self::orchestrator::{OrchestratorError, OrchestratorSchedule, RegistrationOrchestrator};
pub use self::reconciler::{
    CreationReason, ReconcileError, ReconcileOutcome, SubscriptionReconciler, SubscriptionTarget,
};
pub use self::runtime::{CoordinationSleeper, TokioSleeper, sleep_or_shutdown};
pub use self::schema_initializer::{
    DEFAULT_STALE_AFTER, SchemaInitError, SchemaInitReport, SchemaInitializer,
};
pub use self::subscription::{
    NewRemoteSubscription, NewSubscriptionMapping, RemoteSubscription, SubscriptionFilter,
    SubscriptionMapping, WILDCARD_TARGET,
};
