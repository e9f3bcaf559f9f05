//! Instance identity and liveness records shared through the coordination store.
//!
//! Every receiver process owns exactly one [`InstanceId`] for its lifetime and
//! competes for leadership within one [`AppName`] partition.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Opaque identifier generated once per process lifetime.
///
/// # Examples
/// ```
/// use webhook_receiver::domain::InstanceId;
///
/// let id = InstanceId::generate();
/// let parsed: InstanceId = id.to_string().parse().expect("round trip");
/// assert_eq!(parsed, id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(Uuid);

impl InstanceId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Borrow the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for InstanceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Validation errors for [`AppName`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppNameValidationError {
    /// The name was empty once trimmed.
    #[error("app name must not be empty")]
    Empty,
    /// The name exceeds the column width of the coordination store.
    #[error("app name must be at most {max} characters, got {actual}")]
    TooLong {
        /// Maximum accepted length.
        max: usize,
        /// Observed length.
        actual: usize,
    },
}

/// Logical service name; leadership is partitioned by this value.
///
/// ## Invariants
/// - non-empty once trimmed;
/// - at most [`AppName::MAX_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppName(String);

impl AppName {
    /// Column width of `instances.app_name`.
    pub const MAX_LEN: usize = 100;

    /// Validate and wrap an application name.
    ///
    /// # Examples
    /// ```
    /// use webhook_receiver::domain::AppName;
    ///
    /// assert!(AppName::new("Svc").is_ok());
    /// assert!(AppName::new("   ").is_err());
    /// ```
    pub fn new(value: impl Into<String>) -> Result<Self, AppNameValidationError> {
        let value = value.into().trim().to_owned();
        if value.is_empty() {
            return Err(AppNameValidationError::Empty);
        }
        let actual = value.chars().count();
        if actual > Self::MAX_LEN {
            return Err(AppNameValidationError::TooLong {
                max: Self::MAX_LEN,
                actual,
            });
        }
        Ok(Self(value))
    }

    /// Borrow the name as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for AppName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the `instances` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRecord {
    /// Primary key.
    pub id: InstanceId,
    /// Leadership partition.
    pub app_name: AppName,
    /// Whether this row was marked leader by its last successful claim.
    pub is_leader: bool,
    /// Last liveness signal.
    pub heartbeat_at: DateTime<Utc>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
}

/// Result of one atomic leadership claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// No live leader existed, so this instance was promoted.
    Acquired,
    /// This instance already held a live leadership lease.
    AlreadyLeader,
    /// Another instance holds a live lease.
    LeaderPresent,
}

impl ClaimOutcome {
    /// Return whether the caller leads after the claim.
    pub fn is_leader(self) -> bool {
        matches!(self, Self::Acquired | Self::AlreadyLeader)
    }
}

/// Row state observed by a heartbeat refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatStatus {
    /// Heartbeat advanced and the row is still marked leader.
    Leader,
    /// Heartbeat advanced but the row has been demoted.
    Follower,
    /// The row no longer exists (purged or deleted).
    Missing,
}

/// Process-wide leadership flag shared by the elector, the heartbeat loop,
/// and the HTTP probes.
///
/// # Examples
/// ```
/// use webhook_receiver::domain::LeadershipFlag;
///
/// let flag = LeadershipFlag::default();
/// let observer = flag.clone();
/// flag.set(true);
/// assert!(observer.is_leader());
/// ```
#[derive(Debug, Clone, Default)]
pub struct LeadershipFlag(Arc<AtomicBool>);

impl LeadershipFlag {
    /// Publish the current leadership state.
    pub fn set(&self, is_leader: bool) {
        self.0.store(is_leader, Ordering::Release);
    }

    /// Read the last published leadership state.
    pub fn is_leader(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
