//! Subscription records: the registry's authoritative entries and the local
//! mapping cached in the coordination store.

use chrono::{DateTime, Utc};

use super::AppName;

/// Wildcard target id sent with every subscription this service creates.
pub const WILDCARD_TARGET: &str = "*";

/// Selection criteria attached to a remote subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionFilter {
    /// Event action selector, such as `RUN`.
    pub action: Option<String>,
    /// Event type selector, such as `MACRO`.
    pub event_type: Option<String>,
    /// Target selector (camera id or `*`).
    pub target_id: Option<String>,
}

/// Subscription as held by the remote registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSubscription {
    /// Registry-assigned identifier.
    pub id: String,
    /// Webhook URL the registry delivers to.
    pub callback: String,
    /// Selection criteria.
    pub filter: SubscriptionFilter,
}

/// Creation request for a new remote subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRemoteSubscription {
    /// Webhook URL to register.
    pub callback: String,
    /// Event action selector.
    pub action: String,
    /// Event type selector.
    pub event_type: String,
    /// Target selector; always [`WILDCARD_TARGET`] for this service.
    pub target_id: String,
}

impl NewRemoteSubscription {
    /// Build a wildcard subscription for `callback`.
    ///
    /// # Examples
    /// ```
    /// use webhook_receiver::domain::NewRemoteSubscription;
    ///
    /// let request = NewRemoteSubscription::wildcard("http://host/cb", "RUN", "MACRO");
    /// assert_eq!(request.target_id, "*");
    /// ```
    pub fn wildcard(
        callback: impl Into<String>,
        action: impl Into<String>,
        event_type: impl Into<String>,
    ) -> Self {
        Self {
            callback: callback.into(),
            action: action.into(),
            event_type: event_type.into(),
            target_id: WILDCARD_TARGET.to_owned(),
        }
    }
}

/// Local cache row in `subscription_mappings`; at most one per app name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionMapping {
    /// Owning application.
    pub app_name: AppName,
    /// Identifier returned by the remote registry.
    pub external_subscription_id: String,
    /// Callback URL the mapping was registered against.
    pub callback_url: String,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Last overwrite time.
    pub updated_at: DateTime<Utc>,
}

/// Write model for [`SubscriptionMapping`]; timestamps are store-assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscriptionMapping {
    /// Owning application.
    pub app_name: AppName,
    /// Identifier returned by the remote registry.
    pub external_subscription_id: String,
    /// Callback URL the mapping is registered against.
    pub callback_url: String,
}
