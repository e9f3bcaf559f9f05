//! Driven port for the remote subscription registry.
//!
//! The registry is authoritative for which subscriptions exist; the local
//! mapping is only a cache of the id it handed back.

use async_trait::async_trait;

use crate::domain::{NewRemoteSubscription, RemoteSubscription};

use super::define_port_error;

define_port_error! {
    /// Errors surfaced while calling the subscription registry.
    pub enum SubscriptionRegistryError {
        /// Network transport failed before receiving a response.
        Transport { message: String } =>
            "subscription registry transport failed: {message}",
        /// Registry call exceeded its timeout.
        Timeout { message: String } =>
            "subscription registry timeout: {message}",
        /// Registry answered with a non-success status.
        Status { status: u16, message: String } =>
            "subscription registry returned status {status}: {message}",
        /// Registry response could not be decoded.
        Decode { message: String } =>
            "subscription registry response decode failed: {message}",
        /// Registry response decoded but lacked required data.
        MissingData { message: String } =>
            "subscription registry response incomplete: {message}",
    }
}

impl SubscriptionRegistryError {
    /// Return whether retrying this error is expected to help.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Decode { .. } | Self::MissingData { .. } => false,
        }
    }
}

/// Port for listing and creating remote subscriptions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionRegistry: Send + Sync {
    /// List every subscription the registry currently holds.
    async fn list_subscriptions(&self)
    -> Result<Vec<RemoteSubscription>, SubscriptionRegistryError>;

    /// Create a subscription and return the registry-assigned id.
    async fn create_subscription(
        &self,
        request: &NewRemoteSubscription,
    ) -> Result<String, SubscriptionRegistryError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::transport(SubscriptionRegistryError::transport("refused"), true)]
    #[case::timeout(SubscriptionRegistryError::timeout("10s"), true)]
    #[case::server(SubscriptionRegistryError::status(503_u16, "busy"), true)]
    #[case::throttled(SubscriptionRegistryError::status(429_u16, "slow down"), true)]
    #[case::client(SubscriptionRegistryError::status(400_u16, "bad"), false)]
    #[case::decode(SubscriptionRegistryError::decode("eof"), false)]
    #[case::missing(SubscriptionRegistryError::missing_data("no id"), false)]
    fn retryability_follows_error_class(
        #[case] error: SubscriptionRegistryError,
        #[case] expected: bool,
    ) {
        assert_eq!(error.is_retryable(), expected);
    }
}
