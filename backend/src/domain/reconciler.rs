//! Converges the local subscription mapping onto the remote registry.
//!
//! The registry is authoritative. The reconciler never edits or deletes
//! remote subscriptions; it only creates one when nothing registered for this
//! instance's callback exists, and otherwise rewrites the local mapping to
//! whatever id the registry reports.

use std::sync::Arc;

use tracing::{error, info, warn};

use super::ports::{
    SubscriptionMappingRepository, SubscriptionMappingRepositoryError, SubscriptionRegistry,
    SubscriptionRegistryError,
};
use super::{AppName, NewRemoteSubscription, NewSubscriptionMapping};

/// What this instance subscribes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionTarget {
    /// Owner of the local mapping row.
    pub app_name: AppName,
    /// Public webhook URL of this service.
    pub callback_url: String,
    /// Event action selector for new subscriptions.
    pub action: String,
    /// Event type selector for new subscriptions.
    pub event_type: String,
}

/// Why a new remote subscription was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationReason {
    /// The registry held no subscriptions at all.
    RegistryEmpty,
    /// The registry held subscriptions, none for this callback.
    CallbackUnmatched,
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A remote subscription was created and recorded locally.
    Created {
        /// Registry-assigned id.
        subscription_id: String,
        /// Branch that led to creation.
        reason: CreationReason,
    },
    /// Local mapping already matched the registry.
    Consistent {
        /// Shared id.
        subscription_id: String,
    },
    /// No local mapping existed; the registry's id was recorded.
    Adopted {
        /// Registry id now recorded locally.
        subscription_id: String,
    },
    /// The local mapping pointed elsewhere and was replaced.
    Replaced {
        /// Registry id now recorded locally.
        subscription_id: String,
        /// Id the stale mapping held.
        stale_id: String,
    },
}

impl ReconcileOutcome {
    /// Subscription id the local mapping holds after reconciliation.
    pub fn subscription_id(&self) -> &str {
        match self {
            Self::Created {
                subscription_id, ..
            }
            | Self::Consistent { subscription_id }
            | Self::Adopted { subscription_id }
            | Self::Replaced {
                subscription_id, ..
            } => subscription_id,
        }
    }
}

/// Failures that abort a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// Remote registry call failed.
    #[error(transparent)]
    Registry(#[from] SubscriptionRegistryError),
    /// Local mapping read or write failed.
    #[error(transparent)]
    Mapping(#[from] SubscriptionMappingRepositoryError),
}

impl ReconcileError {
    /// Return whether the next acquisition can be expected to succeed.
    ///
    /// Local store failures count as transient; registry failures defer to
    /// [`SubscriptionRegistryError::is_retryable`].
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Registry(err) => err.is_retryable(),
            Self::Mapping(_) => true,
        }
    }
}

/// Reconciles one app's subscription mapping against the registry.
pub struct SubscriptionReconciler {
    registry: Arc<dyn SubscriptionRegistry>,
    mappings: Arc<dyn SubscriptionMappingRepository>,
    target: SubscriptionTarget,
}

impl SubscriptionReconciler {
    /// Build a reconciler for `target`.
    pub fn new(
        registry: Arc<dyn SubscriptionRegistry>,
        mappings: Arc<dyn SubscriptionMappingRepository>,
        target: SubscriptionTarget,
    ) -> Self {
        Self {
            registry,
            mappings,
            target,
        }
    }

    /// Reconcile and return the resulting subscription id.
    ///
    /// Every failure is logged and collapses to `None`; the next attempt
    /// happens on the next leadership acquisition.
    pub async fn get_or_create_subscription(&self) -> Option<String> {
        match self.reconcile().await {
            Ok(outcome) => Some(outcome.subscription_id().to_owned()),
            Err(err) if err.is_transient() => {
                warn!(
                    app_name = %self.target.app_name,
                    callback_url = %self.target.callback_url,
                    error = %err,
                    "subscription reconciliation failed; will retry on next acquisition"
                );
                None
            }
            Err(err) => {
                error!(
                    app_name = %self.target.app_name,
                    callback_url = %self.target.callback_url,
                    error = %err,
                    "subscription reconciliation rejected by registry"
                );
                None
            }
        }
    }

    /// Run one reconciliation pass, reporting which branch was taken.
    pub async fn reconcile(&self) -> Result<ReconcileOutcome, ReconcileError> {
        let remote = self.registry.list_subscriptions().await?;
        if remote.is_empty() {
            return self.create(CreationReason::RegistryEmpty).await;
        }

        let Some(remote_match) = remote
            .iter()
            .find(|subscription| subscription.callback == self.target.callback_url)
        else {
            warn!(
                app_name = %self.target.app_name,
                callback_url = %self.target.callback_url,
                remote_count = remote.len(),
                "no remote subscription matches this callback"
            );
            return self.create(CreationReason::CallbackUnmatched).await;
        };

        let local = self.mappings.find_by_app(&self.target.app_name).await?;
        let remote_id = remote_match.id.clone();
        let outcome = match local {
            Some(mapping) if mapping.external_subscription_id == remote_id => {
                ReconcileOutcome::Consistent {
                    subscription_id: remote_id,
                }
            }
            Some(mapping) => {
                self.mappings.delete_by_app(&self.target.app_name).await?;
                self.record(&remote_id).await?;
                ReconcileOutcome::Replaced {
                    subscription_id: remote_id,
                    stale_id: mapping.external_subscription_id,
                }
            }
            None => {
                self.record(&remote_id).await?;
                ReconcileOutcome::Adopted {
                    subscription_id: remote_id,
                }
            }
        };
        info!(
            app_name = %self.target.app_name,
            subscription_id = outcome.subscription_id(),
            outcome = ?outcome,
            "subscription reconciled"
        );
        Ok(outcome)
    }

    async fn create(&self, reason: CreationReason) -> Result<ReconcileOutcome, ReconcileError> {
        let request = NewRemoteSubscription::wildcard(
            self.target.callback_url.clone(),
            self.target.action.clone(),
            self.target.event_type.clone(),
        );
        let subscription_id = self.registry.create_subscription(&request).await?;
        self.record(&subscription_id).await?;
        info!(
            app_name = %self.target.app_name,
            subscription_id = %subscription_id,
            ?reason,
            "created remote subscription"
        );
        Ok(ReconcileOutcome::Created {
            subscription_id,
            reason,
        })
    }

    async fn record(&self, subscription_id: &str) -> Result<(), ReconcileError> {
        self.mappings
            .upsert(&NewSubscriptionMapping {
                app_name: self.target.app_name.clone(),
                external_subscription_id: subscription_id.to_owned(),
                callback_url: self.target.callback_url.clone(),
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;
