//! Scripted remote subscription registry.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::ports::{SubscriptionRegistry, SubscriptionRegistryError};
use crate::domain::{NewRemoteSubscription, RemoteSubscription, SubscriptionFilter};

#[derive(Default)]
struct RegistryState {
    subscriptions: Vec<RemoteSubscription>,
    create_calls: usize,
    list_failure: Option<SubscriptionRegistryError>,
    create_failure: Option<SubscriptionRegistryError>,
}

/// Registry double that stores created subscriptions and counts calls.
///
/// Created ids are `sub-1`, `sub-2`, and so on.
#[derive(Default)]
pub struct ScriptedSubscriptionRegistry(Mutex<RegistryState>);

impl ScriptedSubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `subscriptions` already registered.
    pub fn with_subscriptions(subscriptions: Vec<RemoteSubscription>) -> Self {
        let registry = Self::default();
        registry.lock_state().subscriptions = subscriptions;
        registry
    }

    /// Make every list call fail with `error` until cleared.
    pub fn fail_list_with(&self, error: Option<SubscriptionRegistryError>) {
        self.lock_state().list_failure = error;
    }

    /// Make every create call fail with `error` until cleared.
    pub fn fail_create_with(&self, error: Option<SubscriptionRegistryError>) {
        self.lock_state().create_failure = error;
    }

    /// Number of create calls received, failed ones included.
    pub fn create_calls(&self) -> usize {
        self.lock_state().create_calls
    }

    pub fn subscriptions(&self) -> Vec<RemoteSubscription> {
        self.lock_state().subscriptions.clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, RegistryState> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("registry mutex"),
        }
    }
}

#[async_trait]
impl SubscriptionRegistry for ScriptedSubscriptionRegistry {
    async fn list_subscriptions(
        &self,
    ) -> Result<Vec<RemoteSubscription>, SubscriptionRegistryError> {
        let state = self.lock_state();
        if let Some(error) = &state.list_failure {
            return Err(error.clone());
        }
        Ok(state.subscriptions.clone())
    }

    async fn create_subscription(
        &self,
        request: &NewRemoteSubscription,
    ) -> Result<String, SubscriptionRegistryError> {
        let mut state = self.lock_state();
        state.create_calls += 1;
        if let Some(error) = &state.create_failure {
            return Err(error.clone());
        }
        let id = format!("sub-{}", state.subscriptions.len() + 1);
        state.subscriptions.push(RemoteSubscription {
            id: id.clone(),
            callback: request.callback.clone(),
            filter: SubscriptionFilter {
                action: Some(request.action.clone()),
                event_type: Some(request.event_type.clone()),
                target_id: Some(request.target_id.clone()),
            },
        });
        Ok(id)
    }
}
