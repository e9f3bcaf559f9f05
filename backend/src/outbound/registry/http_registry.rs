//! Reqwest-backed subscription registry adapter.
//!
//! This adapter owns transport details only: URL layout, timeout and HTTP
//! error mapping, and decoding the registry's `{status, data}` envelope.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use thiserror::Error;
use tracing::{debug, warn};

use super::dto::{CreateSubscriptionDto, EnvelopeDto, SubscriptionDto};
use crate::domain::ports::{SubscriptionRegistry, SubscriptionRegistryError};
use crate::domain::{NewRemoteSubscription, RemoteSubscription};

const SUBSCRIPTIONS_PATH: [&str; 3] = ["api", "events", "subscriptions"];

/// Errors raised while building the registry adapter.
#[derive(Debug, Error)]
pub enum RegistryClientError {
    /// The reqwest client could not be constructed.
    #[error("failed to build registry http client: {0}")]
    Client(#[from] reqwest::Error),
    /// The base URL cannot carry a path.
    #[error("registry base url `{0}` cannot be a base")]
    InvalidBaseUrl(String),
}

/// Registry adapter that lists and creates subscriptions over HTTP.
pub struct HttpSubscriptionRegistry {
    client: Client,
    endpoint: Url,
}

impl HttpSubscriptionRegistry {
    /// Build an adapter rooted at `base` using an explicit request timeout.
    ///
    /// Requests go to `{base}/api/events/subscriptions`; any path already on
    /// `base` is kept as a prefix.
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use reqwest::Url;
    /// use webhook_receiver::outbound::registry::HttpSubscriptionRegistry;
    ///
    /// let base = Url::parse("http://localhost:7080").expect("static url");
    /// let registry = HttpSubscriptionRegistry::new(base, Duration::from_secs(10))?;
    /// assert_eq!(
    ///     registry.endpoint().as_str(),
    ///     "http://localhost:7080/api/events/subscriptions"
    /// );
    /// # Ok::<(), webhook_receiver::outbound::registry::RegistryClientError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed or the
    /// base URL cannot carry a path.
    pub fn new(base: Url, timeout: Duration) -> Result<Self, RegistryClientError> {
        let endpoint = subscriptions_endpoint(base)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    /// Absolute URL of the subscriptions collection.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn subscriptions_endpoint(mut base: Url) -> Result<Url, RegistryClientError> {
    let rendered = base.to_string();
    {
        let mut segments = base
            .path_segments_mut()
            .map_err(|()| RegistryClientError::InvalidBaseUrl(rendered))?;
        segments.pop_if_empty().extend(SUBSCRIPTIONS_PATH);
    }
    Ok(base)
}

#[async_trait]
impl SubscriptionRegistry for HttpSubscriptionRegistry {
    async fn list_subscriptions(
        &self,
    ) -> Result<Vec<RemoteSubscription>, SubscriptionRegistryError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }

        parse_subscription_list(body.as_ref())
    }

    async fn create_subscription(
        &self,
        request: &NewRemoteSubscription,
    ) -> Result<String, SubscriptionRegistryError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&CreateSubscriptionDto::from(request))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }

        parse_created_id(body.as_ref())
    }
}

fn parse_subscription_list(
    body: &[u8],
) -> Result<Vec<RemoteSubscription>, SubscriptionRegistryError> {
    let decoded: EnvelopeDto<Vec<SubscriptionDto>> =
        serde_json::from_slice(body).map_err(|error| {
            SubscriptionRegistryError::decode(format!("invalid subscription list: {error}"))
        })?;
    debug!(status = %decoded.status, "registry listed subscriptions");

    // A null `data` means the registry holds nothing yet.
    Ok(decoded
        .data
        .unwrap_or_default()
        .into_iter()
        .filter(|entry| {
            let has_id = !entry.id.trim().is_empty();
            if !has_id {
                warn!(
                    callback = %entry.callback,
                    "skipping listed subscription without an id"
                );
            }
            has_id
        })
        .map(RemoteSubscription::from)
        .collect())
}

fn parse_created_id(body: &[u8]) -> Result<String, SubscriptionRegistryError> {
    let decoded: EnvelopeDto<SubscriptionDto> = serde_json::from_slice(body).map_err(|error| {
        SubscriptionRegistryError::decode(format!("invalid created subscription: {error}"))
    })?;
    debug!(status = %decoded.status, "registry created subscription");

    let created = decoded.data.ok_or_else(|| {
        SubscriptionRegistryError::missing_data("create response carried no data")
    })?;
    if created.id.trim().is_empty() {
        return Err(SubscriptionRegistryError::missing_data(
            "create response carried no subscription id",
        ));
    }
    Ok(created.id)
}

fn map_transport_error(error: reqwest::Error) -> SubscriptionRegistryError {
    if error.is_timeout() {
        SubscriptionRegistryError::timeout(error.to_string())
    } else {
        SubscriptionRegistryError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> SubscriptionRegistryError {
    let preview = body_preview(body);
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            SubscriptionRegistryError::timeout(format!("status {}: {preview}", status.as_u16()))
        }
        _ => SubscriptionRegistryError::status(status.as_u16(), preview),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
