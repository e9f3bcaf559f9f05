//! DTOs for the subscription registry's JSON envelope.
//!
//! Responses arrive as `{ "status": ..., "data": ... }`; the adapter decodes
//! into these transport types first and maps into domain records in one pass.

use serde::{Deserialize, Serialize};

use crate::domain::{NewRemoteSubscription, RemoteSubscription, SubscriptionFilter};

#[derive(Debug, Deserialize)]
pub(super) struct EnvelopeDto<T> {
    #[serde(default)]
    pub(super) status: String,
    pub(super) data: Option<T>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SubscriptionDto {
    #[serde(default)]
    pub(super) id: String,
    #[serde(default)]
    pub(super) callback: String,
    #[serde(default)]
    pub(super) filter: FilterDto,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct FilterDto {
    pub(super) action: Option<String>,
    #[serde(rename = "type")]
    pub(super) event_type: Option<String>,
    pub(super) id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct CreateSubscriptionDto<'a> {
    pub(super) callback: &'a str,
    pub(super) filter: CreateFilterDto<'a>,
    pub(super) id: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct CreateFilterDto<'a> {
    pub(super) action: &'a str,
    #[serde(rename = "type")]
    pub(super) event_type: &'a str,
}

impl<'a> From<&'a NewRemoteSubscription> for CreateSubscriptionDto<'a> {
    fn from(request: &'a NewRemoteSubscription) -> Self {
        Self {
            callback: &request.callback,
            filter: CreateFilterDto {
                action: &request.action,
                event_type: &request.event_type,
            },
            id: &request.target_id,
        }
    }
}

impl From<SubscriptionDto> for RemoteSubscription {
    fn from(dto: SubscriptionDto) -> Self {
        Self {
            id: dto.id,
            callback: dto.callback,
            filter: SubscriptionFilter {
                action: dto.filter.action,
                event_type: dto.filter.event_type,
                target_id: dto.filter.id,
            },
        }
    }
}
