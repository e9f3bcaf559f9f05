//! Internal Diesel row structs for the coordination tables.
//!
//! These types never leave the persistence layer.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::Bool;

use super::schema::{instances, subscription_mappings};

/// Row struct for reading from the instances table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = instances)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct InstanceRow {
    pub id: String,
    pub app_name: String,
    pub is_leader: bool,
    pub heartbeat_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Leader flag returned by the heartbeat update.
#[derive(Debug, Clone, Copy, QueryableByName)]
pub(crate) struct LeaderFlagRow {
    #[diesel(sql_type = Bool)]
    pub is_leader: bool,
}

/// Row struct for reading from the subscription_mappings table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = subscription_mappings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct SubscriptionMappingRow {
    pub app_name: String,
    pub external_subscription_id: String,
    pub callback_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable struct for subscription mappings; timestamps use column defaults.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = subscription_mappings)]
pub(crate) struct NewSubscriptionMappingRow<'a> {
    pub app_name: &'a str,
    pub external_subscription_id: &'a str,
    pub callback_url: &'a str,
}
