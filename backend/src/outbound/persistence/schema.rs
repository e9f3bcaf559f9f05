//! Diesel table definitions for the coordination schema.
//!
//! These definitions must match the DDL in `postgres_schema_provisioner.rs`.

diesel::table! {
    /// Registered receiver instances and their leadership state.
    instances (id) {
        /// Instance id (UUID text), generated once per process.
        id -> Varchar,
        /// Leadership partition.
        app_name -> Varchar,
        /// Set for at most one live row per app name.
        is_leader -> Bool,
        /// Last liveness signal.
        heartbeat_at -> Timestamptz,
        /// Row creation time.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Local cache of the registry subscription id, one row per app name.
    subscription_mappings (id) {
        id -> Int4,
        app_name -> Varchar,
        external_subscription_id -> Varchar,
        callback_url -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(instances, subscription_mappings);
