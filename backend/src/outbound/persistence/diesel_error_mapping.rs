//! Shared Diesel error mapping for the coordination adapters.
//!
//! Both Diesel-backed ports expose the same `Connection`/`Query` split, so the
//! mapping is written once against constructor closures.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Map pool errors into a port-specific connection error.
pub fn map_pool_error<E>(error: PoolError, connection: impl FnOnce(String) -> E) -> E {
    connection(error.into_message())
}

/// Map Diesel errors into port-specific query or connection errors.
///
/// Closed connections and failed sends indicate the server went away and map
/// to `connection`; everything else maps to `query` with the driver message.
pub fn map_diesel_error<E>(
    error: DieselError,
    query: impl FnOnce(String) -> E,
    connection: impl FnOnce(String) -> E,
) -> E {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, info) => {
            connection(info.message().to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::UnableToSendCommand, info) => {
            connection(info.message().to_owned())
        }
        DieselError::DatabaseError(_, info) => query(info.message().to_owned()),
        DieselError::NotFound => query("record not found".to_owned()),
        other => query(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::CoordinationStoreError;
    use rstest::rstest;

    fn map(error: DieselError) -> CoordinationStoreError {
        map_diesel_error(
            error,
            CoordinationStoreError::query,
            CoordinationStoreError::connection,
        )
    }

    #[rstest]
    fn pool_error_maps_to_connection_error() {
        let err = map_pool_error(
            PoolError::checkout("connection refused"),
            CoordinationStoreError::connection,
        );

        assert_eq!(err, CoordinationStoreError::connection("connection refused"));
    }

    #[rstest]
    #[case(DatabaseErrorKind::ClosedConnection)]
    #[case(DatabaseErrorKind::UnableToSendCommand)]
    fn lost_server_maps_to_connection_error(#[case] kind: DatabaseErrorKind) {
        let err = map(DieselError::DatabaseError(kind, Box::new("server gone".to_owned())));

        assert_eq!(err, CoordinationStoreError::connection("server gone"));
    }

    #[rstest]
    fn unique_violation_maps_to_query_error() {
        let err = map(DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key value".to_owned()),
        ));

        assert_eq!(err, CoordinationStoreError::query("duplicate key value"));
    }

    #[rstest]
    fn not_found_maps_to_query_error() {
        assert_eq!(
            map(DieselError::NotFound),
            CoordinationStoreError::query("record not found")
        );
    }
}
