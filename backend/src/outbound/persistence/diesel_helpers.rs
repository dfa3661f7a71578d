//! Shared helpers for Diesel repository implementations.
//!
//! Repositories classify Diesel failures into [`DbFailure`] once and then map
//! that into their own port error, so constraint handling lives in one place.
//! Every store call runs under [`QUERY_TIMEOUT`] through [`bounded`].

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::pool::PoolError;

/// Upper bound on a single repository operation, checkout included.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Storage failure stripped of Diesel types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbFailure {
    /// The pool or server connection is unavailable.
    Connection(String),
    /// Any other failure while executing a statement.
    Query(String),
    UniqueViolation { constraint: Option<String> },
    ForeignKeyViolation { constraint: Option<String> },
    CheckViolation { constraint: Option<String> },
}

impl DbFailure {
    /// Whether this is a unique violation on `constraint`.
    pub fn is_unique(&self, constraint: &str) -> bool {
        matches!(self, Self::UniqueViolation { constraint: Some(name) } if name == constraint)
    }
}

impl From<PoolError> for DbFailure {
    fn from(error: PoolError) -> Self {
        Self::Connection(error.into_message())
    }
}

impl From<diesel::result::Error> for DbFailure {
    fn from(error: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error as DieselError};

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
            DieselError::NotFound => Self::Query("record not found".to_owned()),
            DieselError::QueryBuilderError(_) => Self::Query("database query error".to_owned()),
            DieselError::DatabaseError(kind, info) => {
                let constraint = info.constraint_name().map(str::to_owned);
                match kind {
                    DatabaseErrorKind::UniqueViolation => Self::UniqueViolation { constraint },
                    DatabaseErrorKind::ForeignKeyViolation => {
                        Self::ForeignKeyViolation { constraint }
                    }
                    DatabaseErrorKind::CheckViolation => Self::CheckViolation { constraint },
                    DatabaseErrorKind::ClosedConnection => {
                        Self::Connection("database connection error".to_owned())
                    }
                    _ => Self::Query("database error".to_owned()),
                }
            }
            _ => Self::Query("database error".to_owned()),
        }
    }
}

/// Run `operation` under [`QUERY_TIMEOUT`].
///
/// An elapsed deadline becomes [`DbFailure::Connection`] converted into the
/// caller's error type.
pub async fn bounded<T, E, F>(operation: &'static str, future: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<DbFailure>,
{
    bounded_by(QUERY_TIMEOUT, operation, future).await
}

async fn bounded_by<T, E, F>(limit: Duration, operation: &'static str, future: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<DbFailure>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, timeout_ms = limit.as_millis(), "database operation timed out");
            Err(DbFailure::Connection(format!("{operation} timed out")).into())
        }
    }
}

/// Escape `LIKE` wildcards so user search text matches literally.
pub fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for ch in search.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn pool_errors_are_connection_failures() {
        let failure = DbFailure::from(PoolError::checkout("refused"));
        assert_eq!(failure, DbFailure::Connection("refused".to_owned()));
    }

    #[rstest]
    fn not_found_is_a_query_failure() {
        let failure = DbFailure::from(diesel::result::Error::NotFound);
        assert!(matches!(failure, DbFailure::Query(message) if message == "record not found"));
    }

    #[rstest]
    fn unique_check_matches_constraint_name() {
        let failure = DbFailure::UniqueViolation {
            constraint: Some("users_email_key".to_owned()),
        };
        assert!(failure.is_unique("users_email_key"));
        assert!(!failure.is_unique("users_username_key"));
    }

    #[rstest]
    #[case("ada", "%ada%")]
    #[case("50%", "%50\\%%")]
    #[case("snake_case", "%snake\\_case%")]
    fn like_pattern_escapes_wildcards(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(like_pattern(input), expected);
    }

    #[tokio::test]
    async fn bounded_reports_timeouts_as_connection_failures() {
        let result: Result<(), DbFailure> = bounded_by(Duration::from_millis(5), "ping", async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(())
        })
        .await;
        assert_eq!(result, Err(DbFailure::Connection("ping timed out".to_owned())));
    }

    #[tokio::test]
    async fn bounded_passes_results_through() {
        let result = bounded("ping", async { Ok::<_, DbFailure>(7) }).await;
        assert_eq!(result, Ok(7));
    }
}
