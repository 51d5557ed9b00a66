use axum::http::StatusCode;
use thiserror::Error;

/// SQLite primary result codes that mean "the data file cannot be reached
/// right now" rather than "the statement is wrong".
const SQLITE_BUSY: &str = "5";
const SQLITE_LOCKED: &str = "6";
const SQLITE_CANTOPEN: &str = "14";

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("{0}")]
    Validation(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] sqlx::Error),

    #[error("storage error: {0}")]
    Storage(#[source] sqlx::Error),

    #[error("invalid SQL identifier or literal '{0}'")]
    InvalidIdentifier(String),

    #[error("export failed: {0}")]
    Export(#[from] csv::Error),
}

impl InventoryError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidIdentifier(_) => StatusCode::BAD_REQUEST,
            Self::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Storage(_) | Self::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for InventoryError {
    fn from(err: sqlx::Error) -> Self {
        let unavailable = match &err {
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => true,
            sqlx::Error::Database(db_err) => {
                // Extended codes (e.g. 261 SQLITE_BUSY_RECOVERY) share the low byte.
                db_err
                    .code()
                    .and_then(|code| code.parse::<i32>().ok())
                    .map(|code| (code & 0xff).to_string())
                    .map_or(false, |primary| {
                        primary == SQLITE_BUSY
                            || primary == SQLITE_LOCKED
                            || primary == SQLITE_CANTOPEN
                    })
            }
            _ => false,
        };

        if unavailable {
            Self::StorageUnavailable(err)
        } else {
            Self::Storage(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_are_reported_as_unavailable() {
        let err = InventoryError::from(sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "share not mounted",
        )));
        assert!(err.is_unavailable());
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn pool_timeout_is_unavailable() {
        assert!(InventoryError::from(sqlx::Error::PoolTimedOut).is_unavailable());
    }

    #[test]
    fn row_not_found_is_a_plain_storage_error() {
        let err = InventoryError::from(sqlx::Error::RowNotFound);
        assert!(!err.is_unavailable());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn validation_message_is_shown_verbatim() {
        let err = InventoryError::validation("Item ID is required");
        assert_eq!(err.to_string(), "Item ID is required");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
