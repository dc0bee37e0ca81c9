pub mod activity_repository;
pub mod audit_log_repository;
pub mod identity_repository;
pub mod invitation_repository;
#[cfg(test)]
pub mod mock_db;
pub mod postgres_activity_repository;
pub mod postgres_audit_log_repository;
pub mod postgres_identity_repository;
pub mod postgres_invitation_repository;
pub mod postgres_user_repository;
pub mod postgres_workspace_repository;
pub mod user_repository;
pub mod workspace_repository;

use thiserror::Error;

/// The single error shape every repository returns. Driver errors are
/// classified once here so callers never probe raw database errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("constraint conflict: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("store error: {0}")]
    Other(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => StoreError::Unavailable(err.to_string()),
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation()
                    || db_err.is_foreign_key_violation()
                    || db_err.is_check_violation()
                {
                    StoreError::Conflict(db_err.message().to_string())
                } else {
                    StoreError::Other(db_err.message().to_string())
                }
            }
            other => StoreError::Other(other.to_string()),
        }
    }
}
