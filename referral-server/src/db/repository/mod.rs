//! Repository Module
//!
//! Plain async functions over `sqlx` (SQLite). Functions that issue a single
//! statement take any `SqliteExecutor` so they work on the pool and inside a
//! transaction; multi-statement helpers take `&mut Transaction`.

pub mod chain;
pub mod click;
pub mod commission;
pub mod event;
pub mod fraud;
pub mod link;
pub mod payout;
pub mod points;
pub mod profile;
pub mod referred_user;
pub mod stats;
pub mod user;

use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepoError::NotFound(err.to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                RepoError::Duplicate(db_err.message().to_string())
            }
            sqlx::Error::Database(db_err) if db_err.is_check_violation() => {
                RepoError::Validation(db_err.message().to_string())
            }
            _ => RepoError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(err: serde_json::Error) -> Self {
        RepoError::Validation(format!("JSON encoding failed: {err}"))
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Transaction alias used by multi-statement helpers
pub type Tx<'a> = sqlx::Transaction<'a, sqlx::Sqlite>;
