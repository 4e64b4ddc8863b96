//! Engine error types

use thiserror::Error;

/// Errors surfaced by the subscription resolution engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to retrieve user records")]
    SnapshotFetch(#[source] sqlx::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Database(err.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
