//! Error types for Tenantry

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TenantryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for TenantryError {
    fn from(err: sqlx::Error) -> Self {
        TenantryError::Database(err.to_string())
    }
}
