//! Error types for the Metalease system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetaleaseError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Lease conflict: {reason}")]
    Conflict { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type MetaleaseResult<T> = Result<T, MetaleaseError>;
