//! Database-specific error types and conversions.

use metalease_core::error::MetaleaseError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Lease window conflict on {resource_uuid}")]
    LeaseConflict { resource_uuid: String },
}

impl From<DbError> for MetaleaseError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => MetaleaseError::NotFound { entity, id },
            DbError::LeaseConflict { resource_uuid } => MetaleaseError::Conflict {
                reason: format!("committed lease overlaps the requested window on {resource_uuid}"),
            },
            other => MetaleaseError::Storage(other.to_string()),
        }
    }
}
