//! Admission error types.

use metalease_core::error::MetaleaseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("no offer found for resource {resource_uuid}")]
    OfferNotFound { resource_uuid: String },

    #[error("no free window on {resource_uuid} contains the requested window")]
    WindowUnavailable { resource_uuid: String },

    #[error("invalid admission request: {0}")]
    InvalidRequest(String),
}

impl From<AdmissionError> for MetaleaseError {
    fn from(err: AdmissionError) -> Self {
        match err {
            AdmissionError::OfferNotFound { resource_uuid } => MetaleaseError::NotFound {
                entity: "offer".into(),
                id: resource_uuid,
            },
            AdmissionError::WindowUnavailable { .. } => MetaleaseError::Conflict {
                reason: err.to_string(),
            },
            AdmissionError::InvalidRequest(msg) => MetaleaseError::Validation { message: msg },
        }
    }
}
