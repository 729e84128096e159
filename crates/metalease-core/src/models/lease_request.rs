//! Lease request domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MetaleaseError, MetaleaseResult};

/// Status of a lease request.
///
/// A request starts as `Requested`; the surrounding service marks it
/// `Granted` once admission has produced its grants, `Rejected` when no
/// resource could satisfy it, or `Cancelled` when withdrawn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LeaseRequestStatus {
    Requested,
    Granted,
    Rejected,
    Cancelled,
}

/// A tenant's request to lease resources over a time window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseRequest {
    pub id: Uuid,
    /// Requesting project.
    pub project_id: String,
    /// Desired window start (inclusive).
    pub start_time: DateTime<Utc>,
    /// Desired window end (exclusive).
    pub end_time: DateTime<Utc>,
    pub status: LeaseRequestStatus,
    /// Arbitrary key-value properties (e.g. node constraints).
    pub properties: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new lease request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLeaseRequest {
    pub project_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub properties: Option<serde_json::Value>,
}

impl CreateLeaseRequest {
    pub fn validate(&self) -> MetaleaseResult<()> {
        if self.start_time >= self.end_time {
            return Err(MetaleaseError::Validation {
                message: format!(
                    "lease request start_time {} must precede end_time {}",
                    self.start_time, self.end_time
                ),
            });
        }
        if self.project_id.is_empty() {
            return Err(MetaleaseError::Validation {
                message: "lease request project_id must not be empty".into(),
            });
        }
        Ok(())
    }
}

/// Fields that can be updated on an existing lease request.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateLeaseRequest {
    pub status: Option<LeaseRequestStatus>,
    pub properties: Option<serde_json::Value>,
}

impl UpdateLeaseRequest {
    /// Compute the changed-field set against a last-loaded snapshot.
    pub fn diff(snapshot: &LeaseRequest, edited: &LeaseRequest) -> UpdateLeaseRequest {
        UpdateLeaseRequest {
            status: (snapshot.status != edited.status).then_some(edited.status),
            properties: (snapshot.properties != edited.properties)
                .then(|| edited.properties.clone()),
        }
    }
}
