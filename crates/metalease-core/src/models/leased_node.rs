//! Leased node domain model.
//!
//! A leased node is the committed outcome of admission: one resource
//! bound to one project for a half-open window. The rows of this table
//! are the conflict intervals every availability computation reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::interval::Interval;

/// A committed lease binding a resource to a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeasedNode {
    pub id: Uuid,
    /// Originating lease request, when the grant came from one. A weak
    /// reference: the grant survives destruction of the request.
    pub request_id: Option<Uuid>,
    /// Project holding the lease.
    pub project_id: String,
    pub resource_type: String,
    pub resource_uuid: String,
    /// Lease start (inclusive).
    pub start_time: DateTime<Utc>,
    /// Lease end (exclusive).
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LeasedNode {
    /// The committed window as a half-open interval.
    pub fn window(&self) -> Interval {
        Interval {
            start: self.start_time,
            end: self.end_time,
        }
    }
}

/// Fields required to commit a new lease.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLeasedNode {
    pub request_id: Option<Uuid>,
    pub project_id: String,
    pub resource_type: String,
    pub resource_uuid: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Fields that can be updated on an existing lease.
///
/// Only shortening edits are accepted: extending a committed lease must
/// go through admission so the overlap invariant is re-checked.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateLeasedNode {
    /// New end time; must not extend past the committed end.
    pub end_time: Option<DateTime<Utc>>,
    /// Relink or unlink the originating request.
    pub request_id: Option<Option<Uuid>>,
}

impl UpdateLeasedNode {
    /// Compute the changed-field set against a last-loaded snapshot.
    pub fn diff(snapshot: &LeasedNode, edited: &LeasedNode) -> UpdateLeasedNode {
        UpdateLeasedNode {
            end_time: (snapshot.end_time != edited.end_time).then_some(edited.end_time),
            request_id: (snapshot.request_id != edited.request_id)
                .then_some(edited.request_id),
        }
    }
}
