//! Offer domain model.
//!
//! An offer advertises one resource (a bare-metal node) for leasing over
//! a bounded time window. Availability within the window is computed by
//! the engine crate from the committed leases against the same resource.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MetaleaseError, MetaleaseResult};
use crate::interval::Interval;

/// Status of an offer in its lifecycle.
///
/// Transitions are one-directional: an offer leaves `Available` for
/// `Cancelled` (withdrawn by its owner) or `Expired` (window elapsed)
/// and never comes back. Field edits are only permitted while
/// `Available`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OfferStatus {
    Available,
    Cancelled,
    Expired,
}

impl OfferStatus {
    pub fn can_transition_to(&self, next: OfferStatus) -> bool {
        match self {
            OfferStatus::Available => true,
            OfferStatus::Cancelled | OfferStatus::Expired => *self == next,
        }
    }
}

/// An advertised availability window for a single resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: Uuid,
    /// Project offering the resource.
    pub project_id: String,
    /// Resource class (e.g. `baremetal_node`).
    pub resource_type: String,
    /// Identifier of the offered resource in its inventory system.
    pub resource_uuid: String,
    /// Window start (inclusive).
    pub start_time: DateTime<Utc>,
    /// Window end (exclusive), strictly after `start_time`.
    pub end_time: DateTime<Utc>,
    pub status: OfferStatus,
    /// Arbitrary key-value properties (e.g. pricing hints).
    pub properties: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Offer {
    /// The offered window as a half-open interval.
    pub fn window(&self) -> Interval {
        Interval {
            start: self.start_time,
            end: self.end_time,
        }
    }
}

/// Fields required to create a new offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOffer {
    pub project_id: String,
    pub resource_type: String,
    pub resource_uuid: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub properties: Option<serde_json::Value>,
}

impl CreateOffer {
    /// Reject malformed input before any storage I/O.
    pub fn validate(&self) -> MetaleaseResult<()> {
        if self.start_time >= self.end_time {
            return Err(MetaleaseError::Validation {
                message: format!(
                    "offer start_time {} must precede end_time {}",
                    self.start_time, self.end_time
                ),
            });
        }
        if self.project_id.is_empty() {
            return Err(MetaleaseError::Validation {
                message: "offer project_id must not be empty".into(),
            });
        }
        if self.resource_type.is_empty() || self.resource_uuid.is_empty() {
            return Err(MetaleaseError::Validation {
                message: "offer resource identifiers must not be empty".into(),
            });
        }
        Ok(())
    }
}

/// Fields that can be updated on an existing offer.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateOffer {
    pub status: Option<OfferStatus>,
    pub properties: Option<serde_json::Value>,
}

impl UpdateOffer {
    /// Compute the changed-field set by comparing an edited offer against
    /// its last-loaded snapshot.
    pub fn diff(snapshot: &Offer, edited: &Offer) -> UpdateOffer {
        UpdateOffer {
            status: (snapshot.status != edited.status).then_some(edited.status),
            properties: (snapshot.properties != edited.properties)
                .then(|| edited.properties.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.properties.is_none()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn test_offer() -> Offer {
        let start = Utc.with_ymd_and_hms(2016, 7, 16, 19, 20, 30).unwrap();
        Offer {
            id: Uuid::new_v4(),
            project_id: "project-a".into(),
            resource_type: "baremetal_node".into(),
            resource_uuid: "node-1718".into(),
            start_time: start,
            end_time: start + chrono::Duration::days(100),
            status: OfferStatus::Available,
            properties: serde_json::json!({ "floor_price": 3 }),
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn status_transitions_are_one_directional() {
        assert!(OfferStatus::Available.can_transition_to(OfferStatus::Cancelled));
        assert!(OfferStatus::Available.can_transition_to(OfferStatus::Expired));
        assert!(!OfferStatus::Cancelled.can_transition_to(OfferStatus::Available));
        assert!(!OfferStatus::Expired.can_transition_to(OfferStatus::Cancelled));
        assert!(OfferStatus::Cancelled.can_transition_to(OfferStatus::Cancelled));
    }

    #[test]
    fn create_rejects_inverted_window() {
        let o = test_offer();
        let input = CreateOffer {
            project_id: o.project_id.clone(),
            resource_type: o.resource_type.clone(),
            resource_uuid: o.resource_uuid.clone(),
            start_time: o.end_time,
            end_time: o.start_time,
            properties: None,
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn create_rejects_empty_resource_identifiers() {
        let o = test_offer();
        let input = CreateOffer {
            project_id: o.project_id.clone(),
            resource_type: String::new(),
            resource_uuid: o.resource_uuid.clone(),
            start_time: o.start_time,
            end_time: o.end_time,
            properties: None,
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn diff_captures_only_changed_fields() {
        let snapshot = test_offer();
        let mut edited = snapshot.clone();
        edited.status = OfferStatus::Cancelled;

        let update = UpdateOffer::diff(&snapshot, &edited);
        assert_eq!(update.status, Some(OfferStatus::Cancelled));
        assert!(update.properties.is_none());

        let unchanged = UpdateOffer::diff(&snapshot, &snapshot.clone());
        assert!(unchanged.is_empty());
    }
}
