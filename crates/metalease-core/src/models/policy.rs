//! Policy domain models.
//!
//! A policy bundles project-scoped allocation rules; applying it to a
//! node creates an [`AppliedPolicy`] association keyed by the composite
//! `(node_uuid, policy_id)` pair. Policy *evaluation* happens outside
//! this system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Project-scoped allocation rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub id: Uuid,
    /// Project owning the policy.
    pub project_id: String,
    pub name: String,
    /// Rule parameters, interpreted by the policy evaluation layer.
    pub properties: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePolicy {
    pub project_id: String,
    pub name: String,
    pub properties: Option<serde_json::Value>,
}

/// Fields that can be updated on an existing policy.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdatePolicy {
    pub name: Option<String>,
    pub properties: Option<serde_json::Value>,
}

impl UpdatePolicy {
    /// Compute the changed-field set against a last-loaded snapshot.
    pub fn diff(snapshot: &Policy, edited: &Policy) -> UpdatePolicy {
        UpdatePolicy {
            name: (snapshot.name != edited.name).then(|| edited.name.clone()),
            properties: (snapshot.properties != edited.properties)
                .then(|| edited.properties.clone()),
        }
    }
}

/// Association of a policy to a specific node.
///
/// Identity is the `(node_uuid, policy_id)` pair; there is no separate
/// UUID for the association itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedPolicy {
    pub node_uuid: String,
    pub policy_id: Uuid,
    /// Project of the policy at application time.
    pub project_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
