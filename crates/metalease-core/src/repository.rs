//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async and keyed by UUID for external
//! addressing (never by a storage-internal key). `create`/`update`
//! return the post-commit entity including server-assigned timestamp
//! fields.

use uuid::Uuid;

use crate::error::MetaleaseResult;
use crate::interval::Interval;
use crate::models::{
    lease_request::{CreateLeaseRequest, LeaseRequest, UpdateLeaseRequest},
    leased_node::{CreateLeasedNode, LeasedNode, UpdateLeasedNode},
    offer::{CreateOffer, Offer, OfferStatus, UpdateOffer},
    policy::{AppliedPolicy, CreatePolicy, Policy, UpdatePolicy},
};

/// Query filters for offer listings.
#[derive(Debug, Clone, Default)]
pub struct OfferFilter {
    pub project_id: Option<String>,
    pub resource_type: Option<String>,
    pub resource_uuid: Option<String>,
    pub status: Option<OfferStatus>,
}

/// Source of committed lease intervals for one resource.
///
/// Consumed by the availability calculator. The returned intervals may
/// arrive in any order and need not be clipped to `window`; the caller
/// sorts and clips.
pub trait ConflictSource: Send + Sync {
    /// Every committed lease interval on the given resource overlapping
    /// `window`.
    fn conflicting_intervals(
        &self,
        resource_type: &str,
        resource_uuid: &str,
        window: Interval,
    ) -> impl Future<Output = MetaleaseResult<Vec<Interval>>> + Send;
}

pub trait OfferRepository: Send + Sync {
    fn create(&self, input: CreateOffer) -> impl Future<Output = MetaleaseResult<Offer>> + Send;
    fn get(&self, id: Uuid) -> impl Future<Output = MetaleaseResult<Offer>> + Send;
    /// List offers matching the filter, ordered by start time ascending.
    fn get_all(
        &self,
        filter: OfferFilter,
    ) -> impl Future<Output = MetaleaseResult<Vec<Offer>>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateOffer,
    ) -> impl Future<Output = MetaleaseResult<Offer>> + Send;
    fn destroy(&self, id: Uuid) -> impl Future<Output = MetaleaseResult<()>> + Send;
}

pub trait PolicyRepository: Send + Sync {
    fn create(&self, input: CreatePolicy) -> impl Future<Output = MetaleaseResult<Policy>> + Send;
    fn get(&self, id: Uuid) -> impl Future<Output = MetaleaseResult<Policy>> + Send;
    fn get_all(&self) -> impl Future<Output = MetaleaseResult<Vec<Policy>>> + Send;
    fn get_all_by_project(
        &self,
        project_id: &str,
    ) -> impl Future<Output = MetaleaseResult<Vec<Policy>>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdatePolicy,
    ) -> impl Future<Output = MetaleaseResult<Policy>> + Send;
    /// Destroy a policy and every association applying it to a node.
    fn destroy(&self, id: Uuid) -> impl Future<Output = MetaleaseResult<()>> + Send;

    /// Apply a policy to a node, creating the composite-keyed
    /// association.
    fn apply_to_node(
        &self,
        node_uuid: &str,
        policy_id: Uuid,
    ) -> impl Future<Output = MetaleaseResult<AppliedPolicy>> + Send;

    /// Fetch one association by its `(node_uuid, policy_id)` key.
    fn get_applied(
        &self,
        node_uuid: &str,
        policy_id: Uuid,
    ) -> impl Future<Output = MetaleaseResult<AppliedPolicy>> + Send;

    fn get_all_applied(&self) -> impl Future<Output = MetaleaseResult<Vec<AppliedPolicy>>> + Send;

    fn get_all_applied_by_project(
        &self,
        project_id: &str,
    ) -> impl Future<Output = MetaleaseResult<Vec<AppliedPolicy>>> + Send;

    /// Remove one association; the policy itself is untouched.
    fn remove_from_node(
        &self,
        node_uuid: &str,
        policy_id: Uuid,
    ) -> impl Future<Output = MetaleaseResult<()>> + Send;
}

pub trait LeaseRequestRepository: Send + Sync {
    fn create(
        &self,
        input: CreateLeaseRequest,
    ) -> impl Future<Output = MetaleaseResult<LeaseRequest>> + Send;
    fn get(&self, id: Uuid) -> impl Future<Output = MetaleaseResult<LeaseRequest>> + Send;
    fn get_all(&self) -> impl Future<Output = MetaleaseResult<Vec<LeaseRequest>>> + Send;
    fn get_all_by_project(
        &self,
        project_id: &str,
    ) -> impl Future<Output = MetaleaseResult<Vec<LeaseRequest>>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateLeaseRequest,
    ) -> impl Future<Output = MetaleaseResult<LeaseRequest>> + Send;
    /// Destroy a request. Grants referencing it survive; their
    /// `request_id` is cleared.
    fn destroy(&self, id: Uuid) -> impl Future<Output = MetaleaseResult<()>> + Send;
}

pub trait LeasedNodeRepository: ConflictSource {
    /// Commit a lease, atomically re-checking for overlapping committed
    /// leases on the same resource. The overlap check and the insert run
    /// in one storage transaction; a lost race surfaces as a conflict
    /// error.
    fn create_checked(
        &self,
        input: CreateLeasedNode,
    ) -> impl Future<Output = MetaleaseResult<LeasedNode>> + Send;
    fn get(&self, id: Uuid) -> impl Future<Output = MetaleaseResult<LeasedNode>> + Send;
    fn get_all(&self) -> impl Future<Output = MetaleaseResult<Vec<LeasedNode>>> + Send;
    fn get_all_by_request(
        &self,
        request_id: Uuid,
    ) -> impl Future<Output = MetaleaseResult<Vec<LeasedNode>>> + Send;
    fn get_all_by_project(
        &self,
        project_id: &str,
    ) -> impl Future<Output = MetaleaseResult<Vec<LeasedNode>>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateLeasedNode,
    ) -> impl Future<Output = MetaleaseResult<LeasedNode>> + Send;
    /// Destroy a grant, returning its interval to the free pool.
    fn destroy(&self, id: Uuid) -> impl Future<Output = MetaleaseResult<()>> + Send;
}
