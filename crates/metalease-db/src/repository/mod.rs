//! SurrealDB repository implementations.

mod lease_request;
mod leased_node;
mod offer;
mod policy;

pub use lease_request::SurrealLeaseRequestRepository;
pub use leased_node::SurrealLeasedNodeRepository;
pub use offer::SurrealOfferRepository;
pub use policy::SurrealPolicyRepository;
