//! Lease admission — the check-and-commit step.

use chrono::{DateTime, Utc};
use metalease_core::error::{MetaleaseError, MetaleaseResult};
use metalease_core::interval::Interval;
use metalease_core::models::leased_node::{CreateLeasedNode, LeasedNode};
use metalease_core::models::offer::OfferStatus;
use metalease_core::repository::{LeasedNodeRepository, OfferFilter, OfferRepository};
use tracing::debug;
use uuid::Uuid;

use crate::availability::AvailabilityCalculator;
use crate::config::EngineConfig;
use crate::error::AdmissionError;

/// A tenant's request to lease one resource over a window.
#[derive(Debug, Clone)]
pub struct AdmissionRequest {
    pub resource_type: String,
    pub resource_uuid: String,
    /// Requested start (inclusive).
    pub start_time: DateTime<Utc>,
    /// Requested end (exclusive).
    pub end_time: DateTime<Utc>,
    /// Project requesting the lease.
    pub project_id: String,
    /// Originating lease request, when the grant should be linked to
    /// one.
    pub request_id: Option<Uuid>,
}

impl AdmissionRequest {
    fn validate(&self) -> Result<Interval, AdmissionError> {
        if self.resource_type.is_empty() || self.resource_uuid.is_empty() {
            return Err(AdmissionError::InvalidRequest(
                "resource identifiers must not be empty".into(),
            ));
        }
        if self.project_id.is_empty() {
            return Err(AdmissionError::InvalidRequest(
                "project_id must not be empty".into(),
            ));
        }
        Interval::new(self.start_time, self.end_time).map_err(|_| {
            AdmissionError::InvalidRequest(format!(
                "requested window [{}, {}) is empty or inverted",
                self.start_time, self.end_time
            ))
        })
    }
}

/// Grants or rejects lease requests against current availability.
///
/// Generic over repository implementations so that the engine has no
/// dependency on the database crate. The leased-node repository serves
/// double duty: it is the conflict source for availability computation
/// and the atomic commit path for grants.
pub struct AdmissionController<O, N>
where
    O: OfferRepository,
    N: LeasedNodeRepository + Clone,
{
    offers: O,
    nodes: N,
    calculator: AvailabilityCalculator<N>,
    config: EngineConfig,
}

impl<O, N> AdmissionController<O, N>
where
    O: OfferRepository,
    N: LeasedNodeRepository + Clone,
{
    pub fn new(offers: O, nodes: N, config: EngineConfig) -> Self {
        let calculator = AvailabilityCalculator::new(nodes.clone());
        Self {
            offers,
            nodes,
            calculator,
            config,
        }
    }

    /// Admit a lease request: validate the window, check it against the
    /// free sub-windows of an Available offer for the resource, and
    /// commit the grant.
    ///
    /// The commit re-checks overlaps atomically in storage; losing that
    /// race triggers one automatic retry with freshly fetched
    /// availabilities before the conflict surfaces to the caller.
    pub async fn request_lease(&self, request: AdmissionRequest) -> MetaleaseResult<LeasedNode> {
        let requested = request.validate()?;

        let mut attempts = 0;
        loop {
            match self.try_admit(&request, requested).await {
                Err(MetaleaseError::Conflict { reason }) if attempts < self.config.admission_retries => {
                    attempts += 1;
                    debug!(
                        resource_uuid = %request.resource_uuid,
                        attempt = attempts,
                        %reason,
                        "Admission conflict, retrying with fresh availabilities"
                    );
                }
                other => return other,
            }
        }
    }

    /// Release a granted lease, returning its interval to the free
    /// pool.
    pub async fn release(&self, leased_node_id: Uuid) -> MetaleaseResult<()> {
        self.nodes.destroy(leased_node_id).await?;
        debug!(%leased_node_id, "Lease released");
        Ok(())
    }

    /// One admission attempt: offer lookup, containment check, commit.
    async fn try_admit(
        &self,
        request: &AdmissionRequest,
        requested: Interval,
    ) -> MetaleaseResult<LeasedNode> {
        let offers = self
            .offers
            .get_all(OfferFilter {
                resource_type: Some(request.resource_type.clone()),
                resource_uuid: Some(request.resource_uuid.clone()),
                status: Some(OfferStatus::Available),
                ..Default::default()
            })
            .await?;

        if offers.is_empty() {
            return Err(AdmissionError::OfferNotFound {
                resource_uuid: request.resource_uuid.clone(),
            }
            .into());
        }

        for offer in &offers {
            let free = self.calculator.get_availabilities(offer).await?;

            // The request must fit inside a single free sub-window;
            // spanning a conflict gap is never permitted.
            if !free.iter().any(|w| w.contains(&requested)) {
                continue;
            }

            let node = self
                .nodes
                .create_checked(CreateLeasedNode {
                    request_id: request.request_id,
                    project_id: request.project_id.clone(),
                    resource_type: request.resource_type.clone(),
                    resource_uuid: request.resource_uuid.clone(),
                    start_time: request.start_time,
                    end_time: request.end_time,
                })
                .await?;

            debug!(
                resource_uuid = %request.resource_uuid,
                leased_node_id = %node.id,
                "Lease granted"
            );
            return Ok(node);
        }

        Err(AdmissionError::WindowUnavailable {
            resource_uuid: request.resource_uuid.clone(),
        }
        .into())
    }
}
