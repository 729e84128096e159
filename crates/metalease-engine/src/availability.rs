//! Availability calculation for offers.

use metalease_core::error::MetaleaseResult;
use metalease_core::interval::{self, Interval};
use metalease_core::models::offer::Offer;
use metalease_core::repository::ConflictSource;

/// Computes the free sub-windows of an offer.
///
/// A pure read: fetches the committed lease intervals for the offer's
/// resource, merges them, and returns the gaps inside the offer window.
pub struct AvailabilityCalculator<C: ConflictSource> {
    source: C,
}

impl<C: ConflictSource> AvailabilityCalculator<C> {
    pub fn new(source: C) -> Self {
        Self { source }
    }

    /// The free sub-windows of `offer`, sorted ascending by start time
    /// and mutually non-overlapping.
    ///
    /// Conflict intervals are clipped to the offer window whether or not
    /// the source pre-filtered them; together with the merged conflicts
    /// the result reconstructs the offer window exactly. No conflicts
    /// yields the full window, full coverage yields an empty list.
    pub async fn get_availabilities(&self, offer: &Offer) -> MetaleaseResult<Vec<Interval>> {
        let window = offer.window();

        let conflicts = self
            .source
            .conflicting_intervals(&offer.resource_type, &offer.resource_uuid, window)
            .await?;

        let clipped: Vec<Interval> = conflicts
            .into_iter()
            .filter_map(|c| c.clip(&window))
            .collect();
        let merged = interval::merge(clipped);

        Ok(interval::complement(&window, &merged))
    }
}
