//! Metalease Engine — availability calculation and lease admission.
//!
//! The two moving parts of the leasing core: the read-only
//! [`availability::AvailabilityCalculator`], which turns an offer's
//! window and the committed leases against its resource into a list of
//! free sub-windows, and the [`admission::AdmissionController`], which
//! validates a requested window against those free sub-windows and
//! commits the grant.
//!
//! Generic over the `metalease-core` repository traits so the engine
//! has no dependency on the database crate.

pub mod admission;
pub mod availability;
pub mod config;
pub mod error;
