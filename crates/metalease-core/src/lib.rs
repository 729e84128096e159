//! Metalease Core — domain models and contracts for bare-metal leasing.
//!
//! This crate holds everything the leasing engine reasons about without
//! touching I/O: the half-open [`interval::Interval`] model, the domain
//! entities (offers, policies, lease requests, leased nodes), the error
//! taxonomy, and the repository traits implemented by the database crate.

pub mod error;
pub mod interval;
pub mod models;
pub mod repository;
