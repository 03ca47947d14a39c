//! fleetmetrics core: the in-process metrics registry and the shared error type.
//!
//! This crate carries no HTTP or runtime dependencies; the gateway wires it
//! into request handling and serves its snapshot.
//!
//! Panics, `unwrap`, and `expect` are compile-denied here. Every fallible
//! path surfaces as `FleetError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod metrics;

/// Shared result type.
pub use error::{FleetError, Result};
pub use metrics::{FamilyHandle, MetricKind, Observation, Registry};
