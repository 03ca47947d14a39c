//! fleetmetrics gateway library entry.
//!
//! Wires config, the resource handlers, the request instrumentation, and the
//! ops endpoints into one axum router. Consumed by the binary (`main.rs`)
//! and by integration tests.

pub mod app_state;
pub mod config;
pub mod obs;
pub mod ops;
pub mod router;
pub mod services;
