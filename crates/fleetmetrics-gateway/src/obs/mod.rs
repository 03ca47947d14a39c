//! Request observability: the HTTP metric families and the middleware that
//! feeds them.

pub mod instrument;
pub mod metrics;

pub use instrument::{instrument, InFlight, Instrumentation};
pub use metrics::HttpMetrics;
