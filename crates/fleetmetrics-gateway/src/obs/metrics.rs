//! HTTP request metric families.
//!
//! The three families share the `(path, method)` label schema. `path` is
//! always a declared route template such as `/cars/{id}`, never the raw
//! request path, which keeps cardinality bounded by the route table.

use std::sync::Arc;
use std::time::Duration;

use fleetmetrics_core::error::Result;
use fleetmetrics_core::metrics::{FamilyHandle, MetricKind, Registry};

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const REQUEST_LATENCY: &str = "request_latency_seconds";
pub const IN_PROGRESS: &str = "inprogress_requests";

pub const LABEL_PATH: &str = "path";
pub const LABEL_METHOD: &str = "method";
const LABEL_NAMES: [&str; 2] = [LABEL_PATH, LABEL_METHOD];

#[derive(Clone)]
pub struct HttpMetrics {
    registry: Arc<Registry>,
    pub requests: FamilyHandle,
    pub latency: FamilyHandle,
    pub in_progress: FamilyHandle,
}

impl HttpMetrics {
    /// Register the request families into `registry`.
    ///
    /// `latency_buckets` overrides the registry's default histogram buckets.
    pub fn register(registry: Arc<Registry>, latency_buckets: Option<&[Duration]>) -> Result<Self> {
        let requests = registry.register(
            REQUESTS_TOTAL,
            "Total number of requests",
            MetricKind::Counter,
            &LABEL_NAMES,
        )?;
        let latency = match latency_buckets {
            Some(b) => registry.register_histogram(REQUEST_LATENCY, "Request latency", &LABEL_NAMES, b)?,
            None => registry.register(
                REQUEST_LATENCY,
                "Request latency",
                MetricKind::Histogram,
                &LABEL_NAMES,
            )?,
        };
        let in_progress = registry.register(
            IN_PROGRESS,
            "Total number of requests in progress",
            MetricKind::Gauge,
            &LABEL_NAMES,
        )?;

        Ok(Self {
            registry,
            requests,
            latency,
            in_progress,
        })
    }

    /// Prometheus text snapshot of the whole registry.
    pub fn render(&self) -> String {
        self.registry.snapshot()
    }
}
