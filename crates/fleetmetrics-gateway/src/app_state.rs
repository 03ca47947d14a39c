//! Shared application state for the fleetmetrics gateway.
//!
//! The metrics registry is injected rather than global, so every test can
//! build a state around a fresh registry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fleetmetrics_core::error::Result;
use fleetmetrics_core::metrics::Registry;

use crate::config::GatewayConfig;
use crate::obs::HttpMetrics;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    metrics: HttpMetrics,
    draining: AtomicBool,
}

impl AppState {
    /// Build application state, registering the HTTP metric families.
    /// Fails with `DuplicateName` if `registry` already holds a conflicting
    /// family.
    pub fn new(cfg: GatewayConfig, registry: Arc<Registry>) -> Result<Self> {
        let buckets = cfg.metrics.latency_buckets()?;
        let metrics = HttpMetrics::register(registry, buckets.as_deref())?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                metrics,
                draining: AtomicBool::new(false),
            }),
        })
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn metrics(&self) -> &HttpMetrics {
        &self.inner.metrics
    }

    /// Mark draining state.
    pub fn set_draining(&self) {
        self.inner.draining.store(true, Ordering::Relaxed);
    }

    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Relaxed)
    }
}
