//! In-process metrics registry with Prometheus text exposition.
//!
//! Families are registered once at startup and live as long as the
//! registry. Each family keeps its own sharded map of label sets, so
//! observations on different families or label sets never serialize behind
//! a shared lock. Counters and gauges are single atomics; histogram series
//! are guarded per series.

mod family;
mod histogram;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{FleetError, Result};

pub use family::{FamilyHandle, MetricKind, Observation};
pub use histogram::{validate_buckets, HistogramSnapshot, DEFAULT_BUCKETS_MICROS};

/// Content type of [`Registry::snapshot`] output.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Default)]
pub struct Registry {
    families: DashMap<String, FamilyHandle>,
    next_seq: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a family. Histograms get [`DEFAULT_BUCKETS_MICROS`].
    ///
    /// Registering the same name with the same schema returns the existing
    /// family; any other kind or label list fails with `DuplicateName`.
    pub fn register(
        &self,
        name: &str,
        help: &str,
        kind: MetricKind,
        label_names: &[&str],
    ) -> Result<FamilyHandle> {
        let bounds: Arc<[u64]> = match kind {
            MetricKind::Histogram => Arc::from(&DEFAULT_BUCKETS_MICROS[..]),
            MetricKind::Counter | MetricKind::Gauge => Arc::from(Vec::new()),
        };
        self.register_inner(name, help, kind, label_names, bounds)
    }

    /// Register a histogram with explicit upper bounds.
    pub fn register_histogram(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
        buckets: &[Duration],
    ) -> Result<FamilyHandle> {
        let bounds = histogram::bounds_from_durations(buckets)?;
        self.register_inner(name, help, MetricKind::Histogram, label_names, bounds)
    }

    fn register_inner(
        &self,
        name: &str,
        help: &str,
        kind: MetricKind,
        label_names: &[&str],
        bounds: Arc<[u64]>,
    ) -> Result<FamilyHandle> {
        validate_metric_name(name)?;
        validate_label_names(label_names)?;

        match self.families.entry(name.to_string()) {
            Entry::Occupied(e) => {
                if e.get().same_schema(kind, label_names, &bounds) {
                    Ok(e.get().clone())
                } else {
                    Err(FleetError::DuplicateName {
                        name: name.to_string(),
                    })
                }
            }
            Entry::Vacant(e) => {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                let handle = FamilyHandle::new(name, help, kind, label_names, bounds, seq);
                e.insert(handle.clone());
                tracing::debug!(family = %name, kind = kind.as_str(), "metric family registered");
                Ok(handle)
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<FamilyHandle> {
        self.families.get(name).map(|r| r.value().clone())
    }

    /// Render all families in registration order.
    pub fn snapshot(&self) -> String {
        let mut families: Vec<FamilyHandle> =
            self.families.iter().map(|r| r.value().clone()).collect();
        families.sort_by_key(|f| f.seq());

        let mut out = String::new();
        for f in &families {
            f.render(&mut out);
        }
        out
    }
}

fn validate_metric_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let ok = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        }
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(FleetError::InvalidName(format!("metric name {name:?}")))
    }
}

fn validate_label_names(names: &[&str]) -> Result<()> {
    for (i, name) in names.iter().enumerate() {
        let mut chars = name.chars();
        let ok = match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        };
        // `le` is reserved for histogram buckets.
        if !ok || *name == "le" || name.starts_with("__") {
            return Err(FleetError::InvalidName(format!("label name {name:?}")));
        }
        if names[..i].contains(name) {
            return Err(FleetError::InvalidName(format!("duplicate label name {name:?}")));
        }
    }
    Ok(())
}
