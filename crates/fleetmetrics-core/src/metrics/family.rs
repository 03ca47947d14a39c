//! Metric families and their per-label-set accumulators.

use std::fmt::{self, Write};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

use crate::error::{FleetError, Result};
use crate::metrics::histogram::{self, HistogramSnapshot, SeriesHistogram};

/// Measurement type of a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

impl MetricKind {
    /// Word used on the `# TYPE` line.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

/// A single event applied to one label set's accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Counter increment.
    Inc(u64),
    /// Signed gauge adjustment.
    Delta(i64),
    /// Histogram sample.
    Sample(Duration),
}

impl Observation {
    fn fits(self, kind: MetricKind) -> bool {
        matches!(
            (self, kind),
            (Observation::Inc(_), MetricKind::Counter)
                | (Observation::Delta(_), MetricKind::Gauge)
                | (Observation::Sample(_), MetricKind::Histogram)
        )
    }
}

enum Series {
    Counter(AtomicU64),
    Gauge(AtomicI64),
    Histogram(SeriesHistogram),
}

enum SeriesValue {
    Counter(u64),
    Gauge(i64),
    Histogram(HistogramSnapshot),
}

impl Series {
    fn read(&self) -> SeriesValue {
        match self {
            Series::Counter(c) => SeriesValue::Counter(c.load(Ordering::Relaxed)),
            Series::Gauge(g) => SeriesValue::Gauge(g.load(Ordering::Relaxed)),
            Series::Histogram(h) => SeriesValue::Histogram(h.snapshot()),
        }
    }
}

pub(crate) struct Family {
    name: String,
    help: String,
    kind: MetricKind,
    label_names: Vec<String>,
    /// Histogram bounds in microseconds; empty for counters and gauges.
    bounds: Arc<[u64]>,
    /// Registration order, used to keep snapshots stable.
    seq: u64,
    series: DashMap<Vec<String>, Series>,
}

/// Clonable handle to one registered family.
///
/// Observations go straight to the family's own map, so recording never
/// contends on the registry itself.
#[derive(Clone)]
pub struct FamilyHandle {
    inner: Arc<Family>,
}

impl fmt::Debug for FamilyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FamilyHandle")
            .field("name", &self.inner.name)
            .field("kind", &self.inner.kind)
            .field("label_names", &self.inner.label_names)
            .finish()
    }
}

impl FamilyHandle {
    pub(crate) fn new(
        name: &str,
        help: &str,
        kind: MetricKind,
        label_names: &[&str],
        bounds: Arc<[u64]>,
        seq: u64,
    ) -> Self {
        Self {
            inner: Arc::new(Family {
                name: name.to_string(),
                help: help.to_string(),
                kind,
                label_names: label_names.iter().map(|s| s.to_string()).collect(),
                bounds,
                seq,
                series: DashMap::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn kind(&self) -> MetricKind {
        self.inner.kind
    }

    pub fn label_names(&self) -> &[String] {
        &self.inner.label_names
    }

    pub(crate) fn seq(&self) -> u64 {
        self.inner.seq
    }

    pub(crate) fn same_schema(&self, kind: MetricKind, label_names: &[&str], bounds: &[u64]) -> bool {
        self.inner.kind == kind
            && self.inner.label_names.len() == label_names.len()
            && self.inner.label_names.iter().zip(label_names).all(|(a, b)| a == b)
            && &self.inner.bounds[..] == bounds
    }

    /// Apply one observation to the accumulator keyed by `labels`.
    ///
    /// `labels` are `(name, value)` pairs in any order and must name every
    /// label of the family exactly once. The accumulator is created on first
    /// use.
    pub fn observe(&self, labels: &[(&str, &str)], obs: Observation) -> Result<()> {
        if !obs.fits(self.inner.kind) {
            return Err(self.kind_mismatch());
        }
        let key = self.key(labels)?;

        let applied = match self.inner.series.get(&key) {
            Some(series) => apply(&series, obs),
            None => {
                let series = self
                    .inner
                    .series
                    .entry(key)
                    .or_insert_with(|| self.new_series());
                apply(&series, obs)
            }
        };
        if applied {
            Ok(())
        } else {
            Err(self.kind_mismatch())
        }
    }

    /// Counter +1.
    pub fn inc(&self, labels: &[(&str, &str)]) -> Result<()> {
        self.observe(labels, Observation::Inc(1))
    }

    /// Counter +v.
    pub fn add(&self, labels: &[(&str, &str)], v: u64) -> Result<()> {
        self.observe(labels, Observation::Inc(v))
    }

    /// Gauge by a signed delta.
    pub fn add_delta(&self, labels: &[(&str, &str)], delta: i64) -> Result<()> {
        self.observe(labels, Observation::Delta(delta))
    }

    /// Gauge -1.
    pub fn dec(&self, labels: &[(&str, &str)]) -> Result<()> {
        self.observe(labels, Observation::Delta(-1))
    }

    pub fn observe_duration(&self, labels: &[(&str, &str)], d: Duration) -> Result<()> {
        self.observe(labels, Observation::Sample(d))
    }

    /// Current counter value for `labels` (0 if never observed).
    pub fn counter_value(&self, labels: &[(&str, &str)]) -> Result<u64> {
        match self.read(labels, MetricKind::Counter)? {
            Some(SeriesValue::Counter(v)) => Ok(v),
            _ => Ok(0),
        }
    }

    /// Current gauge value for `labels` (0 if never observed).
    pub fn gauge_value(&self, labels: &[(&str, &str)]) -> Result<i64> {
        match self.read(labels, MetricKind::Gauge)? {
            Some(SeriesValue::Gauge(v)) => Ok(v),
            _ => Ok(0),
        }
    }

    pub fn histogram(&self, labels: &[(&str, &str)]) -> Result<Option<HistogramSnapshot>> {
        match self.read(labels, MetricKind::Histogram)? {
            Some(SeriesValue::Histogram(h)) => Ok(Some(h)),
            _ => Ok(None),
        }
    }

    /// Number of distinct label sets observed so far.
    pub fn cardinality(&self) -> usize {
        self.inner.series.len()
    }

    fn read(&self, labels: &[(&str, &str)], want: MetricKind) -> Result<Option<SeriesValue>> {
        if self.inner.kind != want {
            return Err(self.kind_mismatch());
        }
        let key = self.key(labels)?;
        Ok(self.inner.series.get(&key).map(|s| s.read()))
    }

    fn kind_mismatch(&self) -> FleetError {
        FleetError::KindMismatch {
            family: self.inner.name.clone(),
            kind: self.inner.kind.as_str(),
        }
    }

    fn new_series(&self) -> Series {
        match self.inner.kind {
            MetricKind::Counter => Series::Counter(AtomicU64::new(0)),
            MetricKind::Gauge => Series::Gauge(AtomicI64::new(0)),
            MetricKind::Histogram => {
                Series::Histogram(SeriesHistogram::new(Arc::clone(&self.inner.bounds)))
            }
        }
    }

    /// Order label values by the family's label names.
    fn key(&self, labels: &[(&str, &str)]) -> Result<Vec<String>> {
        let names = &self.inner.label_names;
        if labels.len() != names.len() {
            return Err(self.invalid(format!(
                "expected {} labels, got {}",
                names.len(),
                labels.len()
            )));
        }

        // Equal lengths plus every name matched once rules out unknown labels.
        let mut key = Vec::with_capacity(names.len());
        for name in names {
            let mut found = labels.iter().filter(|(k, _)| *k == name.as_str());
            match (found.next(), found.next()) {
                (Some((_, v)), None) => key.push(v.to_string()),
                (None, _) => return Err(self.invalid(format!("missing label {name}"))),
                (Some(_), Some(_)) => return Err(self.invalid(format!("duplicate label {name}"))),
            }
        }
        Ok(key)
    }

    fn invalid(&self, reason: String) -> FleetError {
        FleetError::InvalidLabelSet {
            family: self.inner.name.clone(),
            reason,
        }
    }

    /// Render HELP, TYPE and one line per label set, sorted by label values.
    pub(crate) fn render(&self, out: &mut String) {
        let f = &self.inner;
        let _ = writeln!(out, "# HELP {} {}", f.name, escape_help(&f.help));
        let _ = writeln!(out, "# TYPE {} {}", f.name, f.kind.as_str());

        let mut rows: Vec<(Vec<String>, SeriesValue)> = f
            .series
            .iter()
            .map(|r| (r.key().clone(), r.value().read()))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));

        for (values, value) in rows {
            let label_str = f
                .label_names
                .iter()
                .zip(&values)
                .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
                .collect::<Vec<_>>()
                .join(",");

            match value {
                SeriesValue::Counter(v) => {
                    let _ = writeln!(out, "{}{} {}", f.name, braces(&label_str), v);
                }
                SeriesValue::Gauge(v) => {
                    let _ = writeln!(out, "{}{} {}", f.name, braces(&label_str), v);
                }
                SeriesValue::Histogram(snap) => {
                    histogram::render_series(&f.name, &label_str, &snap, out);
                }
            }
        }
    }
}

/// Returns false, leaving the series untouched, when `obs` does not fit it.
fn apply(series: &Series, obs: Observation) -> bool {
    match (series, obs) {
        (Series::Counter(c), Observation::Inc(v)) => {
            c.fetch_add(v, Ordering::Relaxed);
        }
        (Series::Gauge(g), Observation::Delta(d)) => {
            g.fetch_add(d, Ordering::Relaxed);
        }
        (Series::Histogram(h), Observation::Sample(d)) => h.observe(d),
        _ => return false,
    }
    true
}

fn braces(label_str: &str) -> String {
    if label_str.is_empty() {
        String::new()
    } else {
        format!("{{{label_str}}}")
    }
}

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_rejects_mismatched_observation() {
        let counter = Series::Counter(AtomicU64::new(0));
        assert!(!apply(&counter, Observation::Delta(1)));
        assert!(!apply(&counter, Observation::Sample(Duration::from_millis(1))));
        assert!(apply(&counter, Observation::Inc(2)));
        assert!(matches!(counter.read(), SeriesValue::Counter(2)));

        let gauge = Series::Gauge(AtomicI64::new(0));
        assert!(!apply(&gauge, Observation::Inc(1)));
        assert!(matches!(gauge.read(), SeriesValue::Gauge(0)));
    }
}
