//! Latency histogram accumulator.
//!
//! Bucket bounds and the running sum are kept in integer microseconds so
//! that updates never touch floating point. Conversion to seconds happens
//! only when a snapshot is rendered.

use std::fmt::Write;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{FleetError, Result};

// 5ms, 10ms, 25ms, 50ms, 75ms, 100ms, 250ms, 500ms, 750ms, 1s, 2.5s, 5s, 7.5s, 10s
pub const DEFAULT_BUCKETS_MICROS: [u64; 14] = [
    5_000, 10_000, 25_000, 50_000, 75_000, 100_000, 250_000, 500_000, 750_000, 1_000_000,
    2_500_000, 5_000_000, 7_500_000, 10_000_000,
];

/// Point-in-time view of one histogram series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistogramSnapshot {
    pub count: u64,
    pub sum: Duration,
    /// Cumulative counts per upper bound, `+Inf` excluded (it equals `count`).
    pub buckets: Vec<(Duration, u64)>,
}

#[derive(Debug, Clone)]
struct State {
    count: u64,
    sum_micros: u64,
    buckets: Vec<u64>,
}

/// One label set's histogram. The whole state sits behind a per-series lock
/// so a reader never observes `count` and `buckets` out of step.
pub(crate) struct SeriesHistogram {
    bounds: Arc<[u64]>,
    state: Mutex<State>,
}

impl SeriesHistogram {
    pub(crate) fn new(bounds: Arc<[u64]>) -> Self {
        let buckets = vec![0; bounds.len()];
        Self {
            bounds,
            state: Mutex::new(State {
                count: 0,
                sum_micros: 0,
                buckets,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Nothing under this lock panics; poisoning is ignored.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn observe(&self, value: Duration) {
        let micros = u64::try_from(value.as_micros()).unwrap_or(u64::MAX);
        let mut st = self.lock();
        st.count += 1;
        st.sum_micros = st.sum_micros.saturating_add(micros);

        // Cumulative buckets: every bound at or above the sample.
        for (i, &b) in self.bounds.iter().enumerate() {
            if micros <= b {
                st.buckets[i] += 1;
            }
        }
    }

    pub(crate) fn snapshot(&self) -> HistogramSnapshot {
        let st = self.lock().clone();
        HistogramSnapshot {
            count: st.count,
            sum: Duration::from_micros(st.sum_micros),
            buckets: self
                .bounds
                .iter()
                .zip(st.buckets)
                .map(|(&b, c)| (Duration::from_micros(b), c))
                .collect(),
        }
    }
}

/// Check explicit bucket bounds without registering anything.
///
/// Bounds must be non-empty, whole microseconds, at least 1µs, and strictly
/// increasing. Config loading runs the same check as registration.
pub fn validate_buckets(buckets: &[Duration]) -> Result<()> {
    bounds_from_durations(buckets).map(|_| ())
}

/// Convert explicit bucket bounds into microseconds.
pub(crate) fn bounds_from_durations(buckets: &[Duration]) -> Result<Arc<[u64]>> {
    if buckets.is_empty() {
        return Err(FleetError::BadRequest("histogram buckets must not be empty".into()));
    }
    let mut out = Vec::with_capacity(buckets.len());
    for b in buckets {
        if b.subsec_nanos() % 1_000 != 0 {
            return Err(FleetError::BadRequest(format!(
                "histogram bucket {b:?} is not a whole number of microseconds"
            )));
        }
        let micros = u64::try_from(b.as_micros())
            .map_err(|_| FleetError::BadRequest(format!("histogram bucket too large: {b:?}")))?;
        if micros == 0 {
            return Err(FleetError::BadRequest(
                "histogram buckets must be at least 1 microsecond".into(),
            ));
        }
        if out.last().is_some_and(|&prev| prev >= micros) {
            return Err(FleetError::BadRequest(
                "histogram buckets must be strictly increasing".into(),
            ));
        }
        out.push(micros);
    }
    Ok(out.into())
}

/// Write the `_bucket`, `_sum` and `_count` lines for one series.
pub(crate) fn render_series(name: &str, labels: &str, snap: &HistogramSnapshot, out: &mut String) {
    let (prefix, braced) = if labels.is_empty() {
        (String::new(), String::new())
    } else {
        (format!("{labels},"), format!("{{{labels}}}"))
    };

    for (le, count) in &snap.buckets {
        let _ = writeln!(
            out,
            "{name}_bucket{{{prefix}le=\"{}\"}} {count}",
            secs(*le)
        );
    }
    let _ = writeln!(out, "{name}_bucket{{{prefix}le=\"+Inf\"}} {}", snap.count);
    let _ = writeln!(out, "{name}_sum{braced} {}", secs(snap.sum));
    let _ = writeln!(out, "{name}_count{braced} {}", snap.count);
}

// Divide once so bounds like 5ms print as `0.005`.
fn secs(d: Duration) -> f64 {
    d.as_micros() as f64 / 1_000_000.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn cumulative_buckets() {
        let h = SeriesHistogram::new(Arc::from(&[1_000u64, 10_000][..]));
        h.observe(Duration::from_micros(500));
        h.observe(Duration::from_millis(5));
        h.observe(Duration::from_secs(1));

        let snap = h.snapshot();
        assert_eq!(snap.count, 3);
        assert_eq!(snap.buckets[0], (Duration::from_millis(1), 1));
        assert_eq!(snap.buckets[1], (Duration::from_millis(10), 2));
        assert_eq!(snap.sum, Duration::from_micros(1_005_500));
    }

    #[test]
    fn bounds_must_increase() {
        assert!(bounds_from_durations(&[]).is_err());
        assert!(bounds_from_durations(&[Duration::ZERO]).is_err());
        assert!(bounds_from_durations(&[Duration::from_millis(5), Duration::from_millis(5)]).is_err());
        let sub_micro = [Duration::from_nanos(1_500), Duration::from_nanos(1_900)];
        assert!(bounds_from_durations(&sub_micro).is_err());
        let ok = bounds_from_durations(&[Duration::from_millis(5), Duration::from_secs(1)]).unwrap();
        assert_eq!(&ok[..], &[5_000, 1_000_000]);
    }
}
