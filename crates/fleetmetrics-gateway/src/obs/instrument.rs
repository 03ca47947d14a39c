//! Request instrumentation middleware.
//!
//! Attached per route with that route's declared template as the `path`
//! label. The `method` label is the request's own method, so a `HEAD`
//! served by a `GET` route is labelled `head`.
//!
//! The [`InFlight`] guard carries the timing state: it is created when the
//! request enters and records the exit when dropped, so the exit side runs
//! exactly once whether the handler returns, panics, or its future is
//! cancelled.

use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};

use crate::obs::metrics::{HttpMetrics, LABEL_METHOD, LABEL_PATH};

/// Metrics and `path` label for one instrumented route.
#[derive(Clone)]
pub struct Instrumentation {
    metrics: HttpMetrics,
    path: &'static str,
}

impl Instrumentation {
    pub fn new(metrics: HttpMetrics, path: &'static str) -> Self {
        Self { metrics, path }
    }
}

pub async fn instrument(
    State(inst): State<Instrumentation>,
    req: Request,
    next: Next,
) -> Response {
    let _guard = InFlight::enter(&inst, req.method());
    next.run(req).await
}

/// Scoped in-flight marker for one request.
pub struct InFlight<'a> {
    inst: &'a Instrumentation,
    method: &'static str,
    started: Instant,
}

impl<'a> InFlight<'a> {
    pub fn enter(inst: &'a Instrumentation, method: &Method) -> Self {
        let guard = Self {
            inst,
            method: method_label(method),
            started: Instant::now(),
        };
        if let Err(e) = inst.metrics.in_progress.add_delta(&guard.labels(), 1) {
            tracing::warn!(error = %e, path = inst.path, "in-flight increment failed");
        }
        guard
    }

    fn labels(&self) -> [(&'static str, &'static str); 2] {
        [(LABEL_PATH, self.inst.path), (LABEL_METHOD, self.method)]
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        let inst = self.inst;
        let labels = self.labels();

        let m = &inst.metrics;
        let results = [
            m.in_progress.dec(&labels),
            m.latency.observe_duration(&labels, elapsed),
            m.requests.inc(&labels),
        ];
        for r in results {
            if let Err(e) = r {
                tracing::warn!(error = %e, path = inst.path, method = self.method, "request metrics update failed");
            }
        }

        tracing::debug!(
            path = inst.path,
            method = self.method,
            elapsed_us = elapsed.as_micros() as u64,
            "request finished"
        );
    }
}

fn method_label(method: &Method) -> &'static str {
    match method.as_str() {
        "GET" => "get",
        "POST" => "post",
        "PUT" => "put",
        "PATCH" => "patch",
        "DELETE" => "delete",
        "HEAD" => "head",
        "OPTIONS" => "options",
        _ => "other",
    }
}
