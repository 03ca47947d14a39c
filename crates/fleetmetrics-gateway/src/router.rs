//! Axum router wiring.
//!
//! Business routes come from an explicit table of `(method, template,
//! handler)`. Each entry is wrapped with the instrumentation middleware for
//! its own template before the server starts, then entries sharing a
//! template are merged into one axum route. Ops endpoints are mounted
//! outside that set so scrapes and probes are not counted as traffic.

use std::collections::BTreeMap;

use axum::{
    http::Method,
    middleware,
    routing::{delete, get, patch, post, MethodRouter},
    Router,
};

use crate::{
    app_state::AppState,
    obs::{instrument, Instrumentation},
    ops, services,
};

pub struct RouteSpec {
    pub method: Method,
    /// Declared path template, `{param}` style. Also the `path` label.
    /// The `method` label comes from the request, since a `GET` route also
    /// answers `HEAD`.
    pub template: &'static str,
    pub handler: MethodRouter<AppState>,
}

impl RouteSpec {
    pub fn new(method: Method, template: &'static str, handler: MethodRouter<AppState>) -> Self {
        Self {
            method,
            template,
            handler,
        }
    }
}

pub fn route_table() -> Vec<RouteSpec> {
    vec![
        RouteSpec::new(Method::GET, "/cars", get(services::cars::list)),
        RouteSpec::new(Method::GET, "/cars/{id}", get(services::cars::get)),
        RouteSpec::new(Method::POST, "/cars", post(services::cars::create)),
        RouteSpec::new(Method::PATCH, "/cars/{id}", patch(services::cars::update)),
        RouteSpec::new(Method::DELETE, "/cars/{id}", delete(services::cars::delete)),
        RouteSpec::new(Method::GET, "/boats", get(services::boats::list)),
        RouteSpec::new(Method::POST, "/boats", post(services::boats::create)),
    ]
}

pub fn build_router(state: AppState) -> Router {
    build_router_with(state, route_table())
}

/// Build the router from an arbitrary route table.
pub fn build_router_with(state: AppState, routes: Vec<RouteSpec>) -> Router {
    let mut by_template: BTreeMap<&'static str, MethodRouter<AppState>> = BTreeMap::new();

    for r in routes {
        tracing::debug!(template = r.template, method = %r.method, "route registered");
        let inst = Instrumentation::new(state.metrics().clone(), r.template);
        // route_layer: unmatched methods (405) fall through uninstrumented.
        let layered = r
            .handler
            .route_layer(middleware::from_fn_with_state(inst, instrument));

        let merged = match by_template.remove(r.template) {
            Some(existing) => existing.merge(layered),
            None => layered,
        };
        by_template.insert(r.template, merged);
    }

    let mut app = Router::new();
    for (template, method_router) in by_template {
        app = app.route(&axum_path(template), method_router);
    }

    app.route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .with_state(state)
}

/// `/cars/{id}` -> `/cars/:id`
fn axum_path(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        match rest[open..].find('}') {
            Some(close) => {
                out.push(':');
                out.push_str(&rest[open + 1..open + close]);
                rest = &rest[open + close + 1..];
            }
            None => {
                rest = &rest[open..];
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_to_axum_syntax() {
        assert_eq!(axum_path("/cars"), "/cars");
        assert_eq!(axum_path("/cars/{id}"), "/cars/:id");
        assert_eq!(axum_path("/a/{x}/b/{y}"), "/a/:x/b/:y");
    }

    #[test]
    fn table_covers_business_routes() {
        let table = route_table();
        let pairs: Vec<(String, &str)> = table
            .iter()
            .map(|r| (r.method.to_string(), r.template))
            .collect();
        assert_eq!(pairs.len(), 7);
        assert!(pairs.contains(&("PATCH".to_string(), "/cars/{id}")));
        assert!(pairs.contains(&("POST".to_string(), "/boats")));
        assert!(!pairs.iter().any(|(_, t)| *t == "/metrics"));
    }
}
