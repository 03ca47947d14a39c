use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;
use fleetmetrics_core::error::{FleetError, Result};
use fleetmetrics_core::metrics::validate_buckets;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub metrics: MetricsSection,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            metrics: MetricsSection::default(),
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(FleetError::UnsupportedVersion);
        }

        self.server.validate()?;
        self.metrics.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr().map(|_| ())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            FleetError::BadRequest(format!(
                "server.listen must be a valid socket address ({}): {e}",
                self.listen
            ))
        })
    }
}

fn default_listen() -> String {
    "0.0.0.0:5001".into()
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Upper bounds for the request latency histogram, in seconds.
    #[serde(default)]
    pub latency_buckets_seconds: Option<Vec<f64>>,
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        self.latency_buckets().map(|_| ())
    }

    /// Configured latency buckets, or `None` for the registry defaults.
    pub fn latency_buckets(&self) -> Result<Option<Vec<Duration>>> {
        let Some(secs) = &self.latency_buckets_seconds else {
            return Ok(None);
        };
        if secs.is_empty() {
            return Err(FleetError::BadRequest(
                "metrics.latency_buckets_seconds must not be empty".into(),
            ));
        }

        // Histogram bounds are whole microseconds; reject anything finer
        // rather than letting registration round it.
        let mut out: Vec<Duration> = Vec::with_capacity(secs.len());
        for &s in secs {
            if !s.is_finite() || s <= 0.0 {
                return Err(FleetError::BadRequest(format!(
                    "metrics.latency_buckets_seconds: {s} is not a positive number"
                )));
            }
            let micros = s * 1_000_000.0;
            let whole = micros.round();
            if (micros - whole).abs() > 1e-3 || whole < 1.0 {
                return Err(FleetError::BadRequest(format!(
                    "metrics.latency_buckets_seconds: {s} is not a whole number of microseconds"
                )));
            }
            if whole >= u64::MAX as f64 {
                return Err(FleetError::BadRequest(format!(
                    "metrics.latency_buckets_seconds: {s} is too large"
                )));
            }
            out.push(Duration::from_micros(whole as u64));
        }

        validate_buckets(&out).map_err(|e| {
            FleetError::BadRequest(format!("metrics.latency_buckets_seconds: {e}"))
        })?;
        Ok(Some(out))
    }
}
