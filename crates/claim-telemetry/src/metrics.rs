//! Prometheus metrics for the claim service.
//!
//! All metrics follow the naming convention: `claim_<area>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

use crate::TelemetryError;

const LATENCY_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Claim requests by outcome (minted, replayed, in_progress, rejected, not_found, failed, timeout)
    pub static ref CLAIMS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("claim_requests_total", "Claim requests by outcome"),
        &["outcome"]
    ).expect("metric creation failed");

    /// End-to-end claim latency
    pub static ref CLAIM_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new("claim_request_duration_seconds", "Time spent serving a claim")
            .buckets(LATENCY_BUCKETS.to_vec())
    ).expect("metric creation failed");

    /// Reconciliations of earlier submissions by decision
    pub static ref RECONCILIATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("claim_reconciliations_total", "Startup reconciliations by result"),
        &["result"]
    ).expect("metric creation failed");

    /// HTTP responses by route and status
    pub static ref HTTP_RESPONSES: IntCounterVec = IntCounterVec::new(
        Opts::new("claim_http_responses_total", "HTTP responses by route and status"),
        &["route", "status"]
    ).expect("metric creation failed");

    /// HTTP latency by route
    pub static ref HTTP_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new("claim_http_duration_seconds", "HTTP handler latency")
            .buckets(LATENCY_BUCKETS.to_vec()),
        &["route"]
    ).expect("metric creation failed");

    /// Codes written by the last provisioning run
    pub static ref CODES_PROVISIONED: IntGauge = IntGauge::new(
        "claim_codes_provisioned",
        "Codes inserted by the last provisioning run"
    ).expect("metric creation failed");
}

/// Register every metric with [`REGISTRY`]. Safe to call more than once.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(CLAIMS_TOTAL.clone()),
        Box::new(CLAIM_DURATION.clone()),
        Box::new(RECONCILIATIONS_TOTAL.clone()),
        Box::new(HTTP_RESPONSES.clone()),
        Box::new(HTTP_DURATION.clone()),
        Box::new(CODES_PROVISIONED.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
