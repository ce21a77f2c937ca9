//! # Claim Telemetry
//!
//! Structured logging and Prometheus metrics for the claim service.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use claim_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CLAIM_SERVICE_NAME` | `claim-node` | Service name in logs |
//! | `CLAIM_LOG_LEVEL` | `info` | Log level filter |
//! | `CLAIM_LOG_JSON` | `false` | JSON log lines |
//! | `CLAIM_CONSOLE_OUTPUT` | `true` | Write logs to stdout |

#![warn(missing_docs)]

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{build_filter, init_logging};
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, CLAIMS_TOTAL, CLAIM_DURATION,
    CODES_PROVISIONED, HTTP_DURATION, HTTP_RESPONSES, RECONCILIATIONS_TOTAL,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The global subscriber could not be installed
    #[error("Failed to initialize logger: {0}")]
    LoggerInit(String),

    /// Metric registration or export failed
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    /// Invalid filter or setting
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that should be held for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    register_metrics()?;
    init_logging(&config)?;
    Ok(TelemetryGuard {
        service_name: config.service_name,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    service_name: String,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry...");
    }
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
