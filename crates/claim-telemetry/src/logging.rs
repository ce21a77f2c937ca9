//! Structured logging.
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and either a
//! human readable or a JSON `fmt` layer. Every line carries the service name.

use crate::{TelemetryConfig, TelemetryError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the level filter, preferring `RUST_LOG` directives when present.
pub fn build_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| TelemetryError::Config(e.to_string()))
}

/// Install the global subscriber.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = build_filter(config)?;

    if !config.console_output {
        return tracing_subscriber::registry()
            .with(env_filter)
            .try_init()
            .map_err(|e| TelemetryError::LoggerInit(e.to_string()));
    }

    if config.json_logs {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggerInit(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggerInit(e.to_string()))?;
    }

    tracing::info!(
        service = %config.service_name,
        json = config.json_logs,
        "Structured logging initialized"
    );
    Ok(())
}

/// Log a claim-related event with standard fields.
///
/// ```rust,ignore
/// log_claim_event!(info, "http", "claim served", code, status = 200);
/// ```
#[macro_export]
macro_rules! log_claim_event {
    ($level:ident, $subsystem:expr, $msg:expr, $code:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            subsystem = $subsystem,
            code = %$code,
            $($($field)*,)?
            $msg
        )
    };
}
