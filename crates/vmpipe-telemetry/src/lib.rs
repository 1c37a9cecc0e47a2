//! # VM-Pipe Telemetry
//!
//! Logging and metrics for processes using the VM pipe transport.
//!
//! ## Components
//!
//! - **Logs**: `tracing-subscriber` with an `EnvFilter`, pretty or JSON
//! - **Metrics**: Prometheus counters and gauges fed by [`MetricsListener`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vmpipe_telemetry::{init_telemetry, MetricsListener, TelemetryConfig};
//!
//! let _guard = init_telemetry(TelemetryConfig::from_env())?;
//! acceptor.add_listener(Arc::new(MetricsListener::new()));
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `VMPIPE_SERVICE_NAME` | `vmpipe` | Service name in the startup log |
//! | `VMPIPE_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `VMPIPE_JSON_LOGS` | `false` | JSON output |
//! | `VMPIPE_ANSI` | `true` | Colour the pretty output |

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod listener;
mod logging;
mod metrics;

pub use config::TelemetryConfig;
pub use listener::MetricsListener;
pub use logging::{build_subscriber, env_filter, init_logging, LoggingGuard};
pub use metrics::{
    encode_registry, gather_metrics, register_metrics, AcceptorMetrics, MetricsHandle,
    ACCEPTOR_METRICS, REGISTRY,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics and install the global log subscriber.
///
/// Hold the returned guard for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = register_metrics()?;
    let logging = init_logging(&config)?;

    Ok(TelemetryGuard {
        _logging: logging,
        metrics,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _logging: LoggingGuard,
    metrics: MetricsHandle,
}

impl TelemetryGuard {
    /// Handle to the registered metrics.
    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}
