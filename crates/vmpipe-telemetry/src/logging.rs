//! Structured logging setup.
//!
//! One `tracing-subscriber` registry with an `EnvFilter` and a single `fmt`
//! layer, pretty for development or JSON for log shippers. JSON lines carry
//! `timestamp`, `level`, `target` and a `fields` object holding `message`
//! plus the structured fields (`service_id`, `address`, ...).

use tracing::Subscriber;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{TelemetryConfig, TelemetryError};

/// Handle returned by [`init_logging`].
///
/// The global subscriber stays installed for the rest of the process; the
/// guard only records which service installed it.
#[derive(Debug)]
pub struct LoggingGuard {
    service_name: String,
}

impl LoggingGuard {
    /// Name of the service that installed the subscriber.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

/// Build the filter from the configured directive.
pub fn env_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Config(format!("log level {:?}: {}", config.log_level, e)))
}

/// Build a subscriber writing to `writer` without installing it.
///
/// Useful with `tracing::subscriber::with_default` when output has to be
/// captured.
pub fn build_subscriber<W>(
    config: &TelemetryConfig,
    writer: W,
) -> Result<impl Subscriber + Send + Sync + 'static, TelemetryError>
where
    W: for<'w> MakeWriter<'w> + Clone + Send + Sync + 'static,
{
    let filter = env_filter(config)?;

    let json_layer = config.json_logs.then(|| {
        fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(writer.clone())
    });

    let pretty_layer = (!config.json_logs).then(|| {
        fmt::layer()
            .with_target(true)
            .with_ansi(config.ansi)
            .with_writer(writer)
    });

    Ok(tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(pretty_layer))
}

/// Install the global subscriber writing to stdout.
///
/// # Errors
///
/// `TelemetryError::LoggingInit` if a global subscriber is already set,
/// `TelemetryError::Config` if the log level does not parse.
pub fn init_logging(config: &TelemetryConfig) -> Result<LoggingGuard, TelemetryError> {
    build_subscriber(config, std::io::stdout)?
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    tracing::info!(
        service = %config.service_name,
        log_level = %config.log_level,
        json_logs = config.json_logs,
        "Logging initialized"
    );

    Ok(LoggingGuard {
        service_name: config.service_name.clone(),
    })
}
