//! Prometheus metrics for the VM pipe transport.
//!
//! All metrics follow the naming convention: `vmpipe_<metric>[_total]`
//!
//! - `vmpipe_bound_addresses` (gauge): addresses currently registered
//! - `vmpipe_acceptor_activations_total` (counter): successful binds
//! - `vmpipe_acceptor_deactivations_total` (counter): unbinds, including dispose
//! - `vmpipe_sessions_accepted_total` (counter): sessions handed to a handler

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Acceptor metrics recorded by the default `MetricsListener`
    pub static ref ACCEPTOR_METRICS: AcceptorMetrics =
        AcceptorMetrics::new().expect("metric creation failed");
}

/// The acceptor metric set.
///
/// Cheap to clone: prometheus metrics are shared handles.
#[derive(Debug, Clone)]
pub struct AcceptorMetrics {
    pub bound_addresses: IntGauge,
    pub activations: IntCounter,
    pub deactivations: IntCounter,
    pub sessions_accepted: IntCounter,
}

impl AcceptorMetrics {
    /// Create an unregistered metric set.
    pub fn new() -> Result<Self, TelemetryError> {
        let init = |e: prometheus::Error| TelemetryError::MetricsInit(e.to_string());
        Ok(Self {
            bound_addresses: IntGauge::new(
                "vmpipe_bound_addresses",
                "Virtual addresses currently bound",
            )
            .map_err(init)?,
            activations: IntCounter::new(
                "vmpipe_acceptor_activations_total",
                "Successful acceptor binds",
            )
            .map_err(init)?,
            deactivations: IntCounter::new(
                "vmpipe_acceptor_deactivations_total",
                "Acceptor unbinds",
            )
            .map_err(init)?,
            sessions_accepted: IntCounter::new(
                "vmpipe_sessions_accepted_total",
                "Sessions handed to an acceptor's handler",
            )
            .map_err(init)?,
        })
    }

    /// Register every metric in `registry`.
    ///
    /// Metrics already present in `registry` are left as they are.
    pub fn register(&self, registry: &Registry) -> Result<(), TelemetryError> {
        let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(self.bound_addresses.clone()),
            Box::new(self.activations.clone()),
            Box::new(self.deactivations.clone()),
            Box::new(self.sessions_accepted.clone()),
        ];

        for metric in metrics {
            match registry.register(metric) {
                Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
                Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
            }
        }
        Ok(())
    }
}

/// Handle proving the global metrics are registered.
#[derive(Debug, Clone)]
pub struct MetricsHandle {
    registry: Arc<Registry>,
}

impl MetricsHandle {
    /// The registry the metrics live in.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// Register the global acceptor metrics in [`REGISTRY`]. Idempotent.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    ACCEPTOR_METRICS.register(&REGISTRY)?;
    Ok(MetricsHandle {
        registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode `registry` in the Prometheus text format.
pub fn encode_registry(registry: &Registry) -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Encode the global registry in the Prometheus text format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    encode_registry(&REGISTRY)
}
