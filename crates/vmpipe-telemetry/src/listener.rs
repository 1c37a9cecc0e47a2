//! Acceptor listener feeding the Prometheus metrics.

use vmpipe_acceptor::{PipeSession, ServiceEvent, ServiceId, ServiceListener};

use crate::metrics::{AcceptorMetrics, ACCEPTOR_METRICS};

/// Records lifecycle events in an [`AcceptorMetrics`] set.
///
/// Attach one instance to every acceptor that should be counted; the
/// bound-address gauge is shared, so it tracks the total across them.
#[derive(Debug, Clone)]
pub struct MetricsListener {
    metrics: AcceptorMetrics,
}

impl MetricsListener {
    /// Record into the global metric set.
    pub fn new() -> Self {
        Self::with_metrics(ACCEPTOR_METRICS.clone())
    }

    /// Record into a caller-owned metric set.
    pub fn with_metrics(metrics: AcceptorMetrics) -> Self {
        Self { metrics }
    }

    pub fn metrics(&self) -> &AcceptorMetrics {
        &self.metrics
    }
}

impl Default for MetricsListener {
    fn default() -> Self {
        Self::new()
    }
}

fn address_count(event: &ServiceEvent) -> i64 {
    i64::try_from(event.addresses.len()).unwrap_or(i64::MAX)
}

impl ServiceListener for MetricsListener {
    fn service_activated(&self, event: &ServiceEvent) {
        self.metrics.activations.inc();
        self.metrics.bound_addresses.add(address_count(event));
    }

    fn service_deactivated(&self, event: &ServiceEvent) {
        self.metrics.deactivations.inc();
        self.metrics.bound_addresses.sub(address_count(event));
    }

    fn session_created(&self, _service_id: ServiceId, _session: &dyn PipeSession) {
        self.metrics.sessions_accepted.inc();
    }
}
