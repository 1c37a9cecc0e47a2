//! Listener that reports lifecycle events through `tracing`.

use crate::domain::ServiceId;
use crate::ports::outbound::{PipeSession, ServiceEvent, ServiceListener};
use tracing::{debug, info};

/// Logs activation and deactivation at `info`, session creation at `debug`.
///
/// The `label` field is attached to every event so several acceptors can be
/// told apart in one log stream.
#[derive(Debug, Clone)]
pub struct LoggingListener {
    label: String,
}

impl LoggingListener {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Default for LoggingListener {
    fn default() -> Self {
        Self::new("vmpipe")
    }
}

impl ServiceListener for LoggingListener {
    fn service_activated(&self, event: &ServiceEvent) {
        info!(
            label = %self.label,
            service_id = %event.service_id,
            addresses = ?event.addresses,
            "Service activated"
        );
    }

    fn service_deactivated(&self, event: &ServiceEvent) {
        info!(
            label = %self.label,
            service_id = %event.service_id,
            addresses = ?event.addresses,
            "Service deactivated"
        );
    }

    fn session_created(&self, service_id: ServiceId, session: &dyn PipeSession) {
        debug!(
            label = %self.label,
            service_id = %service_id,
            session_id = session.id(),
            local = %session.local_address(),
            remote = %session.remote_address(),
            "Session created"
        );
    }
}
