//! Ordered listener set shared by an acceptor and its bound endpoints.

use crate::domain::ServiceId;
use crate::ports::outbound::{PipeSession, ServiceEvent, ServiceListener};
use parking_lot::RwLock;
use std::sync::Arc;

/// Ordered set of lifecycle listeners.
///
/// Insertion order is preserved and the same listener (by pointer identity)
/// is only stored once. Notifications iterate over a snapshot, so a listener
/// may add or remove listeners from inside a callback.
#[derive(Default)]
pub struct ServiceListeners {
    listeners: RwLock<Vec<Arc<dyn ServiceListener>>>,
}

impl ServiceListeners {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener. Returns `false` if it was already present.
    pub fn add(&self, listener: Arc<dyn ServiceListener>) -> bool {
        let mut listeners = self.listeners.write();
        if listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            return false;
        }
        listeners.push(listener);
        true
    }

    /// Remove a listener. Returns `false` if it was not present.
    pub fn remove(&self, listener: &Arc<dyn ServiceListener>) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
        listeners.len() != before
    }

    /// Drop every listener.
    pub fn clear(&self) {
        self.listeners.write().clear();
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Whether no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    fn snapshot(&self) -> Vec<Arc<dyn ServiceListener>> {
        self.listeners.read().clone()
    }

    /// Notify every listener that a service was activated.
    pub fn fire_service_activated(&self, event: &ServiceEvent) {
        for listener in self.snapshot() {
            listener.service_activated(event);
        }
    }

    /// Notify every listener that a service was deactivated.
    pub fn fire_service_deactivated(&self, event: &ServiceEvent) {
        for listener in self.snapshot() {
            listener.service_deactivated(event);
        }
    }

    /// Notify every listener that a session was created.
    pub fn fire_session_created(&self, service_id: ServiceId, session: &dyn PipeSession) {
        for listener in self.snapshot() {
            listener.session_created(service_id, session);
        }
    }
}

impl std::fmt::Debug for ServiceListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceListeners")
            .field("len", &self.len())
            .finish()
    }
}
