//! Registry record for a bound address.

use super::address::VmPipeAddress;
use super::listeners::ServiceListeners;
use super::value_objects::{ServiceId, SessionConfig};
use crate::ports::inbound::SessionAcceptor;
use crate::ports::outbound::SessionHandler;
use std::fmt;
use std::sync::{Arc, Weak};

/// What a connector finds when it looks up a bound address.
///
/// The owning acceptor is held weakly: the registry never extends an
/// acceptor's lifetime. Endpoints are immutable; rebinding replaces them.
pub struct BoundEndpoint {
    address: VmPipeAddress,
    service_id: ServiceId,
    acceptor: Weak<dyn SessionAcceptor>,
    handler: Arc<dyn SessionHandler>,
    listeners: Arc<ServiceListeners>,
    session_config: SessionConfig,
}

impl BoundEndpoint {
    /// Create an endpoint record.
    pub fn new(
        address: VmPipeAddress,
        service_id: ServiceId,
        acceptor: Weak<dyn SessionAcceptor>,
        handler: Arc<dyn SessionHandler>,
        listeners: Arc<ServiceListeners>,
        session_config: SessionConfig,
    ) -> Self {
        Self {
            address,
            service_id,
            acceptor,
            handler,
            listeners,
            session_config,
        }
    }

    /// The bound address.
    #[must_use]
    pub fn address(&self) -> VmPipeAddress {
        self.address
    }

    /// Id of the owning acceptor.
    #[must_use]
    pub fn service_id(&self) -> ServiceId {
        self.service_id
    }

    /// The owning acceptor, or `None` if it has been dropped.
    #[must_use]
    pub fn acceptor(&self) -> Option<Arc<dyn SessionAcceptor>> {
        self.acceptor.upgrade()
    }

    /// Handler for sessions accepted on this address.
    #[must_use]
    pub fn handler(&self) -> &Arc<dyn SessionHandler> {
        &self.handler
    }

    /// Listeners of the owning acceptor.
    #[must_use]
    pub fn listeners(&self) -> &Arc<ServiceListeners> {
        &self.listeners
    }

    /// Session settings captured at bind time.
    #[must_use]
    pub fn session_config(&self) -> &SessionConfig {
        &self.session_config
    }
}

impl fmt::Debug for BoundEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundEndpoint")
            .field("address", &self.address)
            .field("service_id", &self.service_id)
            .field("acceptor_alive", &(self.acceptor.strong_count() > 0))
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
