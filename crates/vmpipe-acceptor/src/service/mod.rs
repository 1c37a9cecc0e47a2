//! # VM-Pipe Acceptor Service
//!
//! The accept side of the in-process transport. An acceptor registers one or
//! more virtual addresses in an [`AddressRegistry`]; connectors look those
//! addresses up and hand accepted sessions back through
//! [`SessionAcceptor::finish_session_initialization`].
//!
//! ## Architecture
//!
//! This service implements both inbound ports:
//! - [`AcceptorApi`]: bind / unbind / dispose
//! - [`SessionAcceptor`]: session handoff, reached from a `BoundEndpoint`
//!
//! ## Locking
//!
//! ```text
//! lifecycle (Mutex) ──► registry (RwLock)
//!        └─► inner (RwLock, never held across a call out)
//! ```
//!
//! Lifecycle operations serialize on `lifecycle`. No acceptor lock is held
//! while listeners run, so a listener may call back into this acceptor or
//! any other one.

mod lifecycle;
mod session;

#[cfg(test)]
mod tests;

use parking_lot::{Mutex, RwLock};
use std::sync::{Arc, Weak};

use crate::domain::{
    AcceptorConfig, AcceptorError, AcceptorState, AddressRegistry, ServiceId, ServiceListeners,
    SessionConfig, VmPipeAddress,
};
use crate::ports::inbound::AcceptorApi;
use crate::ports::outbound::{ServiceListener, SessionHandler};

/// Mutable acceptor state, guarded by `VmPipeAcceptor::inner`.
#[derive(Debug)]
struct AcceptorInner {
    state: AcceptorState,
    /// Addresses `bind()` will request.
    requested: Vec<VmPipeAddress>,
    /// Addresses actually registered; empty unless bound.
    resolved: Vec<VmPipeAddress>,
    session_config: SessionConfig,
}

/// Acceptor for virtual-pipe sessions.
///
/// Always handled through `Arc`: bound endpoints refer back to their
/// acceptor weakly, so construction returns `Arc<Self>`.
///
/// Dropping a bound acceptor releases its addresses and notifies
/// `service_deactivated`; the acceptor itself is no longer reachable from
/// the listeners at that point.
pub struct VmPipeAcceptor {
    service_id: ServiceId,
    registry: Arc<AddressRegistry>,
    handler: Arc<dyn SessionHandler>,
    listeners: Arc<ServiceListeners>,
    inner: RwLock<AcceptorInner>,
    lifecycle: Mutex<()>,
    self_ref: Weak<VmPipeAcceptor>,
}

impl VmPipeAcceptor {
    /// Create an acceptor on the process-wide default registry.
    pub fn new(handler: Arc<dyn SessionHandler>) -> Arc<Self> {
        Self::with_registry(AddressRegistry::global(), handler)
    }

    /// Create an acceptor on an explicit registry.
    pub fn with_registry(
        registry: Arc<AddressRegistry>,
        handler: Arc<dyn SessionHandler>,
    ) -> Arc<Self> {
        Self::from_config(registry, handler, AcceptorConfig::default())
    }

    /// Create an acceptor with preconfigured addresses and session settings.
    pub fn from_config(
        registry: Arc<AddressRegistry>,
        handler: Arc<dyn SessionHandler>,
        config: AcceptorConfig,
    ) -> Arc<Self> {
        let service_id = registry.next_service_id();
        Arc::new_cyclic(|self_ref| Self {
            service_id,
            registry,
            handler,
            listeners: Arc::new(ServiceListeners::new()),
            inner: RwLock::new(AcceptorInner {
                state: AcceptorState::Unbound,
                requested: config.bind,
                resolved: Vec::new(),
                session_config: config.session,
            }),
            lifecycle: Mutex::new(()),
            self_ref: self_ref.clone(),
        })
    }

    /// Id of this acceptor within its registry.
    #[must_use]
    pub fn service_id(&self) -> ServiceId {
        self.service_id
    }

    /// The registry this acceptor binds into.
    #[must_use]
    pub fn registry(&self) -> &Arc<AddressRegistry> {
        &self.registry
    }

    /// Handler attached to every accepted session.
    #[must_use]
    pub fn handler(&self) -> &Arc<dyn SessionHandler> {
        &self.handler
    }

    /// Lifecycle listeners.
    #[must_use]
    pub fn listeners(&self) -> &Arc<ServiceListeners> {
        &self.listeners
    }

    /// Register a lifecycle listener. Returns `false` if already registered.
    pub fn add_listener(&self, listener: Arc<dyn ServiceListener>) -> bool {
        self.listeners.add(listener)
    }

    /// Unregister a lifecycle listener.
    pub fn remove_listener(&self, listener: &Arc<dyn ServiceListener>) -> bool {
        self.listeners.remove(listener)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> AcceptorState {
        self.inner.read().state
    }

    /// Whether the acceptor's addresses are registered.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.state() == AcceptorState::Bound
    }

    /// Whether the acceptor has been disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.state().is_terminal()
    }

    /// First bound address, else the first requested one.
    #[must_use]
    pub fn local_address(&self) -> Option<VmPipeAddress> {
        let inner = self.inner.read();
        inner
            .resolved
            .first()
            .or_else(|| inner.requested.first())
            .copied()
    }

    /// Bound addresses in request order; empty when unbound.
    #[must_use]
    pub fn local_addresses(&self) -> Vec<VmPipeAddress> {
        self.inner.read().resolved.clone()
    }

    /// Addresses the next `bind()` will request.
    #[must_use]
    pub fn requested_addresses(&self) -> Vec<VmPipeAddress> {
        self.inner.read().requested.clone()
    }

    /// Configure a single address for the next `bind()`.
    pub fn set_local_address(&self, address: VmPipeAddress) -> Result<(), AcceptorError> {
        self.set_local_addresses(&[address])
    }

    /// Configure the addresses for the next `bind()`.
    ///
    /// # Errors
    /// `AlreadyBound` while bound, `Disposed` after disposal.
    pub fn set_local_addresses(&self, addresses: &[VmPipeAddress]) -> Result<(), AcceptorError> {
        let mut inner = self.inner.write();
        self.ensure_unbound(inner.state)?;
        inner.requested = addresses.to_vec();
        Ok(())
    }

    /// Settings applied to accepted sessions.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        self.inner.read().session_config.clone()
    }

    /// Replace the session settings.
    ///
    /// # Errors
    /// `AlreadyBound` while bound, `Disposed` after disposal.
    pub fn set_session_config(&self, config: SessionConfig) -> Result<(), AcceptorError> {
        let mut inner = self.inner.write();
        self.ensure_unbound(inner.state)?;
        inner.session_config = config;
        Ok(())
    }

    fn ensure_unbound(&self, state: AcceptorState) -> Result<(), AcceptorError> {
        match state {
            AcceptorState::Unbound => Ok(()),
            AcceptorState::Disposed => Err(AcceptorError::Disposed(self.service_id)),
            AcceptorState::Binding | AcceptorState::Bound | AcceptorState::Unbinding => {
                Err(AcceptorError::AlreadyBound(self.service_id))
            }
        }
    }
}

impl AcceptorApi for VmPipeAcceptor {
    fn bind(&self) -> Result<Vec<VmPipeAddress>, AcceptorError> {
        VmPipeAcceptor::bind(self)
    }

    fn bind_addresses(
        &self,
        addresses: &[VmPipeAddress],
    ) -> Result<Vec<VmPipeAddress>, AcceptorError> {
        VmPipeAcceptor::bind_addresses(self, addresses)
    }

    fn unbind(&self) -> Result<(), AcceptorError> {
        VmPipeAcceptor::unbind(self)
    }

    fn dispose(&self) -> Result<(), AcceptorError> {
        VmPipeAcceptor::dispose(self)
    }

    fn local_addresses(&self) -> Vec<VmPipeAddress> {
        VmPipeAcceptor::local_addresses(self)
    }

    fn state(&self) -> AcceptorState {
        VmPipeAcceptor::state(self)
    }
}

impl std::fmt::Debug for VmPipeAcceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("VmPipeAcceptor")
            .field("service_id", &self.service_id)
            .field("state", &inner.state)
            .field("resolved", &inner.resolved)
            .finish()
    }
}
