//! Test utilities for the VM-pipe acceptor.
//!
//! In-memory handlers, listeners and a minimal connector so acceptors can be
//! exercised without a session layer. Enable with the `test-utils` feature
//! flag.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use vmpipe_acceptor::test_utils::{LoopbackConnector, NoopHandler};
//! use vmpipe_acceptor::{AddressRegistry, PipeSession, VmPipeAcceptor, VmPipeAddress};
//!
//! let registry = Arc::new(AddressRegistry::new());
//! let acceptor = VmPipeAcceptor::with_registry(registry.clone(), Arc::new(NoopHandler));
//! acceptor.bind_addresses(&[VmPipeAddress::new(5000)]).unwrap();
//!
//! let connector = LoopbackConnector::new(registry);
//! let mut ready = connector.connect(VmPipeAddress::new(5000)).unwrap();
//! let session = ready.try_recv().unwrap();
//! assert_eq!(session.local_address(), VmPipeAddress::new(5000));
//! ```

use parking_lot::Mutex;
use std::sync::atomic::{AtomicI32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::domain::{AcceptorError, AddressRegistry, ServiceId, SessionConfig, VmPipeAddress};
use crate::ports::outbound::{
    session_ready_channel, ConnectFuture, PipeSession, ServiceEvent, ServiceListener,
    SessionHandler,
};

/// Handler that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl SessionHandler for NoopHandler {}

/// Handler counting `session_created` calls.
#[derive(Debug, Default)]
pub struct CountingHandler {
    created: AtomicUsize,
}

impl CountingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions created so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl SessionHandler for CountingHandler {
    fn session_created(&self, _session: &dyn PipeSession) {
        self.created.fetch_add(1, Ordering::SeqCst);
    }
}

/// One recorded listener callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerEvent {
    Activated(ServiceId, Vec<VmPipeAddress>),
    Deactivated(ServiceId, Vec<VmPipeAddress>),
    SessionCreated(ServiceId, u64),
}

/// Listener that records every callback in order.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<ListenerEvent>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded events, oldest first.
    pub fn events(&self) -> Vec<ListenerEvent> {
        self.events.lock().clone()
    }

    /// Forget recorded events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl ServiceListener for RecordingListener {
    fn service_activated(&self, event: &ServiceEvent) {
        self.events.lock().push(ListenerEvent::Activated(
            event.service_id,
            event.addresses.clone(),
        ));
    }

    fn service_deactivated(&self, event: &ServiceEvent) {
        self.events.lock().push(ListenerEvent::Deactivated(
            event.service_id,
            event.addresses.clone(),
        ));
    }

    fn session_created(&self, service_id: ServiceId, session: &dyn PipeSession) {
        self.events
            .lock()
            .push(ListenerEvent::SessionCreated(service_id, session.id()));
    }
}

/// In-memory session recording what the acceptor did to it.
pub struct LoopbackSession {
    id: u64,
    local: VmPipeAddress,
    remote: VmPipeAddress,
    handler: Mutex<Option<Arc<dyn SessionHandler>>>,
    config: Mutex<Option<SessionConfig>>,
}

impl LoopbackSession {
    pub fn new(id: u64, local: VmPipeAddress, remote: VmPipeAddress) -> Self {
        Self {
            id,
            local,
            remote,
            handler: Mutex::new(None),
            config: Mutex::new(None),
        }
    }

    /// Whether a handler has been attached.
    pub fn has_handler(&self) -> bool {
        self.handler.lock().is_some()
    }

    /// Settings applied by the acceptor, if any.
    pub fn applied_config(&self) -> Option<SessionConfig> {
        self.config.lock().clone()
    }
}

impl PipeSession for LoopbackSession {
    fn id(&self) -> u64 {
        self.id
    }

    fn local_address(&self) -> VmPipeAddress {
        self.local
    }

    fn remote_address(&self) -> VmPipeAddress {
        self.remote
    }

    fn set_handler(&self, handler: Arc<dyn SessionHandler>) {
        *self.handler.lock() = Some(handler);
    }

    fn apply_config(&self, config: &SessionConfig) {
        *self.config.lock() = Some(config.clone());
    }
}

impl std::fmt::Debug for LoopbackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackSession")
            .field("id", &self.id)
            .field("local", &self.local)
            .field("remote", &self.remote)
            .field("has_handler", &self.has_handler())
            .finish()
    }
}

/// Errors from [`LoopbackConnector::connect`].
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("nothing bound at {0}")]
    NotBound(VmPipeAddress),

    #[error("acceptor behind {0} is gone")]
    AcceptorGone(VmPipeAddress),

    #[error(transparent)]
    Acceptor(#[from] AcceptorError),
}

/// Minimal connector: looks up an address and hands the acceptor a
/// [`LoopbackSession`].
///
/// Remote addresses are anonymous negative ports counting down from `vm:-1`.
#[derive(Debug)]
pub struct LoopbackConnector {
    registry: Arc<AddressRegistry>,
    next_remote_port: AtomicI32,
    next_session_id: AtomicU64,
}

impl LoopbackConnector {
    pub fn new(registry: Arc<AddressRegistry>) -> Self {
        Self {
            registry,
            next_remote_port: AtomicI32::new(-1),
            next_session_id: AtomicU64::new(1),
        }
    }

    /// Connect to `address` and return the future resolving to the session.
    pub fn connect(&self, address: VmPipeAddress) -> Result<ConnectFuture, ConnectError> {
        self.connect_session(address).map(|(_, future)| future)
    }

    /// Like [`connect`](Self::connect), also returning the concrete session.
    pub fn connect_session(
        &self,
        address: VmPipeAddress,
    ) -> Result<(Arc<LoopbackSession>, ConnectFuture), ConnectError> {
        let endpoint = self
            .registry
            .lookup(address)
            .ok_or(ConnectError::NotBound(address))?;
        let acceptor = endpoint
            .acceptor()
            .ok_or(ConnectError::AcceptorGone(address))?;

        let remote = VmPipeAddress::new(self.next_remote_port.fetch_sub(1, Ordering::SeqCst));
        let id = self.next_session_id.fetch_add(1, Ordering::SeqCst);
        let session = Arc::new(LoopbackSession::new(id, address, remote));

        let (ready, future) = session_ready_channel();
        acceptor.finish_session_initialization(session.clone(), ready)?;
        Ok((session, future))
    }
}
