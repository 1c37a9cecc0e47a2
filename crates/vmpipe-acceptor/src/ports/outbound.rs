//! # Driven Ports (Outbound SPI)
//!
//! Interfaces the acceptor requires from its surroundings: the application's
//! session handler, lifecycle listeners, the session layer's session object,
//! and a configuration source.

use crate::domain::{AcceptorConfig, RegistryConfig, ServiceId, SessionConfig, VmPipeAddress};
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;

/// An accepted session as seen by the acceptor.
///
/// The session layer owns the duplex pipe behind it; the acceptor only
/// configures it and attaches the handler during initialization.
pub trait PipeSession: Send + Sync + fmt::Debug {
    /// Session identifier, unique per connector.
    fn id(&self) -> u64;

    /// The bound address the session was accepted on.
    fn local_address(&self) -> VmPipeAddress;

    /// The connector-side address.
    fn remote_address(&self) -> VmPipeAddress;

    /// Attach the handler that will receive this session's events.
    fn set_handler(&self, handler: Arc<dyn SessionHandler>);

    /// Apply acceptor-provided session settings.
    fn apply_config(&self, _config: &SessionConfig) {}
}

/// Application callbacks for sessions accepted on a bound address.
///
/// `session_created` is invoked by the acceptor during initialization; the
/// remaining callbacks belong to the session layer.
pub trait SessionHandler: Send + Sync {
    /// The session was created and the handler attached.
    fn session_created(&self, _session: &dyn PipeSession) {}

    /// The session is open for traffic.
    fn session_opened(&self, _session: &dyn PipeSession) {}

    /// The session was closed by either end.
    fn session_closed(&self, _session: &dyn PipeSession) {}
}

/// Payload of activation and deactivation notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEvent {
    /// The acceptor whose binding changed.
    pub service_id: ServiceId,
    /// The addresses that became (or stopped being) visible.
    pub addresses: Vec<VmPipeAddress>,
}

/// Observer of acceptor lifecycle events.
///
/// Invoked synchronously on the thread performing the lifecycle change,
/// after the registry mutation is complete and with no acceptor lock held.
pub trait ServiceListener: Send + Sync {
    /// The acceptor's addresses are now registered.
    fn service_activated(&self, _event: &ServiceEvent) {}

    /// The acceptor's addresses were removed from the registry.
    fn service_deactivated(&self, _event: &ServiceEvent) {}

    /// A session was accepted and initialized.
    fn session_created(&self, _service_id: ServiceId, _session: &dyn PipeSession) {}
}

/// Completion signal fulfilled once the accepted session is ready.
pub type SessionReady = oneshot::Sender<Arc<dyn PipeSession>>;

/// Connector-side half of [`SessionReady`].
pub type ConnectFuture = oneshot::Receiver<Arc<dyn PipeSession>>;

/// Create a linked completion signal and the future awaiting it.
#[must_use]
pub fn session_ready_channel() -> (SessionReady, ConnectFuture) {
    oneshot::channel()
}

/// Source of registry and acceptor settings.
pub trait ConfigProvider: Send + Sync {
    /// Dynamic allocation range for the registry.
    fn registry_config(&self) -> RegistryConfig;

    /// Addresses and session settings for an acceptor.
    fn acceptor_config(&self) -> AcceptorConfig;
}
