//! Inbound ports (API) for the VM-pipe acceptor.

use crate::domain::{AcceptorError, AcceptorState, ServiceId, VmPipeAddress};
use crate::ports::outbound::{PipeSession, SessionReady};
use std::sync::Arc;

/// Lifecycle API of an acceptor.
pub trait AcceptorApi: Send + Sync {
    /// Bind the configured local addresses.
    ///
    /// # Returns
    /// The resolved addresses, in request order
    fn bind(&self) -> Result<Vec<VmPipeAddress>, AcceptorError>;

    /// Replace the configured addresses and bind them.
    fn bind_addresses(
        &self,
        addresses: &[VmPipeAddress],
    ) -> Result<Vec<VmPipeAddress>, AcceptorError>;

    /// Remove every bound address. No-op when unbound.
    fn unbind(&self) -> Result<(), AcceptorError>;

    /// Unbind if needed and enter the terminal state.
    fn dispose(&self) -> Result<(), AcceptorError>;

    /// Currently bound addresses; empty when unbound.
    fn local_addresses(&self) -> Vec<VmPipeAddress>;

    /// Current lifecycle state.
    fn state(&self) -> AcceptorState;
}

/// Accept-side hooks invoked by a connector.
///
/// Reached through the weak reference stored in each `BoundEndpoint`.
pub trait SessionAcceptor: Send + Sync {
    /// Id of this acceptor.
    fn service_id(&self) -> ServiceId;

    /// Complete setup of a session accepted on one of this acceptor's
    /// addresses and fulfil `ready` with it.
    ///
    /// The signal is consumed, so it can be fulfilled at most once.
    fn finish_session_initialization(
        &self,
        session: Arc<dyn PipeSession>,
        ready: SessionReady,
    ) -> Result<(), AcceptorError>;

    /// Originate a session. Acceptors never do this.
    fn new_session(
        &self,
        remote: VmPipeAddress,
        local: VmPipeAddress,
    ) -> Result<Arc<dyn PipeSession>, AcceptorError>;
}
