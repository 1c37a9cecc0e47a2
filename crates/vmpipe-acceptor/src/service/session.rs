//! Session handoff from a connector to the acceptor.

use std::sync::Arc;
use tracing::debug;

use super::VmPipeAcceptor;
use crate::domain::{AcceptorError, ServiceId, VmPipeAddress};
use crate::ports::inbound::SessionAcceptor;
use crate::ports::outbound::{PipeSession, SessionReady};

impl SessionAcceptor for VmPipeAcceptor {
    fn service_id(&self) -> ServiceId {
        self.service_id
    }

    /// Configure the session, attach the handler, notify `session_created`
    /// on the handler and every listener, then fulfil `ready`.
    ///
    /// A connector that stopped waiting is not an error; the session is
    /// still fully initialized.
    fn finish_session_initialization(
        &self,
        session: Arc<dyn PipeSession>,
        ready: SessionReady,
    ) -> Result<(), AcceptorError> {
        if self.is_disposed() {
            return Err(AcceptorError::Disposed(self.service_id));
        }

        session.apply_config(&self.session_config());
        session.set_handler(self.handler.clone());
        self.handler.session_created(session.as_ref());
        self.listeners
            .fire_session_created(self.service_id, session.as_ref());

        debug!(
            service_id = %self.service_id,
            session_id = session.id(),
            local = %session.local_address(),
            remote = %session.remote_address(),
            "Session initialized"
        );

        if ready.send(session).is_err() {
            debug!(
                service_id = %self.service_id,
                "Connector stopped waiting before the session was ready"
            );
        }
        Ok(())
    }

    fn new_session(
        &self,
        _remote: VmPipeAddress,
        _local: VmPipeAddress,
    ) -> Result<Arc<dyn PipeSession>, AcceptorError> {
        Err(AcceptorError::Unsupported(
            "an acceptor cannot originate sessions",
        ))
    }
}
