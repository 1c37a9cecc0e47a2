//! Bind, unbind and dispose.
//!
//! Every transition runs under the lifecycle lock and yields the event to
//! publish; listeners are notified only after the lock is released.

use std::sync::Weak;
use tracing::{debug, info, warn};

use super::VmPipeAcceptor;
use crate::domain::{AcceptorError, AcceptorState, BoundEndpoint, VmPipeAddress};
use crate::ports::inbound::SessionAcceptor;
use crate::ports::outbound::ServiceEvent;

impl VmPipeAcceptor {
    /// Register the configured addresses.
    ///
    /// An empty configuration binds a single wildcard. On success the
    /// resolved addresses are returned in request order and every listener
    /// receives `service_activated`. On failure nothing is registered and
    /// the acceptor stays unbound.
    ///
    /// # Errors
    /// - `AlreadyBound` if already bound
    /// - `Disposed` after disposal
    /// - `Bind(_)` if the registry rejects the batch
    pub fn bind(&self) -> Result<Vec<VmPipeAddress>, AcceptorError> {
        let event = {
            let _lifecycle = self.lifecycle.lock();
            self.bind_locked()?
        };
        self.listeners.fire_service_activated(&event);
        Ok(event.addresses)
    }

    /// Replace the configured addresses and bind them.
    ///
    /// If the bind fails the previously configured addresses are restored.
    pub fn bind_addresses(
        &self,
        addresses: &[VmPipeAddress],
    ) -> Result<Vec<VmPipeAddress>, AcceptorError> {
        let event = {
            let _lifecycle = self.lifecycle.lock();
            let previous = self.requested_addresses();
            self.set_local_addresses(addresses)?;
            match self.bind_locked() {
                Ok(event) => event,
                Err(err) => {
                    self.inner.write().requested = previous;
                    return Err(err);
                }
            }
        };
        self.listeners.fire_service_activated(&event);
        Ok(event.addresses)
    }

    /// Remove every bound address and notify `service_deactivated`.
    ///
    /// A no-op when not bound.
    ///
    /// # Errors
    /// `Disposed` after disposal.
    pub fn unbind(&self) -> Result<(), AcceptorError> {
        let event = {
            let _lifecycle = self.lifecycle.lock();
            self.unbind_locked()?
        };
        if let Some(event) = event {
            self.listeners.fire_service_deactivated(&event);
        }
        Ok(())
    }

    /// Unbind if bound, then enter the terminal state.
    ///
    /// Listeners observe the deactivation after the acceptor is already
    /// disposed, so they cannot bind it again.
    ///
    /// # Errors
    /// `Disposed` if already disposed.
    pub fn dispose(&self) -> Result<(), AcceptorError> {
        let event = {
            let _lifecycle = self.lifecycle.lock();
            let event = self.unbind_locked()?;
            self.inner.write().state = AcceptorState::Disposed;
            info!(service_id = %self.service_id, "[vmpipe] Acceptor disposed");
            event
        };
        if let Some(event) = event {
            self.listeners.fire_service_deactivated(&event);
        }
        Ok(())
    }

    /// Register the requested addresses. Caller holds the lifecycle lock.
    fn bind_locked(&self) -> Result<ServiceEvent, AcceptorError> {
        let (requested, session_config) = {
            let mut inner = self.inner.write();
            self.ensure_unbound(inner.state)?;
            if inner.requested.is_empty() {
                inner.requested = vec![VmPipeAddress::ANY];
            }
            inner.state = AcceptorState::Binding;
            (inner.requested.clone(), inner.session_config.clone())
        };

        let acceptor: Weak<dyn SessionAcceptor> = self.self_ref.clone();
        let result = self.registry.try_bind(&requested, |address| {
            BoundEndpoint::new(
                address,
                self.service_id,
                acceptor.clone(),
                self.handler.clone(),
                self.listeners.clone(),
                session_config.clone(),
            )
        });

        let resolved = match result {
            Ok(resolved) => resolved,
            Err(err) => {
                self.inner.write().state = AcceptorState::Unbound;
                warn!(
                    service_id = %self.service_id,
                    error = %err,
                    "[vmpipe] Bind failed"
                );
                return Err(err.into());
            }
        };

        {
            let mut inner = self.inner.write();
            inner.state = AcceptorState::Bound;
            inner.resolved = resolved.clone();
        }
        info!(
            service_id = %self.service_id,
            addresses = ?resolved,
            "[vmpipe] Acceptor bound"
        );

        Ok(ServiceEvent {
            service_id: self.service_id,
            addresses: resolved,
        })
    }

    /// Drop the resolved addresses from the registry. Returns the
    /// deactivation to publish, or `None` if nothing was bound. Caller holds
    /// the lifecycle lock.
    fn unbind_locked(&self) -> Result<Option<ServiceEvent>, AcceptorError> {
        let resolved = {
            let mut inner = self.inner.write();
            match inner.state {
                AcceptorState::Disposed => return Err(AcceptorError::Disposed(self.service_id)),
                AcceptorState::Bound => {}
                AcceptorState::Unbound | AcceptorState::Binding | AcceptorState::Unbinding => {
                    return Ok(None)
                }
            }
            inner.state = AcceptorState::Unbinding;
            inner.resolved.clone()
        };

        let removed = self.registry.unbind_all(&resolved);
        {
            let mut inner = self.inner.write();
            inner.state = AcceptorState::Unbound;
            inner.resolved.clear();
        }
        info!(
            service_id = %self.service_id,
            removed = removed,
            "[vmpipe] Acceptor unbound"
        );

        Ok(Some(ServiceEvent {
            service_id: self.service_id,
            addresses: resolved,
        }))
    }
}

impl Drop for VmPipeAcceptor {
    fn drop(&mut self) {
        let resolved = std::mem::take(&mut self.inner.get_mut().resolved);
        if resolved.is_empty() {
            return;
        }
        let removed = self.registry.unbind_all(&resolved);
        debug!(
            service_id = %self.service_id,
            removed = removed,
            "Bound acceptor dropped, addresses released"
        );

        self.listeners.fire_service_deactivated(&ServiceEvent {
            service_id: self.service_id,
            addresses: resolved,
        });
    }
}
