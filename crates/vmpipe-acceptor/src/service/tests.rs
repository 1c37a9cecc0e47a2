use super::*;
use crate::domain::{BindError, RegistryConfig};
use crate::ports::inbound::SessionAcceptor;
use crate::ports::outbound::{session_ready_channel, PipeSession, ServiceEvent};
use crate::test_utils::{
    CountingHandler, ListenerEvent, LoopbackConnector, LoopbackSession, NoopHandler,
    RecordingListener,
};
use parking_lot::Mutex;

fn registry() -> Arc<AddressRegistry> {
    Arc::new(AddressRegistry::new())
}

fn acceptor(registry: &Arc<AddressRegistry>) -> Arc<VmPipeAcceptor> {
    VmPipeAcceptor::with_registry(registry.clone(), Arc::new(NoopHandler))
}

fn addrs(ports: &[i32]) -> Vec<VmPipeAddress> {
    ports.iter().copied().map(VmPipeAddress::new).collect()
}

fn recorder(acceptor: &VmPipeAcceptor) -> Arc<RecordingListener> {
    let listener = Arc::new(RecordingListener::new());
    acceptor.add_listener(listener.clone());
    listener
}

// =============================================================================
// Bind
// =============================================================================

#[test]
fn test_bind_without_addresses_uses_wildcard() {
    let registry = registry();
    let acceptor = acceptor(&registry);

    let resolved = acceptor.bind().unwrap();

    assert_eq!(resolved, addrs(&[10000]));
    assert_eq!(acceptor.requested_addresses(), vec![VmPipeAddress::ANY]);
    assert_eq!(acceptor.local_address(), Some(VmPipeAddress::new(10000)));
    assert_eq!(acceptor.state(), AcceptorState::Bound);
    assert!(registry.is_bound(VmPipeAddress::new(10000)));
}

#[test]
fn test_bind_publishes_endpoints_owned_by_acceptor() {
    let registry = registry();
    let acceptor = acceptor(&registry);
    acceptor.bind_addresses(&addrs(&[0, 5000])).unwrap();

    for address in acceptor.local_addresses() {
        let endpoint = registry.lookup(address).unwrap();
        assert_eq!(endpoint.service_id(), acceptor.service_id());
        let owner = endpoint.acceptor().unwrap();
        assert_eq!(owner.service_id(), acceptor.service_id());
        assert!(Arc::ptr_eq(endpoint.listeners(), acceptor.listeners()));
    }
}

#[test]
fn test_bind_fires_activation_once() {
    let registry = registry();
    let acceptor = acceptor(&registry);
    let listener = recorder(&acceptor);

    acceptor.bind_addresses(&addrs(&[5000, 0])).unwrap();

    assert_eq!(
        listener.events(),
        vec![ListenerEvent::Activated(
            acceptor.service_id(),
            addrs(&[5000, 10000])
        )]
    );
}

#[test]
fn test_bind_twice_is_rejected() {
    let registry = registry();
    let acceptor = acceptor(&registry);
    acceptor.bind().unwrap();

    let err = acceptor.bind().unwrap_err();
    assert_eq!(err, AcceptorError::AlreadyBound(acceptor.service_id()));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_failed_bind_leaves_acceptor_unbound() {
    let registry = registry();
    let first = acceptor(&registry);
    first.bind_addresses(&addrs(&[5000])).unwrap();

    let second = acceptor(&registry);
    let listener = recorder(&second);
    let err = second.bind_addresses(&addrs(&[0, 5000])).unwrap_err();

    assert_eq!(
        err,
        AcceptorError::Bind(BindError::AddressInUse(VmPipeAddress::new(5000)))
    );
    assert_eq!(second.state(), AcceptorState::Unbound);
    assert!(second.local_addresses().is_empty());
    assert!(listener.events().is_empty());
    assert_eq!(registry.bound_addresses(), addrs(&[5000]));

    // The rejected request does not replace the configured one.
    assert!(second.requested_addresses().is_empty());
    assert_eq!(second.local_address(), None);

    // The failed acceptor can still bind elsewhere.
    assert_eq!(second.bind_addresses(&addrs(&[5001])).unwrap(), addrs(&[5001]));
}

#[test]
fn test_exhausted_range_reported() {
    let registry = Arc::new(AddressRegistry::with_config(RegistryConfig::for_testing()));
    let acceptor = acceptor(&registry);

    let err = acceptor.bind_addresses(&addrs(&[0, 0, 0, 0, 0])).unwrap_err();

    assert!(matches!(
        err,
        AcceptorError::Bind(BindError::PortExhausted { .. })
    ));
    assert!(registry.is_empty());
}

#[test]
fn test_configuration_is_frozen_while_bound() {
    let registry = registry();
    let acceptor = acceptor(&registry);
    acceptor.bind().unwrap();

    let id = acceptor.service_id();
    assert_eq!(
        acceptor.set_local_address(VmPipeAddress::new(1)),
        Err(AcceptorError::AlreadyBound(id))
    );
    assert_eq!(
        acceptor.set_session_config(SessionConfig::default()),
        Err(AcceptorError::AlreadyBound(id))
    );
}

// =============================================================================
// Unbind / dispose
// =============================================================================

#[test]
fn test_unbind_removes_every_address() {
    let registry = registry();
    let acceptor = acceptor(&registry);
    let listener = recorder(&acceptor);
    acceptor.bind_addresses(&addrs(&[0, 5000])).unwrap();
    listener.clear();

    acceptor.unbind().unwrap();

    assert!(registry.is_empty());
    assert_eq!(acceptor.state(), AcceptorState::Unbound);
    assert!(acceptor.local_addresses().is_empty());
    assert_eq!(acceptor.local_address(), Some(VmPipeAddress::ANY));
    assert_eq!(
        listener.events(),
        vec![ListenerEvent::Deactivated(
            acceptor.service_id(),
            addrs(&[10000, 5000])
        )]
    );
}

#[test]
fn test_local_address_before_bind() {
    let registry = registry();
    let acceptor = acceptor(&registry);
    assert_eq!(acceptor.local_address(), None);

    acceptor.set_local_address(VmPipeAddress::new(4000)).unwrap();
    assert_eq!(acceptor.local_address(), Some(VmPipeAddress::new(4000)));
    assert!(acceptor.local_addresses().is_empty());
}

#[test]
fn test_unbind_when_unbound_is_noop() {
    let registry = registry();
    let acceptor = acceptor(&registry);
    let listener = recorder(&acceptor);

    acceptor.unbind().unwrap();
    assert!(listener.events().is_empty());
}

#[test]
fn test_rebind_after_unbind() {
    let registry = registry();
    let acceptor = acceptor(&registry);
    acceptor.bind_addresses(&addrs(&[5000])).unwrap();
    acceptor.unbind().unwrap();

    assert_eq!(acceptor.bind().unwrap(), addrs(&[5000]));
}

#[test]
fn test_dispose_unbinds_and_is_terminal() {
    let registry = registry();
    let acceptor = acceptor(&registry);
    let listener = recorder(&acceptor);
    acceptor.bind().unwrap();

    acceptor.dispose().unwrap();

    assert!(registry.is_empty());
    assert!(acceptor.is_disposed());
    let id = acceptor.service_id();
    assert_eq!(acceptor.bind(), Err(AcceptorError::Disposed(id)));
    assert_eq!(acceptor.unbind(), Err(AcceptorError::Disposed(id)));
    assert_eq!(acceptor.dispose(), Err(AcceptorError::Disposed(id)));
    assert_eq!(listener.events().len(), 2);
}

#[test]
fn test_dispose_unbound_fires_nothing() {
    let registry = registry();
    let acceptor = acceptor(&registry);
    let listener = recorder(&acceptor);

    acceptor.dispose().unwrap();
    assert!(listener.events().is_empty());
    assert_eq!(acceptor.state(), AcceptorState::Disposed);
}

#[test]
fn test_drop_releases_addresses_and_notifies() {
    let registry = registry();
    let acceptor = acceptor(&registry);
    let listener = recorder(&acceptor);
    acceptor.bind_addresses(&addrs(&[5000, 0])).unwrap();
    assert_eq!(registry.len(), 2);
    let id = acceptor.service_id();
    listener.clear();

    drop(acceptor);

    assert!(registry.is_empty());
    assert_eq!(
        listener.events(),
        vec![ListenerEvent::Deactivated(id, addrs(&[5000, 10000]))]
    );
}

#[test]
fn test_drop_unbound_fires_nothing() {
    let registry = registry();
    let acceptor = acceptor(&registry);
    let listener = recorder(&acceptor);
    acceptor.bind().unwrap();
    acceptor.unbind().unwrap();
    listener.clear();

    drop(acceptor);
    assert!(listener.events().is_empty());
}

#[test]
fn test_from_config() {
    let registry = registry();
    let config = AcceptorConfig {
        bind: addrs(&[6000]),
        session: SessionConfig {
            idle_time_secs: 30,
            ..SessionConfig::default()
        },
    };
    let acceptor =
        VmPipeAcceptor::from_config(registry.clone(), Arc::new(NoopHandler), config.clone());

    assert_eq!(acceptor.bind().unwrap(), addrs(&[6000]));
    let endpoint = registry.lookup(VmPipeAddress::new(6000)).unwrap();
    assert_eq!(endpoint.session_config(), &config.session);
}

// =============================================================================
// Listener re-entrancy
// =============================================================================

struct Reentrant {
    acceptor: Mutex<Weak<VmPipeAcceptor>>,
    seen: Mutex<Vec<VmPipeAddress>>,
}

impl ServiceListener for Reentrant {
    fn service_activated(&self, _event: &ServiceEvent) {
        if let Some(acceptor) = self.acceptor.lock().upgrade() {
            *self.seen.lock() = acceptor.local_addresses();
            acceptor.unbind().unwrap();
        }
    }
}

#[test]
fn test_listener_may_call_back_into_acceptor() {
    let registry = registry();
    let acceptor = acceptor(&registry);
    let listener = Arc::new(Reentrant {
        acceptor: Mutex::new(Arc::downgrade(&acceptor)),
        seen: Mutex::new(Vec::new()),
    });
    acceptor.add_listener(listener.clone());

    acceptor.bind_addresses(&addrs(&[5000])).unwrap();

    assert_eq!(*listener.seen.lock(), addrs(&[5000]));
    assert_eq!(acceptor.state(), AcceptorState::Unbound);
    assert!(registry.is_empty());
}

/// Calls back into its acceptor from `service_deactivated`.
struct OnDeactivated {
    acceptor: Mutex<Weak<VmPipeAcceptor>>,
    action: fn(&VmPipeAcceptor) -> Result<(), AcceptorError>,
    outcomes: Mutex<Vec<Result<(), AcceptorError>>>,
}

impl OnDeactivated {
    fn attach(
        acceptor: &Arc<VmPipeAcceptor>,
        action: fn(&VmPipeAcceptor) -> Result<(), AcceptorError>,
    ) -> Arc<Self> {
        let listener = Arc::new(Self {
            acceptor: Mutex::new(Arc::downgrade(acceptor)),
            action,
            outcomes: Mutex::new(Vec::new()),
        });
        acceptor.add_listener(listener.clone());
        listener
    }
}

impl ServiceListener for OnDeactivated {
    fn service_deactivated(&self, _event: &ServiceEvent) {
        if let Some(acceptor) = self.acceptor.lock().upgrade() {
            let outcome = (self.action)(&acceptor);
            self.outcomes.lock().push(outcome);
        }
    }
}

#[test]
fn test_nested_dispose_from_listener_is_rejected() {
    let registry = registry();
    let acceptor = acceptor(&registry);
    let listener = OnDeactivated::attach(&acceptor, |a| a.dispose());
    let events = recorder(&acceptor);
    acceptor.bind().unwrap();
    events.clear();

    assert_eq!(acceptor.dispose(), Ok(()));

    let id = acceptor.service_id();
    assert_eq!(*listener.outcomes.lock(), vec![Err(AcceptorError::Disposed(id))]);
    assert_eq!(events.events().len(), 1);
    assert!(acceptor.is_disposed());
}

#[test]
fn test_listener_cannot_rebind_during_dispose() {
    let registry = registry();
    let acceptor = acceptor(&registry);
    let listener = OnDeactivated::attach(&acceptor, |a| a.bind().map(|_| ()));
    acceptor.bind().unwrap();

    acceptor.dispose().unwrap();

    let id = acceptor.service_id();
    assert_eq!(*listener.outcomes.lock(), vec![Err(AcceptorError::Disposed(id))]);
    assert!(registry.is_empty());
}

#[test]
fn test_listener_may_dispose_after_plain_unbind() {
    let registry = registry();
    let acceptor = acceptor(&registry);
    let listener = OnDeactivated::attach(&acceptor, |a| a.dispose());
    acceptor.bind().unwrap();

    acceptor.unbind().unwrap();

    assert_eq!(*listener.outcomes.lock(), vec![Ok(())]);
    assert!(acceptor.is_disposed());
}

// =============================================================================
// Session handoff
// =============================================================================

#[test]
fn test_finish_session_initialization() {
    let registry = registry();
    let handler = Arc::new(CountingHandler::new());
    let acceptor = VmPipeAcceptor::with_registry(registry.clone(), handler.clone());
    let listener = recorder(&acceptor);
    acceptor.bind_addresses(&addrs(&[5000])).unwrap();
    listener.clear();

    let connector = LoopbackConnector::new(registry);
    let (session, mut ready) = connector
        .connect_session(VmPipeAddress::new(5000))
        .unwrap();

    let delivered = ready.try_recv().unwrap();
    assert_eq!(delivered.id(), session.id());
    assert_eq!(delivered.remote_address(), VmPipeAddress::new(-1));
    assert!(session.has_handler());
    assert_eq!(session.applied_config(), Some(SessionConfig::default()));
    assert_eq!(handler.created(), 1);
    assert_eq!(
        listener.events(),
        vec![ListenerEvent::SessionCreated(acceptor.service_id(), session.id())]
    );
}

#[test]
fn test_finish_with_dropped_receiver_still_initializes() {
    let registry = registry();
    let handler = Arc::new(CountingHandler::new());
    let acceptor = VmPipeAcceptor::with_registry(registry, handler.clone());

    let session = Arc::new(LoopbackSession::new(
        1,
        VmPipeAddress::new(5000),
        VmPipeAddress::new(-1),
    ));
    let (ready, future) = session_ready_channel();
    drop(future);

    acceptor
        .finish_session_initialization(session.clone(), ready)
        .unwrap();
    assert!(session.has_handler());
    assert_eq!(handler.created(), 1);
}

#[test]
fn test_finish_after_dispose_fails() {
    let registry = registry();
    let acceptor = acceptor(&registry);
    acceptor.dispose().unwrap();

    let session: Arc<dyn PipeSession> = Arc::new(LoopbackSession::new(
        1,
        VmPipeAddress::new(5000),
        VmPipeAddress::new(-1),
    ));
    let (ready, _future) = session_ready_channel();

    assert_eq!(
        acceptor.finish_session_initialization(session, ready),
        Err(AcceptorError::Disposed(acceptor.service_id()))
    );
}

#[test]
fn test_new_session_is_unsupported() {
    let registry = registry();
    let acceptor = acceptor(&registry);

    let result = acceptor.new_session(VmPipeAddress::new(-1), VmPipeAddress::new(5000));
    assert!(matches!(result, Err(AcceptorError::Unsupported(_))));
}

#[test]
fn test_api_trait_object() {
    let registry = registry();
    let api: Arc<dyn AcceptorApi> = acceptor(&registry);

    assert_eq!(api.bind_addresses(&addrs(&[7000])).unwrap(), addrs(&[7000]));
    assert_eq!(api.local_addresses(), addrs(&[7000]));
    api.dispose().unwrap();
    assert_eq!(api.state(), AcceptorState::Disposed);
}
