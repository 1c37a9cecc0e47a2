//! Registry and acceptor properties exercised through the public API.

use proptest::prelude::*;
use std::sync::Arc;
use vmpipe_acceptor::test_utils::NoopHandler;
use vmpipe_acceptor::{
    AcceptorError, AddressRegistry, BindError, RegistryConfig, VmPipeAcceptor, VmPipeAddress,
};

fn addrs(ports: &[i32]) -> Vec<VmPipeAddress> {
    ports.iter().copied().map(VmPipeAddress::new).collect()
}

fn new_acceptor(registry: &Arc<AddressRegistry>) -> Arc<VmPipeAcceptor> {
    VmPipeAcceptor::with_registry(registry.clone(), Arc::new(NoopHandler))
}

#[test]
fn test_uniqueness_one_owner_per_address() {
    let registry = Arc::new(AddressRegistry::new());
    let a = new_acceptor(&registry);
    let b = new_acceptor(&registry);

    a.bind_addresses(&addrs(&[5000])).unwrap();
    assert!(b.bind_addresses(&addrs(&[5000])).is_err());

    let owner = registry.lookup(VmPipeAddress::new(5000)).unwrap();
    assert_eq!(owner.service_id(), a.service_id());
}

#[test]
fn test_atomicity_failed_batch_registers_nothing() {
    let registry = Arc::new(AddressRegistry::new());
    let holder = new_acceptor(&registry);
    holder.bind_addresses(&addrs(&[6002])).unwrap();
    let before = registry.bound_addresses();

    let other = new_acceptor(&registry);
    let err = other
        .bind_addresses(&addrs(&[6000, 0, 6001, 6002]))
        .unwrap_err();

    assert!(matches!(err, AcceptorError::Bind(ref e) if e.is_conflict()));
    assert_eq!(registry.bound_addresses(), before);
}

#[test]
fn test_dynamic_allocation_skips_bound_ports() {
    let registry = Arc::new(AddressRegistry::new());
    let a = new_acceptor(&registry);
    a.bind_addresses(&addrs(&[10000, 10001])).unwrap();

    let b = new_acceptor(&registry);
    assert_eq!(b.bind().unwrap(), addrs(&[10002]));
}

#[test]
fn test_unbind_is_idempotent() {
    let registry = Arc::new(AddressRegistry::new());
    let acceptor = new_acceptor(&registry);
    acceptor.bind_addresses(&addrs(&[5000])).unwrap();

    acceptor.unbind().unwrap();
    acceptor.unbind().unwrap();
    assert!(registry.lookup(VmPipeAddress::new(5000)).is_none());
    assert!(!registry.unbind(VmPipeAddress::new(5000)));
}

#[test]
fn test_rebind_after_unbind_yields_same_address() {
    let registry = Arc::new(AddressRegistry::new());
    let acceptor = new_acceptor(&registry);

    let first = acceptor.bind().unwrap();
    acceptor.unbind().unwrap();
    let second = acceptor.bind().unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_conflict_rejected_first_binding_unaffected() {
    let registry = Arc::new(AddressRegistry::new());
    let a = new_acceptor(&registry);
    let b = new_acceptor(&registry);
    a.bind_addresses(&addrs(&[5000])).unwrap();

    let err = b.bind_addresses(&addrs(&[5000])).unwrap_err();

    assert_eq!(
        err,
        AcceptorError::Bind(BindError::AddressInUse(VmPipeAddress::new(5000)))
    );
    assert!(a.is_bound());
    assert_eq!(a.local_addresses(), addrs(&[5000]));
    assert_eq!(
        registry.lookup(VmPipeAddress::new(5000)).unwrap().service_id(),
        a.service_id()
    );
}

#[test]
fn test_scenario_wildcard_next_to_occupied_dynamic_port() {
    let registry = Arc::new(AddressRegistry::new());
    let occupant = new_acceptor(&registry);
    occupant.bind_addresses(&addrs(&[10000])).unwrap();

    let x = new_acceptor(&registry);
    let resolved = x.bind_addresses(&addrs(&[0, 5000])).unwrap();

    assert_eq!(resolved, addrs(&[10001, 5000]));
    for address in &resolved {
        assert_eq!(
            registry.lookup(*address).unwrap().service_id(),
            x.service_id()
        );
    }
    assert_eq!(
        registry.lookup(VmPipeAddress::new(10000)).unwrap().service_id(),
        occupant.service_id()
    );
}

#[test]
fn test_scenario_duplicate_in_request() {
    let registry = Arc::new(AddressRegistry::new());
    let acceptor = new_acceptor(&registry);

    let err = acceptor.bind_addresses(&addrs(&[5000, 5000])).unwrap_err();

    assert_eq!(
        err,
        AcceptorError::Bind(BindError::DuplicateAddress(VmPipeAddress::new(5000)))
    );
    assert!(registry.is_empty());
    assert!(!acceptor.is_bound());
}

#[test]
fn test_low_ports_never_auto_assigned() {
    let registry = Arc::new(AddressRegistry::new());
    let acceptor = new_acceptor(&registry);
    let resolved = acceptor.bind_addresses(&addrs(&[0, 0, 0])).unwrap();

    assert!(resolved.iter().all(|a| a.port() >= 10_000));
    assert_eq!(registry.stats().dynamic_addresses, 3);
}

#[test]
fn test_registries_are_isolated() {
    let left = Arc::new(AddressRegistry::new());
    let right = Arc::new(AddressRegistry::new());

    new_acceptor(&left).bind_addresses(&addrs(&[5000])).unwrap();
    let other = new_acceptor(&right);

    assert_eq!(other.bind_addresses(&addrs(&[5000])).unwrap(), addrs(&[5000]));
}

fn batch_strategy() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec(prop_oneof![Just(0), Just(-1), 5000..5008i32, 10000..10004i32], 1..6)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Whatever the batch, a bind either registers every address or none.
    #[test]
    fn prop_bind_is_all_or_nothing(
        preexisting in prop::collection::vec(5000..5008i32, 0..4),
        batch in batch_strategy(),
    ) {
        let registry = Arc::new(AddressRegistry::with_config(RegistryConfig::for_testing()));
        let holder = new_acceptor(&registry);
        let mut preexisting = preexisting;
        preexisting.sort_unstable();
        preexisting.dedup();
        if !preexisting.is_empty() {
            holder.bind_addresses(&addrs(&preexisting)).unwrap();
        }
        let before = registry.bound_addresses();

        let acceptor = new_acceptor(&registry);
        match acceptor.bind_addresses(&addrs(&batch)) {
            Ok(resolved) => {
                prop_assert_eq!(resolved.len(), batch.len());
                prop_assert_eq!(registry.len(), before.len() + batch.len());
                for address in &resolved {
                    prop_assert!(address.port() > 0);
                    prop_assert_eq!(
                        registry.lookup(*address).unwrap().service_id(),
                        acceptor.service_id()
                    );
                }
                acceptor.unbind().unwrap();
                prop_assert_eq!(registry.bound_addresses(), before);
            }
            Err(_) => {
                prop_assert_eq!(registry.bound_addresses(), before);
                prop_assert!(acceptor.local_addresses().is_empty());
            }
        }
    }
}
