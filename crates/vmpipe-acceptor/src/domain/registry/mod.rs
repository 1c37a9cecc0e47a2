//! # Address Registry
//!
//! The single source of truth mapping virtual addresses to bound endpoints.
//!
//! ## Consistency
//!
//! Every mutation (a whole bind batch, an unbind) runs inside one write-lock
//! critical section. Lookups take the read lock, so they observe either the
//! state before a batch or the state after it, never a partial batch.
//!
//! ```text
//! try_bind([vm:0, vm:5000])
//!   ├─ write lock
//!   ├─ resolve   vm:0 → vm:10001 (vm:10000 taken), vm:5000 free
//!   ├─ insert    vm:10001, vm:5000   (BindBatch, rolls back on conflict)
//!   └─ unlock → [vm:10001, vm:5000]
//! ```

mod batch;


use crate::domain::{
    BindError, BoundEndpoint, RegistryConfig, RegistryStats, ServiceId, VmPipeAddress,
};
use batch::{resolve_candidates, BindBatch};
use lazy_static::lazy_static;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

pub(crate) type EndpointMap = HashMap<VmPipeAddress, Arc<BoundEndpoint>>;

lazy_static! {
    /// Process-wide default registry used by `VmPipeAcceptor::new`.
    static ref DEFAULT_REGISTRY: Arc<AddressRegistry> = Arc::new(AddressRegistry::new());
}

/// Mapping from virtual address to bound endpoint.
///
/// Share it as `Arc<AddressRegistry>` between acceptors and connectors.
/// Acceptors bound against different registries cannot see each other.
pub struct AddressRegistry {
    config: RegistryConfig,
    bound: RwLock<EndpointMap>,
    next_service_id: AtomicU64,
}

impl AddressRegistry {
    /// Create an empty registry with the default dynamic range.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty registry with a custom dynamic range.
    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            bound: RwLock::new(HashMap::new()),
            next_service_id: AtomicU64::new(1),
        }
    }

    /// The process-wide default registry.
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(&DEFAULT_REGISTRY)
    }

    /// Registry configuration.
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Allocate an id for a new service bound against this registry.
    pub fn next_service_id(&self) -> ServiceId {
        ServiceId::new(self.next_service_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Atomically bind a batch of addresses.
    ///
    /// Wildcards (`vm:0`) are resolved to free dynamic ports; `factory`
    /// builds the endpoint stored under each resolved address. Returns the
    /// resolved addresses in request order.
    ///
    /// # Errors
    ///
    /// - `BindError::InvalidAddress` - a negative port was requested
    /// - `BindError::AddressInUse` - a concrete port is already bound
    /// - `BindError::DuplicateAddress` - the batch repeats an address
    /// - `BindError::PortExhausted` - no free port in the dynamic range
    ///
    /// On error no address from the batch is registered.
    pub fn try_bind<F>(
        &self,
        requested: &[VmPipeAddress],
        mut factory: F,
    ) -> Result<Vec<VmPipeAddress>, BindError>
    where
        F: FnMut(VmPipeAddress) -> BoundEndpoint,
    {
        let mut bound = self.bound.write();

        let candidates = resolve_candidates(&bound, requested, &self.config).map_err(|err| {
            warn!(error = %err, requested = requested.len(), "Bind request rejected");
            err
        })?;

        let mut batch = BindBatch::new(&mut bound);
        for &address in &candidates {
            if let Err(err) = batch.insert(address, factory(address)) {
                warn!(
                    address = %address,
                    rolled_back = batch.len(),
                    "Bind batch collided, rolling back"
                );
                return Err(err);
            }
        }
        let resolved = batch.commit();

        for address in &resolved {
            debug!(address = %address, "Address bound");
        }
        Ok(resolved)
    }

    /// Remove one address. Returns whether it was bound.
    pub fn unbind(&self, address: VmPipeAddress) -> bool {
        let removed = self.bound.write().remove(&address).is_some();
        if removed {
            debug!(address = %address, "Address unbound");
        }
        removed
    }

    /// Remove several addresses in one critical section.
    ///
    /// Returns how many were actually bound.
    pub fn unbind_all(&self, addresses: &[VmPipeAddress]) -> usize {
        let mut bound = self.bound.write();
        let mut removed = 0;
        for address in addresses {
            if bound.remove(address).is_some() {
                debug!(address = %address, "Address unbound");
                removed += 1;
            }
        }
        removed
    }

    /// Find the endpoint bound to `address`.
    #[must_use]
    pub fn lookup(&self, address: VmPipeAddress) -> Option<Arc<BoundEndpoint>> {
        self.bound.read().get(&address).cloned()
    }

    /// Whether `address` is currently bound.
    #[must_use]
    pub fn is_bound(&self, address: VmPipeAddress) -> bool {
        self.bound.read().contains_key(&address)
    }

    /// Number of bound addresses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bound.read().len()
    }

    /// Whether nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bound.read().is_empty()
    }

    /// All bound addresses, sorted by port.
    #[must_use]
    pub fn bound_addresses(&self) -> Vec<VmPipeAddress> {
        let mut addresses: Vec<_> = self.bound.read().keys().copied().collect();
        addresses.sort_unstable();
        addresses
    }

    /// Occupancy snapshot taken under a single read lock.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        let bound = self.bound.read();
        let services: HashSet<ServiceId> = bound.values().map(|e| e.service_id()).collect();
        RegistryStats {
            bound_addresses: bound.len(),
            dynamic_addresses: bound.keys().filter(|a| self.config.is_dynamic(a)).count(),
            services: services.len(),
        }
    }
}

impl Default for AddressRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AddressRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressRegistry")
            .field("config", &self.config)
            .field("bound", &self.len())
            .finish()
    }
}
