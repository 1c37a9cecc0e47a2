//! Batch resolution and the all-or-nothing insertion guard.
//!
//! Both run inside the registry's write lock. Resolution never mutates the
//! map, so a failure there needs no undo; insertion goes through
//! [`BindBatch`], which removes everything it inserted unless committed.

use super::EndpointMap;
use crate::domain::{BindError, BoundEndpoint, RegistryConfig, VmPipeAddress};
use std::collections::hash_map::Entry;
use std::sync::Arc;

/// Resolve a bind request to a conflict-free candidate list.
///
/// Wildcards take the lowest free dynamic port that is neither bound nor
/// already chosen earlier in this batch. Concrete ports are only checked
/// against the registry; a port repeated inside the batch is caught at
/// insertion time.
pub(crate) fn resolve_candidates(
    bound: &EndpointMap,
    requested: &[VmPipeAddress],
    config: &RegistryConfig,
) -> Result<Vec<VmPipeAddress>, BindError> {
    let mut candidates = Vec::with_capacity(requested.len());

    for &address in requested {
        let candidate = if address.is_wildcard() {
            allocate_dynamic(bound, &candidates, config)?
        } else if !address.is_bindable() {
            return Err(BindError::InvalidAddress(address));
        } else if bound.contains_key(&address) {
            return Err(BindError::AddressInUse(address));
        } else {
            address
        };
        candidates.push(candidate);
    }

    Ok(candidates)
}

/// Lowest port in the dynamic range not bound and not in `chosen`.
fn allocate_dynamic(
    bound: &EndpointMap,
    chosen: &[VmPipeAddress],
    config: &RegistryConfig,
) -> Result<VmPipeAddress, BindError> {
    // Port 0 is the wildcard itself and negatives are unbindable.
    let base = config.dynamic_port_base.max(1);

    (base..config.dynamic_port_limit)
        .map(VmPipeAddress::new)
        .find(|candidate| !bound.contains_key(candidate) && !chosen.contains(candidate))
        .ok_or(BindError::PortExhausted {
            base,
            limit: config.dynamic_port_limit,
        })
}

/// Insertion transaction over the locked registry map.
///
/// Dropping an uncommitted batch removes every entry it inserted, and only
/// those: entries that existed before the batch are never touched.
pub(crate) struct BindBatch<'a> {
    bound: &'a mut EndpointMap,
    inserted: Vec<VmPipeAddress>,
    committed: bool,
}

impl<'a> BindBatch<'a> {
    pub(crate) fn new(bound: &'a mut EndpointMap) -> Self {
        Self {
            bound,
            inserted: Vec::new(),
            committed: false,
        }
    }

    /// Insert one endpoint, failing if the address is already present.
    pub(crate) fn insert(
        &mut self,
        address: VmPipeAddress,
        endpoint: BoundEndpoint,
    ) -> Result<(), BindError> {
        match self.bound.entry(address) {
            Entry::Occupied(_) => Err(BindError::DuplicateAddress(address)),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(endpoint));
                self.inserted.push(address);
                Ok(())
            }
        }
    }

    /// Number of entries inserted so far.
    pub(crate) fn len(&self) -> usize {
        self.inserted.len()
    }

    /// Keep the inserted entries and return their addresses in order.
    pub(crate) fn commit(mut self) -> Vec<VmPipeAddress> {
        self.committed = true;
        std::mem::take(&mut self.inserted)
    }
}

impl Drop for BindBatch<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for address in self.inserted.drain(..) {
            self.bound.remove(&address);
        }
    }
}
