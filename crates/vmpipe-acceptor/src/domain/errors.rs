//! Domain errors for the address registry and the acceptor.

use super::address::VmPipeAddress;
use super::value_objects::ServiceId;
use thiserror::Error;

/// Errors from a registry bind request.
///
/// Every variant is raised before or during the single critical section of
/// `AddressRegistry::try_bind`; when one is returned the registry holds
/// exactly the entries it held before the call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindError {
    /// A negative port was requested.
    #[error("bind port number must be 0 or above: {0}")]
    InvalidAddress(VmPipeAddress),

    /// The concrete address is already owned by another endpoint.
    #[error("address already bound: {0}")]
    AddressInUse(VmPipeAddress),

    /// The batch collided with itself, or with an entry that appeared
    /// between resolution and insertion.
    #[error("duplicate local address: {0}")]
    DuplicateAddress(VmPipeAddress),

    /// Dynamic allocation scanned the whole range without finding a port.
    #[error("no port available in vm:{base}..vm:{limit}")]
    PortExhausted {
        /// First port considered.
        base: i32,
        /// Exclusive upper bound of the scan.
        limit: i32,
    },
}

impl BindError {
    /// Whether the caller may retry with a different address.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::AddressInUse(_) | Self::DuplicateAddress(_))
    }

    /// The address the error refers to, if any.
    #[must_use]
    pub fn address(&self) -> Option<VmPipeAddress> {
        match self {
            Self::InvalidAddress(a) | Self::AddressInUse(a) | Self::DuplicateAddress(a) => Some(*a),
            Self::PortExhausted { .. } => None,
        }
    }
}

/// Errors from acceptor lifecycle and session operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AcceptorError {
    /// The registry rejected the bind request.
    #[error(transparent)]
    Bind(#[from] BindError),

    /// The acceptor has been disposed.
    #[error("acceptor {0} has been disposed")]
    Disposed(ServiceId),

    /// The operation requires the acceptor to be unbound.
    #[error("acceptor {0} is already bound")]
    AlreadyBound(ServiceId),

    /// The acceptor only accepts sessions; it never originates them.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}
