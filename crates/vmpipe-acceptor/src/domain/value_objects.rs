//! Value objects: identifiers, configuration and lifecycle state.

use super::address::VmPipeAddress;
use std::fmt;

/// First port handed out by dynamic allocation. Ports below it are never
/// auto-assigned but may still be requested explicitly.
pub const DEFAULT_DYNAMIC_PORT_BASE: i32 = 10_000;

/// Exclusive upper bound of the dynamic allocation scan.
pub const DEFAULT_DYNAMIC_PORT_LIMIT: i32 = i32::MAX;

/// Identity of an acceptor within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceId(u64);

impl ServiceId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw id.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "service-{}", self.0)
    }
}

/// Registry configuration.
///
/// The dynamic range is `[dynamic_port_base, dynamic_port_limit)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// First candidate port for wildcard requests (default: 10000)
    pub dynamic_port_base: i32,
    /// Exclusive upper bound for wildcard requests (default: i32::MAX)
    pub dynamic_port_limit: i32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            dynamic_port_base: DEFAULT_DYNAMIC_PORT_BASE,
            dynamic_port_limit: DEFAULT_DYNAMIC_PORT_LIMIT,
        }
    }
}

impl RegistryConfig {
    /// Create a config suitable for testing (four dynamic ports).
    pub fn for_testing() -> Self {
        Self {
            dynamic_port_base: DEFAULT_DYNAMIC_PORT_BASE,
            dynamic_port_limit: DEFAULT_DYNAMIC_PORT_BASE + 4,
        }
    }

    /// Whether `address` lies inside the dynamic range.
    #[must_use]
    pub fn is_dynamic(&self, address: &VmPipeAddress) -> bool {
        (self.dynamic_port_base..self.dynamic_port_limit).contains(&address.port())
    }

    /// Number of ports in the dynamic range.
    #[must_use]
    pub fn dynamic_capacity(&self) -> u64 {
        u64::try_from(i64::from(self.dynamic_port_limit) - i64::from(self.dynamic_port_base))
            .unwrap_or(0)
    }
}

/// Per-session settings handed to accepted sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Seconds without traffic before the session reports idle (0 disables)
    pub idle_time_secs: u64,
    /// Seconds a pending write may wait before failing
    pub write_timeout_secs: u64,
    /// Interval for read/write throughput sampling
    pub throughput_calculation_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_time_secs: 0,
            write_timeout_secs: 60,
            throughput_calculation_interval_secs: 3,
        }
    }
}

/// Acceptor-level settings: what to bind and how to configure sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcceptorConfig {
    /// Addresses bound by `bind()`; empty means one wildcard address
    pub bind: Vec<VmPipeAddress>,
    /// Settings for sessions accepted on these addresses
    pub session: SessionConfig,
}

/// Acceptor lifecycle.
///
/// ```text
/// Unbound ──bind──► Binding ──ok──► Bound ──unbind──► Unbinding ──► Unbound
///    │                 └──err──► Unbound
///    └──────────────dispose (from Bound or Unbound)──────────► Disposed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcceptorState {
    /// No addresses registered
    Unbound,
    /// Bind request in flight
    Binding,
    /// Addresses registered and visible to connectors
    Bound,
    /// Unbind in flight
    Unbinding,
    /// Terminal
    Disposed,
}

impl AcceptorState {
    /// Whether no further transitions are possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Disposed)
    }
}

impl fmt::Display for AcceptorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbound => write!(f, "unbound"),
            Self::Binding => write!(f, "binding"),
            Self::Bound => write!(f, "bound"),
            Self::Unbinding => write!(f, "unbinding"),
            Self::Disposed => write!(f, "disposed"),
        }
    }
}

/// Snapshot of registry occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Total bound addresses
    pub bound_addresses: usize,
    /// Bound addresses inside the dynamic range
    pub dynamic_addresses: usize,
    /// Distinct services owning at least one address
    pub services: usize,
}
