//! # VM-Pipe Acceptor
//!
//! The accept side of an in-process, socket-free transport. Endpoints are
//! identified by virtual addresses (`vm:<port>`); an acceptor registers its
//! addresses in an [`AddressRegistry`] and connectors running in the same
//! process find them there.
//!
//! ## Architecture
//!
//! - **Domain Layer:** addresses, the registry with atomic multi-address
//!   bind, endpoint records, listener sets
//! - **Ports Layer:** [`AcceptorApi`] and [`SessionAcceptor`] inbound;
//!   session, handler, listener and config traits outbound
//! - **Service Layer:** [`VmPipeAcceptor`], the lifecycle state machine
//! - **Adapters Layer:** config providers and a logging listener
//!
//! ```text
//!  VmPipeAcceptor ──try_bind([vm:0, vm:5000])──► AddressRegistry
//!        ▲                                            │ lookup(vm:5000)
//!        │ finish_session_initialization              ▼
//!        └──────────────────────────────────────── connector
//! ```
//!
//! ## Features
//!
//! - `config` - `TomlConfigProvider` and serde support for `VmPipeAddress`
//! - `test-utils` - recording listeners, loopback sessions and connector
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use vmpipe_acceptor::{AddressRegistry, SessionHandler, VmPipeAcceptor, VmPipeAddress};
//!
//! struct Echo;
//! impl SessionHandler for Echo {}
//!
//! let registry = Arc::new(AddressRegistry::new());
//! let acceptor = VmPipeAcceptor::with_registry(registry.clone(), Arc::new(Echo));
//!
//! let bound = acceptor
//!     .bind_addresses(&[VmPipeAddress::ANY, VmPipeAddress::new(5000)])
//!     .unwrap();
//! assert_eq!(bound, vec![VmPipeAddress::new(10000), VmPipeAddress::new(5000)]);
//! assert!(registry.is_bound(VmPipeAddress::new(5000)));
//!
//! acceptor.dispose().unwrap();
//! assert!(registry.is_empty());
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

/// Test doubles (RecordingListener, LoopbackConnector, etc.)
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// =============================================================================
// CORE RE-EXPORTS
// =============================================================================

pub use domain::{
    AcceptorConfig, AcceptorError, AcceptorState, AddressParseError, AddressRegistry, BindError,
    BoundEndpoint, RegistryConfig, RegistryStats, ServiceId, ServiceListeners, SessionConfig,
    VmPipeAddress, ADDRESS_SCHEME, DEFAULT_DYNAMIC_PORT_BASE, DEFAULT_DYNAMIC_PORT_LIMIT,
};

pub use ports::{
    session_ready_channel, AcceptorApi, ConfigProvider, ConnectFuture, PipeSession,
    ServiceEvent, ServiceListener, SessionAcceptor, SessionHandler, SessionReady,
};

pub use service::VmPipeAcceptor;

pub use adapters::{validate_registry_config, ConfigError, LoggingListener, StaticConfigProvider};

#[cfg(feature = "config")]
pub use adapters::TomlConfigProvider;
