//! Domain layer: addresses, the registry and its records.

pub mod address;
pub mod endpoint;
pub mod errors;
pub mod listeners;
pub mod registry;
pub mod value_objects;

pub use address::{AddressParseError, VmPipeAddress, ADDRESS_SCHEME};
pub use endpoint::BoundEndpoint;
pub use errors::{AcceptorError, BindError};
pub use listeners::ServiceListeners;
pub use registry::AddressRegistry;
pub use value_objects::{
    AcceptorConfig, AcceptorState, RegistryConfig, RegistryStats, ServiceId, SessionConfig,
    DEFAULT_DYNAMIC_PORT_BASE, DEFAULT_DYNAMIC_PORT_LIMIT,
};
