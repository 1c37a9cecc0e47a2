//! Adapters: configuration sources and a logging listener.

pub mod config;
pub mod logging;

pub use config::{validate_registry_config, ConfigError, StaticConfigProvider};
#[cfg(feature = "config")]
pub use config::TomlConfigProvider;
pub use logging::LoggingListener;
