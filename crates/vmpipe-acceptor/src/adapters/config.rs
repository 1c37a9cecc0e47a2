use crate::domain::{AcceptorConfig, RegistryConfig};
use crate::ports::ConfigProvider;
use thiserror::Error;

// ============================================================================
// StaticConfigProvider - Hardcoded config for testing/development
// ============================================================================

/// Static configuration provider with hardcoded values.
///
/// Useful for tests and embedded setups. To load from a file, use
/// `TomlConfigProvider` (requires the `config` feature).
#[derive(Debug, Clone, Default)]
pub struct StaticConfigProvider {
    registry: RegistryConfig,
    acceptor: AcceptorConfig,
}

impl StaticConfigProvider {
    /// Create with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given registry settings.
    #[must_use]
    pub fn with_registry_config(mut self, config: RegistryConfig) -> Self {
        self.registry = config;
        self
    }

    /// Use the given acceptor settings.
    #[must_use]
    pub fn with_acceptor_config(mut self, config: AcceptorConfig) -> Self {
        self.acceptor = config;
        self
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn registry_config(&self) -> RegistryConfig {
        self.registry
    }

    fn acceptor_config(&self) -> AcceptorConfig {
        self.acceptor.clone()
    }
}

/// Errors that can occur during config loading.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// File I/O error.
    #[error("failed to read {path}: {error}")]
    Io {
        /// Path of the file that failed to load.
        path: String,
        /// Error message from the I/O operation.
        error: String,
    },

    /// TOML parsing error.
    #[error("failed to parse config: {0}")]
    Parse(String),

    /// The dynamic range is empty or starts at a non-positive port.
    #[error("invalid dynamic port range {base}..{limit}")]
    InvalidRange {
        /// Configured first port.
        base: i32,
        /// Configured exclusive upper bound.
        limit: i32,
    },
}

/// Check that a registry config describes a usable dynamic range.
pub fn validate_registry_config(config: &RegistryConfig) -> Result<(), ConfigError> {
    if config.dynamic_port_base < 1 || config.dynamic_port_limit <= config.dynamic_port_base {
        return Err(ConfigError::InvalidRange {
            base: config.dynamic_port_base,
            limit: config.dynamic_port_limit,
        });
    }
    Ok(())
}

// ============================================================================
// TomlConfigProvider - File-based config (requires "config" feature)
// ============================================================================

#[cfg(feature = "config")]
mod toml_config {
    use super::*;
    use crate::domain::{
        SessionConfig, VmPipeAddress, DEFAULT_DYNAMIC_PORT_BASE, DEFAULT_DYNAMIC_PORT_LIMIT,
    };
    use serde::Deserialize;
    use std::fs;
    use std::path::Path;

    /// Configuration file structure.
    #[derive(Debug, Deserialize, Default)]
    struct ConfigFile {
        #[serde(default)]
        registry: RegistryFile,
        #[serde(default)]
        acceptor: AcceptorFile,
        #[serde(default)]
        session: SessionFile,
    }

    #[derive(Debug, Deserialize, Default)]
    struct RegistryFile {
        dynamic_port_base: Option<i32>,
        dynamic_port_limit: Option<i32>,
    }

    #[derive(Debug, Deserialize, Default)]
    struct AcceptorFile {
        #[serde(default)]
        bind: Vec<VmPipeAddress>,
    }

    #[derive(Debug, Deserialize, Default)]
    struct SessionFile {
        idle_time_secs: Option<u64>,
        write_timeout_secs: Option<u64>,
        throughput_calculation_interval_secs: Option<u64>,
    }

    /// TOML-based configuration provider.
    ///
    /// # Config File Format
    ///
    /// ```toml
    /// [registry]
    /// dynamic_port_base = 10000
    /// dynamic_port_limit = 20000
    ///
    /// [acceptor]
    /// bind = ["vm:5000", "vm:0"]
    ///
    /// [session]
    /// idle_time_secs = 0
    /// write_timeout_secs = 60
    /// throughput_calculation_interval_secs = 3
    /// ```
    ///
    /// Every section and key is optional. Addresses may be written as
    /// `"vm:<port>"`, `"<port>"` or a bare integer.
    #[derive(Debug, Clone)]
    pub struct TomlConfigProvider {
        registry: RegistryConfig,
        acceptor: AcceptorConfig,
    }

    impl TomlConfigProvider {
        /// Load configuration from a TOML file.
        ///
        /// # Errors
        ///
        /// Returns error if the file cannot be read, parsed or validated.
        pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
            let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
                path: path.as_ref().display().to_string(),
                error: e.to_string(),
            })?;

            Self::parse(&content)
        }

        /// Parse configuration from a TOML string.
        pub fn parse(content: &str) -> Result<Self, ConfigError> {
            let file: ConfigFile =
                toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

            let registry = RegistryConfig {
                dynamic_port_base: file
                    .registry
                    .dynamic_port_base
                    .unwrap_or(DEFAULT_DYNAMIC_PORT_BASE),
                dynamic_port_limit: file
                    .registry
                    .dynamic_port_limit
                    .unwrap_or(DEFAULT_DYNAMIC_PORT_LIMIT),
            };
            validate_registry_config(&registry)?;

            let defaults = SessionConfig::default();
            let sc = file.session;
            let acceptor = AcceptorConfig {
                bind: file.acceptor.bind,
                session: SessionConfig {
                    idle_time_secs: sc.idle_time_secs.unwrap_or(defaults.idle_time_secs),
                    write_timeout_secs: sc
                        .write_timeout_secs
                        .unwrap_or(defaults.write_timeout_secs),
                    throughput_calculation_interval_secs: sc
                        .throughput_calculation_interval_secs
                        .unwrap_or(defaults.throughput_calculation_interval_secs),
                },
            };

            Ok(Self { registry, acceptor })
        }
    }

    impl ConfigProvider for TomlConfigProvider {
        fn registry_config(&self) -> RegistryConfig {
            self.registry
        }

        fn acceptor_config(&self) -> AcceptorConfig {
            self.acceptor.clone()
        }
    }
}

#[cfg(feature = "config")]
pub use toml_config::TomlConfigProvider;
