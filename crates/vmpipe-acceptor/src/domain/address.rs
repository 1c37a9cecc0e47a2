//! Virtual addresses for the in-process transport.
//!
//! A `VmPipeAddress` stands in for a host:port pair. It carries a single
//! integer port; there is no host part because every endpoint lives in the
//! same process.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Textual prefix used by `Display` and accepted by `FromStr`.
pub const ADDRESS_SCHEME: &str = "vm:";

/// An immutable virtual address.
///
/// Two addresses are equal iff their ports are equal. Port `0` is the
/// wildcard asking the registry to pick a free port; negative ports are
/// representable so that connector-side anonymous addresses and malformed
/// bind requests can be expressed, but the registry refuses to bind them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VmPipeAddress {
    port: i32,
}

impl VmPipeAddress {
    /// The wildcard address (`vm:0`).
    pub const ANY: Self = Self { port: 0 };

    /// Create an address for the given port.
    #[must_use]
    pub const fn new(port: i32) -> Self {
        Self { port }
    }

    /// The port number.
    #[must_use]
    pub const fn port(&self) -> i32 {
        self.port
    }

    /// Whether this address asks for dynamic allocation.
    #[must_use]
    pub const fn is_wildcard(&self) -> bool {
        self.port == 0
    }

    /// Whether this address may be passed to a bind request.
    #[must_use]
    pub const fn is_bindable(&self) -> bool {
        self.port >= 0
    }
}

impl From<i32> for VmPipeAddress {
    fn from(port: i32) -> Self {
        Self::new(port)
    }
}

impl From<VmPipeAddress> for String {
    fn from(address: VmPipeAddress) -> Self {
        address.to_string()
    }
}

impl fmt::Display for VmPipeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", ADDRESS_SCHEME, self.port)
    }
}

/// Error returned when a string is not a valid virtual address.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid vm pipe address: {input:?}")]
pub struct AddressParseError {
    /// The rejected input.
    pub input: String,
}

impl FromStr for VmPipeAddress {
    type Err = AddressParseError;

    /// Accepts `vm:<port>` or a bare `<port>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix(ADDRESS_SCHEME).unwrap_or(trimmed);

        digits
            .trim()
            .parse::<i32>()
            .map(Self::new)
            .map_err(|_| AddressParseError {
                input: s.to_string(),
            })
    }
}

impl TryFrom<String> for VmPipeAddress {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(feature = "config")]
mod serde_support {
    use super::VmPipeAddress;
    use serde::de::{self, Deserializer, Visitor};
    use serde::{Deserialize, Serialize, Serializer};
    use std::fmt;

    impl Serialize for VmPipeAddress {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_str(self)
        }
    }

    struct AddressVisitor;

    impl<'de> Visitor<'de> for AddressVisitor {
        type Value = VmPipeAddress;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a port number or a \"vm:<port>\" string")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            i32::try_from(v)
                .map(VmPipeAddress::new)
                .map_err(|_| E::custom(format!("port {v} out of range")))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            i32::try_from(v)
                .map(VmPipeAddress::new)
                .map_err(|_| E::custom(format!("port {v} out of range")))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            v.parse().map_err(E::custom)
        }
    }

    impl<'de> Deserialize<'de> for VmPipeAddress {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_any(AddressVisitor)
        }
    }
}
