//! Control version management

use crate::error::{ProtocolError, Result};
use std::fmt;

/// Control protocol version as reported by the device
///
/// One byte on the wire: high nibble is the major version, low nibble the
/// minor version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlVersion(pub u8);

/// Current control protocol version (1.0)
pub const CURRENT_VERSION: ControlVersion = ControlVersion(0x10);

impl ControlVersion {
    /// Size of the version value in the data stage of a version query
    pub const SIZE: usize = 1;

    pub const fn new(major: u8, minor: u8) -> Self {
        Self(((major & 0x0F) << 4) | (minor & 0x0F))
    }

    pub const fn major(self) -> u8 {
        self.0 >> 4
    }

    pub const fn minor(self) -> u8 {
        self.0 & 0x0F
    }

    /// Check if this version is compatible with another version
    pub fn is_compatible_with(&self, other: &ControlVersion) -> bool {
        self.major() == other.major() && self.minor() >= other.minor()
    }

    /// Parse the version from a data stage that must be exactly [`Self::SIZE`] bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match bytes {
            [value] => Ok(Self(*value)),
            _ => Err(ProtocolError::InvalidVersionLength {
                expected: Self::SIZE,
                actual: bytes.len(),
            }),
        }
    }

    pub const fn to_bytes(self) -> [u8; Self::SIZE] {
        [self.0]
    }
}

impl fmt::Display for ControlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major(), self.minor())
    }
}
