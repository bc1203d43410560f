//! Device-side error types

use protocol::{Command, ProtocolError, ResourceId};
use thiserror::Error;

/// Resource table registration failures
///
/// These are bring-up configuration errors: the firmware declared an
/// inconsistent set of resources.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("Resource {resid} is the reserved id")]
    ReservedId { resid: ResourceId },

    #[error("Resource {resid} requested by interface {requested} is already owned by interface {owner}")]
    Conflict {
        resid: ResourceId,
        owner: u8,
        requested: u8,
    },

    #[error("Interface {ifnum} would own {requested} resources (max: {max})")]
    CapacityExceeded {
        ifnum: u8,
        requested: usize,
        max: usize,
    },

    #[error("No free slot for interface {ifnum} (max interfaces: {max})")]
    TooManyInterfaces { ifnum: usize, max: usize },
}

/// Errors reported by an interface handler
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("Unsupported command {0}")]
    UnsupportedCommand(Command),

    #[error("Invalid payload length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("{0}")]
    Other(String),
}

/// Reasons the device refuses (stalls) a control request
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Unknown resource {0}")]
    UnknownResource(ResourceId),

    #[error("Data buffer too small: needed {needed}, got {available}")]
    BufferTooSmall { needed: usize, available: usize },

    #[error("Interface {ifnum} rejected request: {source}")]
    Handler {
        ifnum: u8,
        #[source]
        source: HandlerError,
    },
}

pub type Result<T> = std::result::Result<T, DispatchError>;
