//! Protocol error types

use thiserror::Error;

/// Protocol-level errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Command code collides with the direction bit
    #[error("Invalid command code {0:#04x} (max 0x7f)")]
    InvalidCommandCode(u8),

    /// Payload length does not fit in wLength
    #[error("Payload too large: {len} bytes (max: {max})")]
    PayloadTooLarge { len: usize, max: usize },

    /// A header field uses bits that packing version 1 keeps at zero
    #[error("Reserved bits set in {field}: {value:#06x}")]
    ReservedBitsSet { field: &'static str, value: u16 },

    /// Setup packet is not a vendor request to the device recipient
    #[error("Unsupported request type {0:#04x}")]
    UnsupportedRequestType(u8),

    /// Setup packet uses a request number other than the control request
    #[error("Unsupported request number {0}")]
    UnsupportedRequest(u8),

    /// Transfer direction disagrees with the command's direction bit
    #[error("Direction mismatch: request type {request_type:#04x}, command {command:#04x}")]
    DirectionMismatch { request_type: u8, command: u8 },

    /// Version data stage has the wrong size
    #[error("Invalid version length: expected {expected} bytes, got {actual}")]
    InvalidVersionLength { expected: usize, actual: usize },
}

/// Type alias for protocol results
pub type Result<T> = std::result::Result<T, ProtocolError>;
