//! Host transport error types

use protocol::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Device not found: VID={vendor_id:04X} PID={product_id:04X}")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },

    #[error("Failed to open device: {0}")]
    OpenFailed(String),

    #[error("Failed to select configuration {configuration}: {message}")]
    ConfigurationFailed { configuration: u8, message: String },

    #[error("Failed to claim interface {interface}: {message}")]
    ClaimInterfaceFailed { interface: u8, message: String },

    #[error("Failed to release interface {interface}: {message}")]
    ReleaseInterfaceFailed { interface: u8, message: String },

    #[error("Timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Transferred byte count differs from the payload length
    #[error("Transfer length mismatch: expected {expected} bytes, transferred {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Buffer too small: needed {needed}, got {available}")]
    BufferTooSmall { needed: usize, available: usize },

    /// Device refused the request (endpoint 0 STALL)
    #[error("Request stalled by device")]
    Stall,

    #[error("Device disconnected")]
    Disconnected,

    #[error("USB error: {0}")]
    Usb(String),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

pub type Result<T> = std::result::Result<T, TransportError>;
