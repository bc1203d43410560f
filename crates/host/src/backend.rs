//! USB backend abstraction
//!
//! The control session only needs a small slice of a USB host stack:
//! finding and opening a device, selecting a configuration, claiming an
//! interface, and synchronous control transfers. Backends implement these
//! two traits; dropping a pipe closes the device.
//!
//! Implementations:
//! - [`crate::rusb_backend::RusbBackend`] (libusb, feature `libusb`)
//! - [`crate::loopback::LoopbackBackend`] (in-process device dispatcher)

use crate::error::Result;
use protocol::SetupPacket;
use std::time::Duration;

/// Locates and opens devices
pub trait UsbBackend {
    type Pipe: ControlPipe;

    /// Open the first device matching `vendor_id:product_id`
    fn open(&mut self, vendor_id: u16, product_id: u16) -> Result<Self::Pipe>;
}

/// An open device's default control pipe
pub trait ControlPipe {
    /// Make `configuration` the active configuration
    fn set_configuration(&mut self, configuration: u8) -> Result<()>;

    fn claim_interface(&mut self, interface: u8) -> Result<()>;

    fn release_interface(&mut self, interface: u8) -> Result<()>;

    /// Device-to-host control transfer
    ///
    /// Reads at most `setup.length` bytes into `buf` and returns the number
    /// of bytes the device sent.
    fn control_in(&mut self, setup: &SetupPacket, buf: &mut [u8], timeout: Duration)
    -> Result<usize>;

    /// Host-to-device control transfer
    ///
    /// Sends `setup.length` bytes from `data` and returns the number of bytes
    /// the device accepted.
    fn control_out(&mut self, setup: &SetupPacket, data: &[u8], timeout: Duration) -> Result<usize>;
}
