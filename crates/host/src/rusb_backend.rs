//! libusb backend
//!
//! Implements the backend traits on top of rusb. Kernel drivers are
//! detached before claiming an interface and reattached when it is
//! released.

use crate::backend::{ControlPipe, UsbBackend};
use crate::error::{Result, TransportError};
use protocol::SetupPacket;
use rusb::{Context, DeviceHandle, UsbContext};
use std::time::Duration;
use tracing::{debug, warn};

/// Summary of an enumerated USB device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbDeviceSummary {
    pub vendor_id: u16,
    pub product_id: u16,
    pub bus_number: u8,
    pub address: u8,
}

/// Backend using the system libusb
pub struct RusbBackend {
    context: Context,
}

impl RusbBackend {
    pub fn new() -> Result<Self> {
        let context = Context::new().map_err(|e| {
            warn!("Failed to initialise libusb: {}", e);
            TransportError::Usb(e.to_string())
        })?;
        Ok(Self { context })
    }

    /// Enumerate all connected devices
    pub fn list_devices(&self) -> Result<Vec<UsbDeviceSummary>> {
        let devices = self
            .context
            .devices()
            .map_err(|e| TransportError::Usb(e.to_string()))?;

        let mut summaries = Vec::new();
        for device in devices.iter() {
            match device.device_descriptor() {
                Ok(descriptor) => summaries.push(UsbDeviceSummary {
                    vendor_id: descriptor.vendor_id(),
                    product_id: descriptor.product_id(),
                    bus_number: device.bus_number(),
                    address: device.address(),
                }),
                Err(e) => debug!(
                    "Skipping device {}:{}: {}",
                    device.bus_number(),
                    device.address(),
                    e
                ),
            }
        }
        Ok(summaries)
    }
}

impl UsbBackend for RusbBackend {
    type Pipe = RusbPipe;

    fn open(&mut self, vendor_id: u16, product_id: u16) -> Result<RusbPipe> {
        let devices = self
            .context
            .devices()
            .map_err(|e| TransportError::Usb(e.to_string()))?;

        for device in devices.iter() {
            let Ok(descriptor) = device.device_descriptor() else {
                continue;
            };
            if descriptor.vendor_id() != vendor_id || descriptor.product_id() != product_id {
                continue;
            }

            let handle = device.open().map_err(|e| {
                warn!("Failed to open device: {}", e);
                TransportError::OpenFailed(e.to_string())
            })?;
            debug!(
                "Opened device {:04x}:{:04x} at bus {} address {}",
                vendor_id,
                product_id,
                device.bus_number(),
                device.address()
            );
            return Ok(RusbPipe {
                handle,
                detached: Vec::new(),
            });
        }

        Err(TransportError::DeviceNotFound {
            vendor_id,
            product_id,
        })
    }
}

/// Open libusb device handle
pub struct RusbPipe {
    handle: DeviceHandle<Context>,
    /// Interfaces whose kernel driver we detached
    detached: Vec<u8>,
}

impl ControlPipe for RusbPipe {
    fn set_configuration(&mut self, configuration: u8) -> Result<()> {
        if self.handle.active_configuration().ok() == Some(configuration) {
            debug!("Configuration {} already active", configuration);
            return Ok(());
        }
        self.handle
            .set_active_configuration(configuration)
            .map_err(|e| TransportError::ConfigurationFailed {
                configuration,
                message: e.to_string(),
            })
    }

    fn claim_interface(&mut self, interface: u8) -> Result<()> {
        match self.handle.kernel_driver_active(interface) {
            Ok(true) => {
                debug!("Detaching kernel driver from interface {}", interface);
                match self.handle.detach_kernel_driver(interface) {
                    Ok(()) => self.detached.push(interface),
                    Err(e) => warn!(
                        "Failed to detach kernel driver from interface {}: {}",
                        interface, e
                    ),
                }
            }
            Ok(false) => {}
            Err(e) => debug!(
                "Could not check kernel driver status for interface {}: {}",
                interface, e
            ),
        }

        self.handle
            .claim_interface(interface)
            .map_err(|e| TransportError::ClaimInterfaceFailed {
                interface,
                message: e.to_string(),
            })
    }

    fn release_interface(&mut self, interface: u8) -> Result<()> {
        self.handle
            .release_interface(interface)
            .map_err(|e| TransportError::ReleaseInterfaceFailed {
                interface,
                message: e.to_string(),
            })?;

        if let Some(index) = self.detached.iter().position(|&i| i == interface) {
            self.detached.remove(index);
            if let Err(e) = self.handle.attach_kernel_driver(interface) {
                debug!(
                    "Could not reattach kernel driver to interface {}: {}",
                    interface, e
                );
            }
        }
        Ok(())
    }

    fn control_in(
        &mut self,
        setup: &SetupPacket,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize> {
        let len = setup.length as usize;
        let available = buf.len();
        let buf = buf.get_mut(..len).ok_or(TransportError::BufferTooSmall {
            needed: len,
            available,
        })?;

        self.handle
            .read_control(
                setup.request_type,
                setup.request,
                setup.value,
                setup.index,
                buf,
                timeout,
            )
            .map_err(|e| map_rusb_error(e, timeout))
    }

    fn control_out(&mut self, setup: &SetupPacket, data: &[u8], timeout: Duration) -> Result<usize> {
        let len = setup.length as usize;
        let data = data.get(..len).ok_or(TransportError::BufferTooSmall {
            needed: len,
            available: data.len(),
        })?;

        self.handle
            .write_control(
                setup.request_type,
                setup.request,
                setup.value,
                setup.index,
                data,
                timeout,
            )
            .map_err(|e| map_rusb_error(e, timeout))
    }
}

/// Map rusb::Error to a transport error
pub fn map_rusb_error(err: rusb::Error, timeout: Duration) -> TransportError {
    match err {
        rusb::Error::Timeout => TransportError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        },
        rusb::Error::Pipe => TransportError::Stall,
        rusb::Error::NoDevice => TransportError::Disconnected,
        _ => TransportError::Usb(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_rusb_error() {
        let timeout = Duration::from_millis(100);
        assert!(matches!(
            map_rusb_error(rusb::Error::Timeout, timeout),
            TransportError::Timeout { timeout_ms: 100 }
        ));
        assert!(matches!(
            map_rusb_error(rusb::Error::Pipe, timeout),
            TransportError::Stall
        ));
        assert!(matches!(
            map_rusb_error(rusb::Error::NoDevice, timeout),
            TransportError::Disconnected
        ));
        assert!(matches!(
            map_rusb_error(rusb::Error::Busy, timeout),
            TransportError::Usb(_)
        ));
    }
}
