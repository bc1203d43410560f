//! In-process loopback backend
//!
//! Connects a host control session directly to a device-side
//! [`Dispatcher`], so the full host to device path can run without hardware.
//! Dispatch errors surface as STALLs, the way a real device reports them.

use crate::backend::{ControlPipe, UsbBackend};
use crate::error::{Result, TransportError};
use device::Dispatcher;
use protocol::SetupPacket;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

/// Backend exposing one simulated device
pub struct LoopbackBackend {
    device: Arc<Mutex<Dispatcher>>,
    vendor_id: u16,
    product_id: u16,
}

impl LoopbackBackend {
    pub fn new(dispatcher: Dispatcher, vendor_id: u16, product_id: u16) -> Self {
        Self {
            device: Arc::new(Mutex::new(dispatcher)),
            vendor_id,
            product_id,
        }
    }

    /// Shared handle to the simulated device
    pub fn dispatcher(&self) -> Arc<Mutex<Dispatcher>> {
        Arc::clone(&self.device)
    }
}

impl UsbBackend for LoopbackBackend {
    type Pipe = LoopbackPipe;

    fn open(&mut self, vendor_id: u16, product_id: u16) -> Result<LoopbackPipe> {
        if (vendor_id, product_id) != (self.vendor_id, self.product_id) {
            return Err(TransportError::DeviceNotFound {
                vendor_id,
                product_id,
            });
        }
        debug!("Opened loopback device {:04x}:{:04x}", vendor_id, product_id);
        Ok(LoopbackPipe {
            device: Arc::clone(&self.device),
            configuration: None,
            claimed: Vec::new(),
        })
    }
}

/// Control pipe into a simulated device
pub struct LoopbackPipe {
    device: Arc<Mutex<Dispatcher>>,
    configuration: Option<u8>,
    claimed: Vec<u8>,
}

impl LoopbackPipe {
    pub fn configuration(&self) -> Option<u8> {
        self.configuration
    }

    pub fn claimed_interfaces(&self) -> &[u8] {
        &self.claimed
    }

    fn lock(&self) -> MutexGuard<'_, Dispatcher> {
        self.device.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self, setup: &SetupPacket, data: &mut [u8]) -> Result<usize> {
        self.lock().handle_setup(setup, data).map_err(|e| {
            debug!("Loopback device stalled request: {}", e);
            TransportError::Stall
        })
    }
}

impl ControlPipe for LoopbackPipe {
    fn set_configuration(&mut self, configuration: u8) -> Result<()> {
        if configuration == 0 {
            return Err(TransportError::ConfigurationFailed {
                configuration,
                message: "configuration 0 leaves the device unconfigured".to_string(),
            });
        }
        self.configuration = Some(configuration);
        Ok(())
    }

    fn claim_interface(&mut self, interface: u8) -> Result<()> {
        if self.claimed.contains(&interface) {
            return Err(TransportError::ClaimInterfaceFailed {
                interface,
                message: "already claimed".to_string(),
            });
        }
        self.claimed.push(interface);
        Ok(())
    }

    fn release_interface(&mut self, interface: u8) -> Result<()> {
        let index = self
            .claimed
            .iter()
            .position(|&i| i == interface)
            .ok_or_else(|| TransportError::ReleaseInterfaceFailed {
                interface,
                message: "not claimed".to_string(),
            })?;
        self.claimed.remove(index);
        Ok(())
    }

    fn control_in(
        &mut self,
        setup: &SetupPacket,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> Result<usize> {
        let len = setup.length as usize;
        let available = buf.len();
        let buf = buf.get_mut(..len).ok_or(TransportError::BufferTooSmall {
            needed: len,
            available,
        })?;
        self.dispatch(setup, buf)
    }

    fn control_out(&mut self, setup: &SetupPacket, data: &[u8], _timeout: Duration) -> Result<usize> {
        let len = setup.length as usize;
        let mut stage = data
            .get(..len)
            .ok_or(TransportError::BufferTooSmall {
                needed: len,
                available: data.len(),
            })?
            .to_vec();
        self.dispatch(setup, &mut stage)
    }
}
