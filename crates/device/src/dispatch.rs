//! Control request dispatch
//!
//! Receives the setup packet and data stage of each vendor control request,
//! answers the device-level version query itself, and routes everything
//! else through the resource table to the owning interface handler.
//!
//! Any error returned from [`Dispatcher::handle_setup`] should be reported to
//! the host as a STALL on endpoint 0.

use crate::error::{DispatchError, HandlerError, RegistrationError, Result};
use crate::resource_table::{MAX_INTERFACES, ResourceTable};
use protocol::{
    CommandCode, ControlVersion, Direction, ProtocolError, ResourceId, SPECIAL_RESID, SetupPacket,
};
use tracing::{debug, info, warn};

/// Firmware module servicing a set of resources
pub trait InterfaceHandler: Send {
    /// Resource ids this interface owns
    fn resources(&self) -> &[ResourceId];

    /// Handle a write command; `payload` holds exactly wLength bytes
    fn write_command(
        &mut self,
        resid: ResourceId,
        code: CommandCode,
        payload: &[u8],
    ) -> std::result::Result<(), HandlerError>;

    /// Handle a read command by filling all of `payload`
    fn read_command(
        &mut self,
        resid: ResourceId,
        code: CommandCode,
        payload: &mut [u8],
    ) -> std::result::Result<(), HandlerError>;
}

/// Device-side control request router
pub struct Dispatcher {
    version: ControlVersion,
    table: ResourceTable,
    handlers: Vec<Box<dyn InterfaceHandler>>,
}

impl Dispatcher {
    /// Create a dispatcher with an empty table reserved on [`SPECIAL_RESID`]
    pub fn new(version: ControlVersion) -> Self {
        Self {
            version,
            table: ResourceTable::new(SPECIAL_RESID),
            handlers: Vec::new(),
        }
    }

    /// Register an interface handler and its resources
    ///
    /// Interface numbers are assigned in registration order starting at 0.
    pub fn register(
        &mut self,
        handler: Box<dyn InterfaceHandler>,
    ) -> std::result::Result<u8, RegistrationError> {
        if self.handlers.len() >= MAX_INTERFACES {
            return Err(RegistrationError::TooManyInterfaces {
                ifnum: self.handlers.len(),
                max: MAX_INTERFACES,
            });
        }
        let ifnum = self.handlers.len() as u8;

        self.table.add(handler.resources(), ifnum)?;
        info!(
            "Registered interface {} with {} resources",
            ifnum,
            handler.resources().len()
        );
        self.handlers.push(handler);
        Ok(ifnum)
    }

    pub fn table(&self) -> &ResourceTable {
        &self.table
    }

    pub fn version(&self) -> ControlVersion {
        self.version
    }

    /// Service one control request
    ///
    /// For OUT requests `data` holds the data stage; for IN requests the
    /// response is written to `data[..wLength]`. Returns the data stage
    /// length on success.
    pub fn handle_setup(&mut self, setup: &SetupPacket, data: &mut [u8]) -> Result<usize> {
        let transaction = setup.transaction().inspect_err(|e| {
            warn!("Rejected setup packet {:02x?}: {}", setup.to_bytes(), e);
        })?;

        let len = transaction.payload_len as usize;
        if data.len() < len {
            return Err(DispatchError::BufferTooSmall {
                needed: len,
                available: data.len(),
            });
        }
        let data = &mut data[..len];

        debug!(
            "Control request: resid={}, cmd={}, len={}",
            transaction.resid, transaction.command, len
        );

        if transaction.is_version_query() {
            if len != ControlVersion::SIZE {
                return Err(ProtocolError::InvalidVersionLength {
                    expected: ControlVersion::SIZE,
                    actual: len,
                }
                .into());
            }
            data.copy_from_slice(&self.version.to_bytes());
            return Ok(len);
        }

        let resid = transaction.resid;
        let ifnum = self
            .table
            .search(resid)
            .ok_or(DispatchError::UnknownResource(resid))?;
        let handler = self
            .handlers
            .get_mut(ifnum as usize)
            .ok_or(DispatchError::UnknownResource(resid))?;

        let code = transaction.command.code();
        let result = match transaction.direction() {
            Direction::Read => handler.read_command(resid, code, data),
            Direction::Write => handler.write_command(resid, code, data),
        };

        result.map_err(|source| {
            warn!("Interface {} failed {}: {}", ifnum, transaction.command, source);
            DispatchError::Handler { ifnum, source }
        })?;
        Ok(len)
    }
}
