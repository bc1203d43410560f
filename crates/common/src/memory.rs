//! In-memory interface handlers
//!
//! A register-map interface that stores whatever the host writes and hands
//! it back on reads. Used by the loopback backend to simulate a device and
//! by the test suites.

use device::{Dispatcher, HandlerError, InterfaceHandler, RegistrationError};
use protocol::{Command, CommandCode, ControlVersion, ResourceId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Stored payloads keyed by `(resource, command code)`
pub type Registers = HashMap<(ResourceId, u8), Vec<u8>>;

/// Shared view of a [`MemoryInterface`]'s registers
///
/// Stays usable after the interface has been moved into a dispatcher.
#[derive(Debug, Clone, Default)]
pub struct MemoryHandle {
    registers: Arc<Mutex<Registers>>,
}

impl MemoryHandle {
    fn lock(&self) -> MutexGuard<'_, Registers> {
        self.registers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bytes last written to `(resid, code)`
    pub fn get(&self, resid: u8, code: u8) -> Option<Vec<u8>> {
        self.lock().get(&(ResourceId(resid), code)).cloned()
    }

    /// Preload the value a later read of `(resid, code)` returns
    pub fn set(&self, resid: u8, code: u8, value: &[u8]) {
        self.lock().insert((ResourceId(resid), code), value.to_vec());
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Interface handler backed by a register map
///
/// Writes store the payload under `(resid, code)`. Reads return the stored
/// bytes, zero-filled if nothing was stored, and fail if the stored value
/// is shorter than the requested length.
#[derive(Debug)]
pub struct MemoryInterface {
    resources: Vec<ResourceId>,
    memory: MemoryHandle,
    rejected: HashSet<u8>,
}

impl MemoryInterface {
    pub fn new(resources: &[u8]) -> Self {
        Self {
            resources: resources.iter().copied().map(ResourceId).collect(),
            memory: MemoryHandle::default(),
            rejected: HashSet::new(),
        }
    }

    /// Make every command with this code fail
    pub fn reject_code(mut self, code: u8) -> Self {
        self.rejected.insert(code);
        self
    }

    pub fn handle(&self) -> MemoryHandle {
        self.memory.clone()
    }

    fn check(&self, code: CommandCode, read: bool) -> Result<(), HandlerError> {
        if self.rejected.contains(&code.value()) {
            let command = if read {
                Command::read(code)
            } else {
                Command::write(code)
            };
            return Err(HandlerError::UnsupportedCommand(command));
        }
        Ok(())
    }
}

impl InterfaceHandler for MemoryInterface {
    fn resources(&self) -> &[ResourceId] {
        &self.resources
    }

    fn write_command(
        &mut self,
        resid: ResourceId,
        code: CommandCode,
        payload: &[u8],
    ) -> Result<(), HandlerError> {
        self.check(code, false)?;
        self.memory
            .lock()
            .insert((resid, code.value()), payload.to_vec());
        Ok(())
    }

    fn read_command(
        &mut self,
        resid: ResourceId,
        code: CommandCode,
        payload: &mut [u8],
    ) -> Result<(), HandlerError> {
        self.check(code, true)?;
        match self.memory.lock().get(&(resid, code.value())) {
            Some(stored) if stored.len() < payload.len() => Err(HandlerError::InvalidLength {
                expected: stored.len(),
                actual: payload.len(),
            }),
            Some(stored) => {
                payload.copy_from_slice(&stored[..payload.len()]);
                Ok(())
            }
            None => {
                payload.fill(0);
                Ok(())
            }
        }
    }
}

/// Build a simulated device with one [`MemoryInterface`] per resource list
///
/// Interface `i` owns `layout[i]`.
pub fn build_memory_device<L: AsRef<[u8]>>(
    version: ControlVersion,
    layout: &[L],
) -> Result<(Dispatcher, Vec<MemoryHandle>), RegistrationError> {
    let mut dispatcher = Dispatcher::new(version);
    let mut handles = Vec::with_capacity(layout.len());

    for resources in layout {
        let interface = MemoryInterface::new(resources.as_ref());
        handles.push(interface.handle());
        let ifnum = dispatcher.register(Box::new(interface))?;
        debug!(
            "Memory interface {} owns resources {:?}",
            ifnum,
            resources.as_ref()
        );
    }

    Ok((dispatcher, handles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::CURRENT_VERSION;

    fn code(value: u8) -> CommandCode {
        CommandCode::new(value).unwrap()
    }

    #[test]
    fn test_memory_write_then_read() {
        let mut iface = MemoryInterface::new(&[1]);
        iface.write_command(ResourceId(1), code(2), &[1, 2, 3]).unwrap();

        let mut buf = [0u8; 3];
        iface.read_command(ResourceId(1), code(2), &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(iface.handle().get(1, 2), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_memory_unwritten_reads_zero() {
        let mut iface = MemoryInterface::new(&[1]);
        let mut buf = [0xFFu8; 4];
        iface.read_command(ResourceId(1), code(9), &mut buf).unwrap();
        assert_eq!(buf, [0; 4]);
    }

    #[test]
    fn test_memory_short_value_fails() {
        let mut iface = MemoryInterface::new(&[1]);
        iface.handle().set(1, 2, &[7]);
        let mut buf = [0u8; 4];
        assert!(iface.read_command(ResourceId(1), code(2), &mut buf).is_err());
    }

    #[test]
    fn test_rejected_code() {
        let mut iface = MemoryInterface::new(&[1]).reject_code(5);
        let err = iface.write_command(ResourceId(1), code(5), &[]).unwrap_err();
        assert_eq!(err, HandlerError::UnsupportedCommand(Command::write(code(5))));
    }

    #[test]
    fn test_build_memory_device_rejects_conflicts() {
        let layout: [&[u8]; 2] = [&[5], &[5]];
        let err = build_memory_device(CURRENT_VERSION, &layout).err().unwrap();
        assert!(matches!(err, RegistrationError::Conflict { .. }));
    }

    #[test]
    fn test_build_memory_device_numbers_interfaces_in_order() {
        let layout = vec![vec![1, 2], vec![3], vec![4]];
        let (dispatcher, handles) = build_memory_device(CURRENT_VERSION, &layout).unwrap();
        assert_eq!(handles.len(), 3);
        assert_eq!(dispatcher.table().search(ResourceId(2)), Some(0));
        assert_eq!(dispatcher.table().search(ResourceId(3)), Some(1));
        assert_eq!(dispatcher.table().search(ResourceId(4)), Some(2));
    }
}
