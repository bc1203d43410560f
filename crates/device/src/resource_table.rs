//! Resource routing table
//!
//! Maps resource ids to the interface that services them. Each interface
//! registers its full resource list once during bring-up; afterwards the
//! table is only read, once per incoming control request.
//!
//! Storage is a fixed arena of per-interface slots sized by const generics,
//! so lookups never allocate and the table never grows.

use crate::error::RegistrationError;
use protocol::ResourceId;
use tracing::{debug, warn};

/// Default number of resources a single interface may own
pub const MAX_RESOURCES_PER_INTERFACE: usize = 64;

/// Default number of interfaces the table holds slots for
pub const MAX_INTERFACES: usize = 4;

#[derive(Debug, Clone, Copy)]
struct InterfaceSlot<const N: usize> {
    ifnum: u8,
    resources: [ResourceId; N],
    len: usize,
}

impl<const N: usize> InterfaceSlot<N> {
    fn new(ifnum: u8) -> Self {
        Self {
            ifnum,
            resources: [ResourceId(0); N],
            len: 0,
        }
    }

    fn resources(&self) -> &[ResourceId] {
        &self.resources[..self.len]
    }

    fn contains(&self, resid: ResourceId) -> bool {
        self.resources().contains(&resid)
    }
}

/// Fixed-capacity registry of resource ownership
///
/// Re-registering a resource to the interface that already owns it is
/// idempotent. Registering it to any other interface fails.
#[derive(Debug, Clone)]
pub struct ResourceTable<
    const INTERFACES: usize = MAX_INTERFACES,
    const PER_INTERFACE: usize = MAX_RESOURCES_PER_INTERFACE,
> {
    reserved: ResourceId,
    slots: [Option<InterfaceSlot<PER_INTERFACE>>; INTERFACES],
}

impl<const INTERFACES: usize, const PER_INTERFACE: usize> ResourceTable<INTERFACES, PER_INTERFACE> {
    /// Create an empty table reserving `reserved_id` for device-level queries
    pub fn new(reserved_id: ResourceId) -> Self {
        Self {
            reserved: reserved_id,
            slots: [None; INTERFACES],
        }
    }

    /// Clear all entries and record a new reserved id
    pub fn reset(&mut self, reserved_id: ResourceId) {
        self.reserved = reserved_id;
        self.slots = [None; INTERFACES];
    }

    pub fn reserved_id(&self) -> ResourceId {
        self.reserved
    }

    /// Maximum number of resources across all interfaces
    pub const fn capacity(&self) -> usize {
        INTERFACES * PER_INTERFACE
    }

    /// Number of registered resources
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().map(|slot| slot.len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register `resources` as owned by interface `ifnum`
    ///
    /// The whole list is validated before anything is written: on error the
    /// table is left unchanged.
    pub fn add(&mut self, resources: &[ResourceId], ifnum: u8) -> Result<(), RegistrationError> {
        let mut new_count = 0;
        for (i, &resid) in resources.iter().enumerate() {
            if resid == self.reserved {
                warn!("Interface {} tried to register reserved id {}", ifnum, resid);
                return Err(RegistrationError::ReservedId { resid });
            }
            match self.owner(resid) {
                Some(owner) if owner != ifnum => {
                    warn!(
                        "Resource {} on interface {} conflicts with interface {}",
                        resid, ifnum, owner
                    );
                    return Err(RegistrationError::Conflict {
                        resid,
                        owner,
                        requested: ifnum,
                    });
                }
                Some(_) => {}
                None if resources[..i].contains(&resid) => {}
                None => new_count += 1,
            }
        }

        if new_count == 0 {
            debug!("Interface {}: nothing new to register", ifnum);
            return Ok(());
        }

        let index = self.slot_index(ifnum)?;
        let current = self.slots[index].as_ref().map_or(0, |slot| slot.len);

        let requested = current + new_count;
        if requested > PER_INTERFACE {
            warn!(
                "Interface {} would own {} resources (max {})",
                ifnum, requested, PER_INTERFACE
            );
            return Err(RegistrationError::CapacityExceeded {
                ifnum,
                requested,
                max: PER_INTERFACE,
            });
        }

        let slot = self.slots[index].get_or_insert_with(|| InterfaceSlot::new(ifnum));
        for &resid in resources {
            if !slot.contains(resid) {
                slot.resources[slot.len] = resid;
                slot.len += 1;
            }
        }

        debug!(
            "Interface {} registered {} new resources ({} total)",
            ifnum, new_count, slot.len
        );
        Ok(())
    }

    /// Look up the interface that services `resid`
    ///
    /// Returns `None` for unregistered ids and for the reserved id.
    pub fn search(&self, resid: ResourceId) -> Option<u8> {
        if resid == self.reserved {
            return None;
        }
        self.owner(resid)
    }

    /// Resources registered to `ifnum`, in registration order
    pub fn resources_of(&self, ifnum: u8) -> &[ResourceId] {
        self.slots
            .iter()
            .flatten()
            .find(|slot| slot.ifnum == ifnum)
            .map(|slot| slot.resources())
            .unwrap_or(&[])
    }

    /// Iterate over all `(resource, interface)` entries
    pub fn iter(&self) -> impl Iterator<Item = (ResourceId, u8)> + '_ {
        self.slots
            .iter()
            .flatten()
            .flat_map(|slot| slot.resources().iter().map(move |&r| (r, slot.ifnum)))
    }

    fn owner(&self, resid: ResourceId) -> Option<u8> {
        self.slots
            .iter()
            .flatten()
            .find(|slot| slot.contains(resid))
            .map(|slot| slot.ifnum)
    }

    fn slot_index(&self, ifnum: u8) -> Result<usize, RegistrationError> {
        let existing = self
            .slots
            .iter()
            .position(|slot| matches!(slot, Some(s) if s.ifnum == ifnum));
        existing
            .or_else(|| self.slots.iter().position(Option::is_none))
            .ok_or(RegistrationError::TooManyInterfaces {
                ifnum: ifnum as usize,
                max: INTERFACES,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[u8]) -> Vec<ResourceId> {
        values.iter().copied().map(ResourceId).collect()
    }

    #[test]
    fn test_new_table_is_empty() {
        let table: ResourceTable = ResourceTable::new(ResourceId(255));
        assert!(table.is_empty());
        assert_eq!(table.reserved_id(), ResourceId(255));
        assert_eq!(
            table.capacity(),
            MAX_INTERFACES * MAX_RESOURCES_PER_INTERFACE
        );
        assert_eq!(table.search(ResourceId(1)), None);
    }

    #[test]
    fn test_add_and_search() {
        let mut table: ResourceTable = ResourceTable::new(ResourceId(0));
        table.add(&ids(&[1, 2, 3]), 2).unwrap();

        assert_eq!(table.search(ResourceId(1)), Some(2));
        assert_eq!(table.search(ResourceId(3)), Some(2));
        assert_eq!(table.search(ResourceId(4)), None);
        assert_eq!(table.len(), 3);
        assert_eq!(table.resources_of(2), ids(&[1, 2, 3]).as_slice());
        assert!(table.resources_of(7).is_empty());
    }

    #[test]
    fn test_reserved_id_rejected() {
        let mut table: ResourceTable = ResourceTable::new(ResourceId(0));
        let err = table.add(&ids(&[4, 0]), 1).unwrap_err();
        assert_eq!(
            err,
            RegistrationError::ReservedId {
                resid: ResourceId(0)
            }
        );
        assert_eq!(table.search(ResourceId(4)), None);
    }

    #[test]
    fn test_duplicates_within_list_counted_once() {
        let mut table: ResourceTable<1, 2> = ResourceTable::new(ResourceId(0));
        table.add(&ids(&[7, 7, 8, 7]), 0).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_interface_capacity() {
        let mut table: ResourceTable<2, 2> = ResourceTable::new(ResourceId(0));
        table.add(&ids(&[1, 2]), 0).unwrap();

        let err = table.add(&ids(&[3]), 0).unwrap_err();
        assert_eq!(
            err,
            RegistrationError::CapacityExceeded {
                ifnum: 0,
                requested: 3,
                max: 2
            }
        );

        // A fresh interface whose list is too long does not keep a slot
        assert!(table.add(&ids(&[4, 5, 6]), 1).is_err());
        table.add(&ids(&[4, 5]), 1).unwrap();
        assert_eq!(table.search(ResourceId(5)), Some(1));
    }

    #[test]
    fn test_too_many_interfaces() {
        let mut table: ResourceTable<2, 4> = ResourceTable::new(ResourceId(0));
        table.add(&ids(&[1]), 0).unwrap();
        table.add(&ids(&[2]), 1).unwrap();

        let err = table.add(&ids(&[3]), 2).unwrap_err();
        assert_eq!(
            err,
            RegistrationError::TooManyInterfaces { ifnum: 2, max: 2 }
        );
    }

    #[test]
    fn test_reset_clears_entries() {
        let mut table: ResourceTable = ResourceTable::new(ResourceId(0));
        table.add(&ids(&[1, 2]), 0).unwrap();
        table.reset(ResourceId(1));

        assert!(table.is_empty());
        assert_eq!(table.reserved_id(), ResourceId(1));
        assert_eq!(table.search(ResourceId(2)), None);
        assert!(table.add(&ids(&[1]), 0).is_err());
    }

    #[test]
    fn test_iter_entries() {
        let mut table: ResourceTable = ResourceTable::new(ResourceId(0));
        table.add(&ids(&[5, 7]), 0).unwrap();
        table.add(&ids(&[9]), 1).unwrap();

        let entries: Vec<_> = table.iter().collect();
        assert_eq!(
            entries,
            vec![(ResourceId(5), 0), (ResourceId(7), 0), (ResourceId(9), 1)]
        );
    }
}
