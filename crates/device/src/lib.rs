//! Device-side control protocol support
//!
//! This crate provides the firmware half of the control protocol: the
//! resource table that maps resource ids to interface numbers, and the
//! dispatcher that decodes incoming vendor control requests and hands them
//! to the owning interface.
//!
//! # Example
//!
//! ```
//! use device::ResourceTable;
//! use protocol::ResourceId;
//!
//! let mut table: ResourceTable = ResourceTable::new(ResourceId(255));
//! table.add(&[ResourceId(5), ResourceId(7)], 0).unwrap();
//! table.add(&[ResourceId(9)], 1).unwrap();
//!
//! assert_eq!(table.search(ResourceId(7)), Some(0));
//! assert_eq!(table.search(ResourceId(9)), Some(1));
//! assert_eq!(table.search(ResourceId(255)), None);
//! ```

pub mod dispatch;
pub mod error;
pub mod resource_table;

pub use dispatch::{Dispatcher, InterfaceHandler};
pub use error::{DispatchError, HandlerError, RegistrationError, Result};
pub use resource_table::{MAX_INTERFACES, MAX_RESOURCES_PER_INTERFACE, ResourceTable};
