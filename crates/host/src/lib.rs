//! Host-side control transport
//!
//! Opens a device through a [`backend::UsbBackend`] and issues
//! resource-addressed commands as single vendor control transfers.
//!
//! # Example
//!
//! ```
//! use common::test_utils::create_test_dispatcher;
//! use host::{ControlSession, LoopbackBackend, SessionConfig};
//! use protocol::{CURRENT_VERSION, CommandCode, ResourceId};
//!
//! let (dispatcher, _memories) = create_test_dispatcher(&[&[5, 7], &[9]]);
//! let mut backend = LoopbackBackend::new(dispatcher, 0x20b1, 0x0008);
//!
//! let config = SessionConfig::new(0x20b1, 0x0008, 0);
//! let mut session = ControlSession::open(&mut backend, &config).unwrap();
//! assert_eq!(session.query_version().unwrap(), CURRENT_VERSION);
//!
//! let cmd = CommandCode::new(1).unwrap();
//! session.write_command(ResourceId(9), cmd, &[1, 2, 3]).unwrap();
//! let mut buf = [0u8; 3];
//! session.read_command(ResourceId(9), cmd, &mut buf).unwrap();
//! assert_eq!(buf, [1, 2, 3]);
//!
//! session.close().unwrap();
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod loopback;
#[cfg(feature = "libusb")]
pub mod rusb_backend;
pub mod session;

pub use backend::{ControlPipe, UsbBackend};
pub use error::{Result, TransportError};
pub use loopback::{LoopbackBackend, LoopbackPipe};
#[cfg(feature = "libusb")]
pub use rusb_backend::{RusbBackend, RusbPipe};
pub use session::{ControlSession, DEFAULT_TIMEOUT, SessionConfig};
