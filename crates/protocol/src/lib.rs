//! Protocol library for usb-devctl
//!
//! This crate defines the wire contract between the host and the device:
//! resource identifiers, direction-tagged commands, the control version value
//! and the packing of a transaction header into USB setup fields.
//!
//! # Example
//!
//! ```
//! use protocol::{Command, CommandCode, ResourceId, decode_header, encode_header};
//!
//! let cmd = Command::read(CommandCode::new(0x03).unwrap());
//! let fields = encode_header(ResourceId(5), cmd, 16).unwrap();
//!
//! let decoded = decode_header(&fields).unwrap();
//! assert_eq!(decoded.resid, ResourceId(5));
//! assert_eq!(decoded.command, cmd);
//! assert_eq!(decoded.payload_len, 16);
//! ```

pub mod codec;
pub mod error;
pub mod types;
pub mod version;

pub use codec::{
    CONTROL_REQUEST, HeaderFields, MAX_PAYLOAD_LEN, PACKING_VERSION, SetupPacket, Transaction,
    decode_header, encode_header,
};
pub use error::{ProtocolError, Result};
pub use types::{
    COMMAND_READ_BIT, Command, CommandCode, Direction, GET_VERSION, MAX_COMMAND_CODE, ResourceId,
    SPECIAL_RESID,
};
pub use version::{CURRENT_VERSION, ControlVersion};
