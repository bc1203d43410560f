//! Header field packing and unpacking
//!
//! Every control transaction travels as one USB vendor control transfer. The
//! resource id, direction-tagged command and payload length are packed into
//! the three 16-bit setup fields; the payload itself goes in the data stage.
//!
//! # Packing Version 1
//!
//! ```text
//! bmRequestType  direction | vendor (0x40) | device recipient (0x00)
//! bRequest       0
//! wValue         [0x00][command: u8, bit 7 = read]
//! wIndex         [0x00][resource id: u8]
//! wLength        payload length in bytes
//! ```
//!
//! High bytes of wValue and wIndex are reserved and must be zero. Host and
//! device must both use the same packing version.

use crate::error::{ProtocolError, Result};
use crate::types::{Command, Direction, GET_VERSION, ResourceId, SPECIAL_RESID};
use crate::version::ControlVersion;

/// Header packing revision implemented by this module
pub const PACKING_VERSION: u8 = 1;

/// bRequest used for all control transactions
pub const CONTROL_REQUEST: u8 = 0;

/// bmRequestType type bits: vendor request
pub const REQUEST_TYPE_VENDOR: u8 = 0x40;

/// bmRequestType recipient bits: device
pub const RECIPIENT_DEVICE: u8 = 0x00;

const REQUEST_TYPE_MASK: u8 = 0x7F;

/// Largest payload that fits in wLength
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// The three 16-bit setup fields carrying a transaction header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeaderFields {
    pub windex: u16,
    pub wvalue: u16,
    pub wlength: u16,
}

/// Logical transaction header: who, what and how many bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Transaction {
    pub resid: ResourceId,
    pub command: Command,
    pub payload_len: u16,
}

impl Transaction {
    /// Build a transaction, checking that the payload length fits in wLength
    pub fn new(resid: ResourceId, command: Command, payload_len: usize) -> Result<Self> {
        let payload_len = u16::try_from(payload_len).map_err(|_| ProtocolError::PayloadTooLarge {
            len: payload_len,
            max: MAX_PAYLOAD_LEN,
        })?;
        Ok(Self {
            resid,
            command,
            payload_len,
        })
    }

    /// The device-level version query
    pub const fn version_query() -> Self {
        Self {
            resid: SPECIAL_RESID,
            command: Command::read(GET_VERSION),
            payload_len: ControlVersion::SIZE as u16,
        }
    }

    pub fn is_version_query(&self) -> bool {
        self.resid == SPECIAL_RESID && self.command == Command::read(GET_VERSION)
    }

    pub const fn direction(&self) -> Direction {
        self.command.direction()
    }

    pub const fn header(&self) -> HeaderFields {
        HeaderFields {
            windex: self.resid.0 as u16,
            wvalue: self.command.to_wire() as u16,
            wlength: self.payload_len,
        }
    }
}

/// Pack a resource id, tagged command and payload length into header fields
pub fn encode_header(
    resid: ResourceId,
    command: Command,
    payload_len: usize,
) -> Result<HeaderFields> {
    Transaction::new(resid, command, payload_len).map(|t| t.header())
}

/// Unpack header fields into the transaction they describe
pub fn decode_header(fields: &HeaderFields) -> Result<Transaction> {
    let resid = low_byte(fields.windex, "wIndex")?;
    let command = low_byte(fields.wvalue, "wValue")?;

    Ok(Transaction {
        resid: ResourceId(resid),
        command: Command::from_wire(command),
        payload_len: fields.wlength,
    })
}

fn low_byte(value: u16, field: &'static str) -> Result<u8> {
    u8::try_from(value).map_err(|_| ProtocolError::ReservedBitsSet { field, value })
}

/// Complete 8-byte USB setup packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SetupPacket {
    /// bmRequestType
    pub request_type: u8,
    /// bRequest
    pub request: u8,
    /// wValue
    pub value: u16,
    /// wIndex
    pub index: u16,
    /// wLength
    pub length: u16,
}

impl SetupPacket {
    /// Size of a setup packet on the wire
    pub const SIZE: usize = 8;

    /// bmRequestType for a vendor request to the device in the given direction
    pub const fn request_type_for(direction: Direction) -> u8 {
        direction.request_type_bit() | REQUEST_TYPE_VENDOR | RECIPIENT_DEVICE
    }

    /// Setup packet that carries the given transaction
    pub const fn for_transaction(transaction: &Transaction) -> Self {
        let header = transaction.header();
        Self {
            request_type: Self::request_type_for(transaction.direction()),
            request: CONTROL_REQUEST,
            value: header.wvalue,
            index: header.windex,
            length: header.wlength,
        }
    }

    /// Data stage direction from bit 7 of bmRequestType
    pub const fn direction(&self) -> Direction {
        if self.request_type & 0x80 != 0 {
            Direction::Read
        } else {
            Direction::Write
        }
    }

    pub const fn header(&self) -> HeaderFields {
        HeaderFields {
            windex: self.index,
            wvalue: self.value,
            wlength: self.length,
        }
    }

    /// Decode and validate the transaction carried by this setup packet
    ///
    /// Rejects anything that is not a vendor request 0 to the device, and
    /// setups whose data stage direction disagrees with the command's
    /// direction bit.
    pub fn transaction(&self) -> Result<Transaction> {
        if self.request_type & REQUEST_TYPE_MASK != REQUEST_TYPE_VENDOR | RECIPIENT_DEVICE {
            return Err(ProtocolError::UnsupportedRequestType(self.request_type));
        }
        if self.request != CONTROL_REQUEST {
            return Err(ProtocolError::UnsupportedRequest(self.request));
        }

        let transaction = decode_header(&self.header())?;
        if transaction.direction() != self.direction() {
            return Err(ProtocolError::DirectionMismatch {
                request_type: self.request_type,
                command: transaction.command.to_wire(),
            });
        }
        Ok(transaction)
    }

    /// Serialize in USB (little-endian) field order
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let value = self.value.to_le_bytes();
        let index = self.index.to_le_bytes();
        let length = self.length.to_le_bytes();
        [
            self.request_type,
            self.request,
            value[0],
            value[1],
            index[0],
            index[1],
            length[0],
            length[1],
        ]
    }

    pub fn from_bytes(bytes: [u8; Self::SIZE]) -> Self {
        Self {
            request_type: bytes[0],
            request: bytes[1],
            value: u16::from_le_bytes([bytes[2], bytes[3]]),
            index: u16::from_le_bytes([bytes[4], bytes[5]]),
            length: u16::from_le_bytes([bytes[6], bytes[7]]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CommandCode;

    fn code(value: u8) -> CommandCode {
        CommandCode::new(value).unwrap()
    }

    #[test]
    fn test_header_layout() {
        let fields = encode_header(ResourceId(0x2A), Command::read(code(0x05)), 12).unwrap();
        assert_eq!(fields.windex, 0x002A);
        assert_eq!(fields.wvalue, 0x0085);
        assert_eq!(fields.wlength, 12);

        let fields = encode_header(ResourceId(0x2A), Command::write(code(0x05)), 12).unwrap();
        assert_eq!(fields.wvalue, 0x0005);
    }

    #[test]
    fn test_payload_too_large() {
        let result = encode_header(ResourceId(1), Command::write(code(1)), MAX_PAYLOAD_LEN + 1);
        assert!(matches!(
            result,
            Err(ProtocolError::PayloadTooLarge { len: 65_536, .. })
        ));
        assert!(encode_header(ResourceId(1), Command::write(code(1)), MAX_PAYLOAD_LEN).is_ok());
    }

    #[test]
    fn test_decode_rejects_reserved_bits() {
        let fields = HeaderFields {
            windex: 0x0100,
            wvalue: 0x0001,
            wlength: 0,
        };
        assert!(matches!(
            decode_header(&fields),
            Err(ProtocolError::ReservedBitsSet { field: "wIndex", .. })
        ));

        let fields = HeaderFields {
            windex: 0x0001,
            wvalue: 0x8001,
            wlength: 0,
        };
        assert!(matches!(
            decode_header(&fields),
            Err(ProtocolError::ReservedBitsSet { field: "wValue", .. })
        ));
    }

    #[test]
    fn test_version_query_sentinel() {
        let query = Transaction::version_query();
        assert!(query.is_version_query());
        assert_eq!(query.payload_len as usize, ControlVersion::SIZE);

        let decoded = decode_header(&query.header()).unwrap();
        assert!(decoded.is_version_query());

        // Same resid, write direction: not a version query
        let write = Transaction::new(SPECIAL_RESID, Command::write(GET_VERSION), 1).unwrap();
        assert!(!write.is_version_query());
    }

    #[test]
    fn test_setup_packet_request_type() {
        let read = Transaction::new(ResourceId(3), Command::read(code(1)), 4).unwrap();
        let setup = SetupPacket::for_transaction(&read);
        assert_eq!(setup.request_type, 0xC0);
        assert_eq!(setup.request, CONTROL_REQUEST);
        assert_eq!(setup.transaction().unwrap(), read);

        let write = Transaction::new(ResourceId(3), Command::write(code(1)), 4).unwrap();
        let setup = SetupPacket::for_transaction(&write);
        assert_eq!(setup.request_type, 0x40);
        assert_eq!(setup.transaction().unwrap(), write);
    }

    #[test]
    fn test_setup_packet_validation() {
        let t = Transaction::new(ResourceId(3), Command::read(code(1)), 4).unwrap();
        let good = SetupPacket::for_transaction(&t);

        let class_request = SetupPacket {
            request_type: 0xA1,
            ..good
        };
        assert!(matches!(
            class_request.transaction(),
            Err(ProtocolError::UnsupportedRequestType(0xA1))
        ));

        let other_request = SetupPacket { request: 6, ..good };
        assert!(matches!(
            other_request.transaction(),
            Err(ProtocolError::UnsupportedRequest(6))
        ));

        let wrong_direction = SetupPacket {
            request_type: 0x40,
            ..good
        };
        assert!(matches!(
            wrong_direction.transaction(),
            Err(ProtocolError::DirectionMismatch { .. })
        ));
    }

    #[test]
    fn test_setup_packet_bytes() {
        let t = Transaction::new(ResourceId(9), Command::read(code(2)), 0x0104).unwrap();
        let setup = SetupPacket::for_transaction(&t);
        let bytes = setup.to_bytes();
        assert_eq!(bytes, [0xC0, 0x00, 0x82, 0x00, 0x09, 0x00, 0x04, 0x01]);
        assert_eq!(SetupPacket::from_bytes(bytes), setup);
    }
}
