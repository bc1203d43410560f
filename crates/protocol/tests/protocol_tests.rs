//! Integration tests for header packing
//!
//! Verifies that host-side encoding and device-side decoding agree for the
//! full range of every field, and that the version-query sentinel is
//! recognised identically through both paths.

use proptest::prelude::*;
use protocol::{
    Command, CommandCode, ControlVersion, Direction, GET_VERSION, HeaderFields, MAX_COMMAND_CODE,
    ProtocolError, ResourceId, SPECIAL_RESID, SetupPacket, Transaction, decode_header,
    encode_header,
};

fn direction_strategy() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Read), Just(Direction::Write)]
}

proptest! {
    /// Property: decode(encode(x)) == x for every resid, code, direction and length
    #[test]
    fn prop_header_roundtrip(
        resid in any::<u8>(),
        code in 0u8..=MAX_COMMAND_CODE,
        direction in direction_strategy(),
        len in any::<u16>(),
    ) {
        let command = Command::new(CommandCode::new(code).unwrap(), direction);
        let fields = encode_header(ResourceId(resid), command, len as usize).unwrap();
        let decoded = decode_header(&fields).unwrap();

        prop_assert_eq!(decoded.resid, ResourceId(resid));
        prop_assert_eq!(decoded.command, command);
        prop_assert_eq!(decoded.command.code().value(), code);
        prop_assert_eq!(decoded.direction(), direction);
        prop_assert_eq!(decoded.payload_len, len);
    }

    /// Property: the full setup packet survives serialization and validation
    #[test]
    fn prop_setup_packet_roundtrip(
        resid in any::<u8>(),
        code in 0u8..=MAX_COMMAND_CODE,
        direction in direction_strategy(),
        len in any::<u16>(),
    ) {
        let command = Command::new(CommandCode::new(code).unwrap(), direction);
        let transaction = Transaction::new(ResourceId(resid), command, len as usize).unwrap();
        let setup = SetupPacket::for_transaction(&transaction);

        let parsed = SetupPacket::from_bytes(setup.to_bytes());
        prop_assert_eq!(parsed.direction(), direction);
        prop_assert_eq!(parsed.transaction().unwrap(), transaction);
    }

    /// Property: any header with a non-zero reserved byte is rejected
    #[test]
    fn prop_reserved_high_bytes_rejected(
        high in 1u8..=0xFF,
        low in any::<u8>(),
        in_index in any::<bool>(),
    ) {
        let dirty = u16::from_be_bytes([high, low]);
        let fields = if in_index {
            HeaderFields { windex: dirty, wvalue: 0, wlength: 0 }
        } else {
            HeaderFields { windex: 0, wvalue: dirty, wlength: 0 }
        };
        let is_reserved = matches!(
            decode_header(&fields),
            Err(ProtocolError::ReservedBitsSet { .. })
        );
        prop_assert!(is_reserved);
    }
}

#[test]
fn test_opposite_directions_are_distinct_on_the_wire() {
    let code = CommandCode::new(0x11).unwrap();
    let read = encode_header(ResourceId(4), Command::read(code), 8).unwrap();
    let write = encode_header(ResourceId(4), Command::write(code), 8).unwrap();

    assert_eq!(read.windex, write.windex);
    assert_eq!(read.wlength, write.wlength);
    assert_ne!(read.wvalue, write.wvalue);
}

#[test]
fn test_version_query_matches_on_both_sides() {
    let host_side = Transaction::version_query();
    let setup = SetupPacket::for_transaction(&host_side);

    assert_eq!(setup.request_type, 0xC0);
    assert_eq!(setup.length as usize, ControlVersion::SIZE);

    let device_side = SetupPacket::from_bytes(setup.to_bytes())
        .transaction()
        .expect("version query should decode");
    assert!(device_side.is_version_query());
    assert_eq!(device_side.resid, SPECIAL_RESID);
    assert_eq!(device_side.command.code(), GET_VERSION);
}

#[test]
fn test_special_resid_with_other_command_is_not_version_query() {
    let code = CommandCode::new(1).unwrap();
    let t = Transaction::new(SPECIAL_RESID, Command::read(code), 1).unwrap();
    assert!(!t.is_version_query());
}

#[test]
fn test_zero_length_payload() {
    let code = CommandCode::new(7).unwrap();
    let fields = encode_header(ResourceId(200), Command::write(code), 0).unwrap();
    assert_eq!(fields.wlength, 0);
    assert_eq!(decode_header(&fields).unwrap().payload_len, 0);
}
