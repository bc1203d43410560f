//! Control protocol type definitions
//!
//! This module defines the addressing and command types shared by the host
//! and the device: resource identifiers, direction-tagged commands and the
//! version value returned by the device-level version query.

use crate::error::{ProtocolError, Result};
use std::fmt;

/// Resource identifier
///
/// Names one logical resource on the device. Each resource is owned by
/// exactly one interface; the device routes every transfer by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub u8);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for ResourceId {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

/// Reserved resource id for device-level queries (e.g. version)
pub const SPECIAL_RESID: ResourceId = ResourceId(0);

/// Bit 7 of the command byte marks a read (device-to-host) command
pub const COMMAND_READ_BIT: u8 = 0x80;

/// Largest command code that fits beside the direction bit
pub const MAX_COMMAND_CODE: u8 = 0x7F;

/// Transfer direction of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Host to device (OUT data stage)
    Write,
    /// Device to host (IN data stage)
    Read,
}

impl Direction {
    /// bmRequestType direction bit for this direction
    pub const fn request_type_bit(self) -> u8 {
        match self {
            Direction::Write => 0x00,
            Direction::Read => 0x80,
        }
    }
}

/// Raw command code without a direction tag
///
/// Codes are 7 bits wide; the top bit of the wire byte is taken by the
/// direction tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandCode(u8);

impl CommandCode {
    /// Create a command code, rejecting values that collide with the direction bit
    pub fn new(code: u8) -> Result<Self> {
        if code > MAX_COMMAND_CODE {
            return Err(ProtocolError::InvalidCommandCode(code));
        }
        Ok(Self(code))
    }

    /// Get the numeric code
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for CommandCode {
    type Error = ProtocolError;

    fn try_from(code: u8) -> Result<Self> {
        Self::new(code)
    }
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

/// Command code used with [`SPECIAL_RESID`] to query the control version
pub const GET_VERSION: CommandCode = CommandCode(0);

/// Direction-tagged command as carried on the wire
///
/// Two commands with the same code but opposite direction are distinct
/// wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Command(u8);

impl Command {
    /// Tag a code as a read command
    pub const fn read(code: CommandCode) -> Self {
        Self(code.0 | COMMAND_READ_BIT)
    }

    /// Tag a code as a write command
    pub const fn write(code: CommandCode) -> Self {
        Self(code.0 & !COMMAND_READ_BIT)
    }

    /// Tag a code with the given direction
    pub const fn new(code: CommandCode, direction: Direction) -> Self {
        match direction {
            Direction::Read => Self::read(code),
            Direction::Write => Self::write(code),
        }
    }

    /// Interpret a wire byte. Every byte is a valid tagged command.
    pub const fn from_wire(byte: u8) -> Self {
        Self(byte)
    }

    /// Wire byte including the direction bit
    pub const fn to_wire(self) -> u8 {
        self.0
    }

    /// Command code with the direction bit stripped
    pub const fn code(self) -> CommandCode {
        CommandCode(self.0 & MAX_COMMAND_CODE)
    }

    pub const fn direction(self) -> Direction {
        if self.is_read() {
            Direction::Read
        } else {
            Direction::Write
        }
    }

    pub const fn is_read(self) -> bool {
        self.0 & COMMAND_READ_BIT != 0
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction() {
            Direction::Read => "read",
            Direction::Write => "write",
        };
        write!(f, "{}({})", dir, self.code())
    }
}
