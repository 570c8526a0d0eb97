//! Multiplex opcode layout.
//!
//! Register opcodes use the high nibble for the command family, bits 2-3
//! for the value resolution and bits 0-1 for a short register count.
//! A zero count means an explicit count byte follows the opcode.

use crate::resolution::Resolution;

/// Write registers (values follow).
pub const WRITE_BASE: u8 = 0x00;

/// Read registers (no values, the device replies).
pub const READ_BASE: u8 = 0x10;

/// Reply to a read (values follow).
pub const REPLY_BASE: u8 = 0x20;

/// Device could not write a register.
pub const WRITE_ERROR: u8 = 0x30;

/// Device could not read a register.
pub const READ_ERROR: u8 = 0x31;

/// Padding byte.
pub const NOP: u8 = 0x50;

pub const WRITE_INT8: u8 = WRITE_BASE;
pub const WRITE_INT16: u8 = WRITE_BASE | 0x04;
pub const WRITE_INT32: u8 = WRITE_BASE | 0x08;
pub const WRITE_FLOAT: u8 = WRITE_BASE | 0x0c;

/// Largest count encodable in the opcode itself.
pub const MAX_SHORT_COUNT: u8 = 0x03;

pub(crate) const FAMILY_MASK: u8 = 0xf0;
pub(crate) const COUNT_MASK: u8 = 0x03;
pub(crate) const RESOLUTION_SHIFT: u8 = 2;

/// Register command family, selecting the high nibble of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Write,
    Read,
    Reply,
}

impl Command {
    pub const fn base(self) -> u8 {
        match self {
            Command::Write => WRITE_BASE,
            Command::Read => READ_BASE,
            Command::Reply => REPLY_BASE,
        }
    }

    /// Opcode for a run of `resolution` values, with a zero count field.
    ///
    /// # Panics
    ///
    /// `Resolution::Ignore` has no opcode.
    pub fn opcode(self, resolution: Resolution) -> u8 {
        self.base() | (resolution.selector() << RESOLUTION_SHIFT)
    }

    /// True when values are encoded after the register address.
    pub const fn carries_values(self) -> bool {
        !matches!(self, Command::Read)
    }

    pub(crate) fn from_opcode(opcode: u8) -> Option<Self> {
        match opcode & FAMILY_MASK {
            WRITE_BASE => Some(Command::Write),
            READ_BASE => Some(Command::Read),
            REPLY_BASE => Some(Command::Reply),
            _ => None,
        }
    }
}

/// Returns a human-readable name for an opcode.
pub fn opcode_name(opcode: u8) -> &'static str {
    match opcode {
        NOP => "NOP",
        WRITE_ERROR => "WRITE_ERROR",
        READ_ERROR => "READ_ERROR",
        0x00..=0x0f => "WRITE",
        0x10..=0x1f => "READ",
        0x20..=0x2f => "REPLY",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_families() {
        assert_eq!(Command::from_opcode(0x01), Some(Command::Write));
        assert_eq!(Command::from_opcode(0x1e), Some(Command::Read));
        assert_eq!(Command::from_opcode(0x2d), Some(Command::Reply));
        assert_eq!(Command::from_opcode(WRITE_ERROR), None);
        assert_eq!(Command::from_opcode(READ_ERROR), None);
        assert_eq!(Command::from_opcode(NOP), None);
    }

    #[test]
    fn opcodes_carry_resolution() {
        assert_eq!(Command::Write.opcode(Resolution::Int8), WRITE_INT8);
        assert_eq!(Command::Write.opcode(Resolution::Float), WRITE_FLOAT);
        assert_eq!(Command::Read.opcode(Resolution::Int16), 0x14);
        assert_eq!(Command::Reply.opcode(Resolution::Int32), 0x28);
    }

    #[test]
    fn only_reads_omit_values() {
        assert!(Command::Write.carries_values());
        assert!(Command::Reply.carries_values());
        assert!(!Command::Read.carries_values());
    }

    #[test]
    fn names() {
        assert_eq!(opcode_name(0x50), "NOP");
        assert_eq!(opcode_name(0x31), "READ_ERROR");
        assert_eq!(opcode_name(0x12), "READ");
        assert_eq!(opcode_name(0x7f), "UNKNOWN");
    }
}
