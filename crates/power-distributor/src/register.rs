//! Register addresses and enumerated values of the power distribution board.
//!
//! The board exposes two contiguous register blocks: status at `0x000` and
//! measurements at `0x010`.

use moteus_multiplex::Scale;

use crate::error::DistributorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Register {
    State = 0x000,
    Fault = 0x001,
    SwitchStatus = 0x002,
    LockTime = 0x003,
    BootTime = 0x004,
    OutputVoltage = 0x010,
    OutputCurrent = 0x011,
    Temperature = 0x012,
    Energy = 0x013,
}

/// Status block, in address order starting at [`Register::State`].
pub const STATUS_BLOCK: [Register; 5] = [
    Register::State,
    Register::Fault,
    Register::SwitchStatus,
    Register::LockTime,
    Register::BootTime,
];

/// Measurement block, in address order starting at [`Register::OutputVoltage`].
pub const MEASUREMENT_BLOCK: [Register; 4] = [
    Register::OutputVoltage,
    Register::OutputCurrent,
    Register::Temperature,
    Register::Energy,
];

/// How a register's raw value maps to a physical quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    /// Plain integer (state, fault code, flags, timers).
    Raw,
    Voltage,
    Current,
    Temperature,
    Energy,
}

impl Unit {
    pub fn scale(self) -> Scale {
        match self {
            Unit::Raw => Scale::UNIT,
            Unit::Voltage => Scale::VOLTAGE,
            Unit::Current => Scale::CURRENT,
            Unit::Temperature => Scale::TEMPERATURE,
            Unit::Energy => Scale::ENERGY,
        }
    }
}

impl Register {
    pub const fn address(self) -> u16 {
        self as u16
    }

    pub fn from_address(address: u16) -> Option<Self> {
        match address {
            0x000 => Some(Register::State),
            0x001 => Some(Register::Fault),
            0x002 => Some(Register::SwitchStatus),
            0x003 => Some(Register::LockTime),
            0x004 => Some(Register::BootTime),
            0x010 => Some(Register::OutputVoltage),
            0x011 => Some(Register::OutputCurrent),
            0x012 => Some(Register::Temperature),
            0x013 => Some(Register::Energy),
            _ => None,
        }
    }

    pub const fn unit(self) -> Unit {
        match self {
            Register::State
            | Register::Fault
            | Register::SwitchStatus
            | Register::LockTime
            | Register::BootTime => Unit::Raw,
            Register::OutputVoltage => Unit::Voltage,
            Register::OutputCurrent => Unit::Current,
            Register::Temperature => Unit::Temperature,
            Register::Energy => Unit::Energy,
        }
    }
}

impl TryFrom<u16> for Register {
    /// The unknown address.
    type Error = u16;

    fn try_from(address: u16) -> std::result::Result<Self, u16> {
        Self::from_address(address).ok_or(address)
    }
}

/// Output power state reported in [`Register::State`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(i8)]
pub enum State {
    #[default]
    PowerOff = 0,
    PreCharging = 1,
    PowerOn = 2,
    Fault = 3,
}

impl TryFrom<i32> for State {
    type Error = DistributorError;

    fn try_from(value: i32) -> std::result::Result<Self, DistributorError> {
        match value {
            0 => Ok(State::PowerOff),
            1 => Ok(State::PreCharging),
            2 => Ok(State::PowerOn),
            3 => Ok(State::Fault),
            other => Err(DistributorError::InvalidState(other)),
        }
    }
}
