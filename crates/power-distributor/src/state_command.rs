use moteus_multiplex::{codec::varuint_len, Command, MultiplexError, Resolution, WriteFrame};

use crate::error::{DistributorError, Result};
use crate::register::{Register, State};

/// Request to switch the board output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StateCommand {
    /// Zero requests power off, anything else power on.
    pub state: i32,
}

impl Default for StateCommand {
    fn default() -> Self {
        Self {
            state: State::PowerOn as i32,
        }
    }
}

impl StateCommand {
    /// State actually written to the board.
    ///
    /// Only on and off are commandable: a request for `PreCharging` or
    /// `Fault` is sent as `PowerOn`.
    pub fn target(&self) -> State {
        if self.state == 0 {
            State::PowerOff
        } else {
            State::PowerOn
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StateFormat {
    pub state: Resolution,
}

impl Default for StateFormat {
    fn default() -> Self {
        Self {
            state: Resolution::Int8,
        }
    }
}

/// Append a single-register write of [`Register::State`] to `frame`.
pub fn make(frame: &mut WriteFrame, command: &StateCommand, format: &StateFormat) -> Result<()> {
    let resolution = format.state;
    if resolution.is_ignore() {
        return Err(DistributorError::UnsupportedResolution {
            register: Register::State,
            resolution,
        });
    }

    let register = Register::State.address();
    let needed = 1 + varuint_len(u32::from(register)) + resolution.size();
    if needed > frame.remaining() {
        return Err(MultiplexError::CapacityExceeded {
            register,
            needed,
            remaining: frame.remaining(),
        }
        .into());
    }

    frame.write_u8(Command::Write.opcode(resolution) | 0x01);
    frame.write_varuint(u32::from(register));
    frame.write_int(command.target() as i32, resolution);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(command: StateCommand, format: StateFormat) -> Result<Vec<u8>> {
        let mut frame = WriteFrame::new();
        make(&mut frame, &command, &format)?;
        Ok(frame.as_bytes().to_vec())
    }

    #[test]
    fn power_on() {
        let bytes = encode(StateCommand::default(), StateFormat::default()).unwrap();
        assert_eq!(bytes, vec![0x01, 0x00, 0x02]);
    }

    #[test]
    fn power_off() {
        let bytes = encode(StateCommand { state: 0 }, StateFormat::default()).unwrap();
        assert_eq!(bytes, vec![0x01, 0x00, 0x00]);
    }

    // Only on/off are commandable; other states collapse to power on.
    #[test]
    fn non_zero_states_collapse_to_power_on() {
        for state in [1, 3, -1, 42] {
            let command = StateCommand { state };
            assert_eq!(command.target(), State::PowerOn);
            let bytes = encode(command, StateFormat::default()).unwrap();
            assert_eq!(bytes, vec![0x01, 0x00, 0x02]);
        }
    }

    #[test]
    fn wider_resolution() {
        let format = StateFormat {
            state: Resolution::Int16,
        };
        let bytes = encode(StateCommand::default(), format).unwrap();
        assert_eq!(bytes, vec![0x05, 0x00, 0x02, 0x00]);
    }

    #[test]
    fn ignore_is_rejected() {
        let format = StateFormat {
            state: Resolution::Ignore,
        };
        let err = encode(StateCommand::default(), format).unwrap_err();
        assert_eq!(
            err,
            DistributorError::UnsupportedResolution {
                register: Register::State,
                resolution: Resolution::Ignore,
            }
        );
    }

    #[test]
    fn full_frame_is_rejected() {
        let mut frame = WriteFrame::new();
        frame.write_i32(0);
        frame.write_i16(0);
        let err = make(&mut frame, &StateCommand::default(), &StateFormat::default()).unwrap_err();
        assert!(matches!(
            err,
            DistributorError::Multiplex(MultiplexError::CapacityExceeded { needed: 3, remaining: 2, .. })
        ));
        assert_eq!(frame.len(), 6);
    }
}
