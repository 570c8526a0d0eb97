use bytes::Buf;
use tracing::trace;

use crate::codec::{decode_varuint, CanFrame};
use crate::error::{MultiplexError, Result};
use crate::opcode::{
    opcode_name, Command, COUNT_MASK, NOP, READ_ERROR, RESOLUTION_SHIFT, WRITE_ERROR,
};
use crate::resolution::{Resolution, Scale};

/// One register announced by a reply, whose value is next in the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedField {
    pub register: u16,
    pub resolution: Resolution,
}

/// Walks a reply buffer one register at a time.
///
/// [`next_field`] consumes headers and yields the register whose value is
/// next. The caller then consumes exactly that value with one of the typed
/// reads (or [`ignore`] for registers it does not know) before asking for
/// the next field.
///
/// [`next_field`]: MultiplexParser::next_field
/// [`ignore`]: MultiplexParser::ignore
pub struct MultiplexParser<'a> {
    data: &'a [u8],
    remaining: usize,
    current_register: u16,
    current_resolution: Resolution,
}

impl<'a> MultiplexParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            remaining: 0,
            current_register: 0,
            current_resolution: Resolution::Ignore,
        }
    }

    pub fn from_frame(frame: &'a CanFrame) -> Self {
        Self::new(frame.as_bytes())
    }

    /// True once every byte has been consumed and no register is pending.
    pub fn is_done(&self) -> bool {
        self.remaining == 0 && !self.data.has_remaining()
    }

    /// Yield the next register in the reply, or `None` once the buffer is
    /// exhausted.
    pub fn next_field(&mut self) -> Result<Option<ParsedField>> {
        if self.remaining == 0 && !self.read_header()? {
            return Ok(None);
        }

        self.remaining -= 1;
        let field = ParsedField {
            register: self.current_register,
            resolution: self.current_resolution,
        };
        // read_header guarantees the run ends at or below u16::MAX.
        self.current_register = self.current_register.wrapping_add(1);
        self.ensure(field.resolution.size())?;
        trace!(register = field.register, resolution = ?field.resolution, "parsed field");
        Ok(Some(field))
    }

    /// Consume headers until one announces at least one register.
    ///
    /// Returns `false` when the buffer runs out first.
    fn read_header(&mut self) -> Result<bool> {
        while self.data.has_remaining() {
            let opcode = self.data.get_u8();
            match opcode {
                NOP => continue,
                WRITE_ERROR | READ_ERROR => {
                    let register = self.read_register()?;
                    let code = decode_varuint(&mut self.data)?;
                    return Err(MultiplexError::DeviceError { register, code });
                }
                _ => {}
            }

            match Command::from_opcode(opcode) {
                Some(Command::Write | Command::Reply) => {}
                _ => {
                    trace!(opcode, name = opcode_name(opcode), "unexpected opcode in reply");
                    return Err(MultiplexError::UnexpectedOpcode(opcode));
                }
            }

            let resolution = Resolution::from_selector(opcode >> RESOLUTION_SHIFT);
            let count = match opcode & COUNT_MASK {
                0 => {
                    self.ensure(1)?;
                    usize::from(self.data.get_u8())
                }
                short => usize::from(short),
            };
            let register = self.read_register()?;
            trace!(opcode, register, count, ?resolution, "parsed header");

            if count == 0 {
                continue;
            }
            let last = u32::from(register) + count as u32 - 1;
            if last > u32::from(u16::MAX) {
                return Err(MultiplexError::RegisterOutOfRange(last));
            }
            self.current_register = register;
            self.current_resolution = resolution;
            self.remaining = count;
            return Ok(true);
        }
        Ok(false)
    }

    fn read_register(&mut self) -> Result<u16> {
        let address = decode_varuint(&mut self.data)?;
        u16::try_from(address).map_err(|_| MultiplexError::RegisterOutOfRange(address))
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if self.data.remaining() < needed {
            return Err(MultiplexError::Truncated {
                needed,
                available: self.data.remaining(),
            });
        }
        Ok(())
    }

    /// Read a raw integer at `resolution`. `Float` values are truncated.
    pub fn read_int(&mut self, resolution: Resolution) -> Result<i32> {
        self.ensure(resolution.size())?;
        Ok(match resolution {
            Resolution::Int8 => i32::from(self.data.get_i8()),
            Resolution::Int16 => i32::from(self.data.get_i16_le()),
            Resolution::Int32 => self.data.get_i32_le(),
            Resolution::Float => self.data.get_f32_le() as i32,
            Resolution::Ignore => unreachable!("ignored registers carry no value"),
        })
    }

    /// Read a physical value stored at `resolution` with `scale`.
    ///
    /// The integer minimum decodes as NaN.
    pub fn read_mapped(&mut self, resolution: Resolution, scale: Scale) -> Result<f64> {
        self.ensure(resolution.size())?;
        Ok(match resolution {
            Resolution::Int8 => match self.data.get_i8() {
                i8::MIN => f64::NAN,
                raw => f64::from(raw) * scale.int8,
            },
            Resolution::Int16 => match self.data.get_i16_le() {
                i16::MIN => f64::NAN,
                raw => f64::from(raw) * scale.int16,
            },
            Resolution::Int32 => match self.data.get_i32_le() {
                i32::MIN => f64::NAN,
                raw => f64::from(raw) * scale.int32,
            },
            Resolution::Float => f64::from(self.data.get_f32_le()),
            Resolution::Ignore => unreachable!("ignored registers carry no value"),
        })
    }

    pub fn read_voltage(&mut self, resolution: Resolution) -> Result<f64> {
        self.read_mapped(resolution, Scale::VOLTAGE)
    }

    pub fn read_current(&mut self, resolution: Resolution) -> Result<f64> {
        self.read_mapped(resolution, Scale::CURRENT)
    }

    pub fn read_temperature(&mut self, resolution: Resolution) -> Result<f64> {
        self.read_mapped(resolution, Scale::TEMPERATURE)
    }

    pub fn read_time(&mut self, resolution: Resolution) -> Result<f64> {
        self.read_mapped(resolution, Scale::TIME)
    }

    pub fn read_energy(&mut self, resolution: Resolution) -> Result<f64> {
        self.read_mapped(resolution, Scale::ENERGY)
    }

    /// Skip a value the caller has no use for.
    pub fn ignore(&mut self, resolution: Resolution) -> Result<()> {
        let size = resolution.size();
        self.ensure(size)?;
        self.data.advance(size);
        Ok(())
    }
}

impl<'a> From<&'a CanFrame> for MultiplexParser<'a> {
    fn from(frame: &'a CanFrame) -> Self {
        Self::from_frame(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::{READ_BASE, REPLY_BASE};

    fn field(register: u16, resolution: Resolution) -> Option<ParsedField> {
        Some(ParsedField {
            register,
            resolution,
        })
    }

    #[test]
    fn empty_buffer_is_done() {
        let mut parser = MultiplexParser::new(&[]);
        assert!(parser.is_done());
        assert_eq!(parser.next_field().unwrap(), None);
    }

    #[test]
    fn single_register_reply() {
        let bytes = [REPLY_BASE | 0x01, 0x00, 0x02];
        let mut parser = MultiplexParser::new(&bytes);

        let current = parser.next_field().unwrap();
        assert_eq!(current, field(0x000, Resolution::Int8));
        assert_eq!(parser.read_int(Resolution::Int8).unwrap(), 2);
        assert_eq!(parser.next_field().unwrap(), None);
        assert!(parser.is_done());
    }

    #[test]
    fn multi_register_header_expands() {
        let mut bytes = vec![0x2e, 0x10];
        bytes.extend_from_slice(&48.5f32.to_le_bytes());
        bytes.extend_from_slice(&1.25f32.to_le_bytes());
        let mut parser = MultiplexParser::new(&bytes);

        let first = parser.next_field().unwrap().unwrap();
        assert_eq!(first, ParsedField { register: 0x010, resolution: Resolution::Float });
        assert_eq!(parser.read_voltage(first.resolution).unwrap(), 48.5);

        let second = parser.next_field().unwrap().unwrap();
        assert_eq!(second.register, 0x011);
        assert_eq!(parser.read_current(second.resolution).unwrap(), 1.25);

        assert_eq!(parser.next_field().unwrap(), None);
    }

    #[test]
    fn explicit_count_byte() {
        let bytes = [REPLY_BASE, 0x04, 0x10, 1, 2, 3, 4];
        let mut parser = MultiplexParser::new(&bytes);
        let mut seen = Vec::new();
        while let Some(current) = parser.next_field().unwrap() {
            seen.push((current.register, parser.read_int(current.resolution).unwrap()));
        }
        assert_eq!(seen, vec![(0x10, 1), (0x11, 2), (0x12, 3), (0x13, 4)]);
    }

    #[test]
    fn write_frames_parse_like_replies() {
        let bytes = [0x05, 0x03, 0x34, 0x12];
        let mut parser = MultiplexParser::new(&bytes);
        let current = parser.next_field().unwrap().unwrap();
        assert_eq!(current, ParsedField { register: 0x003, resolution: Resolution::Int16 });
        assert_eq!(parser.read_int(current.resolution).unwrap(), 0x1234);
    }

    #[test]
    fn scaled_integer_reads() {
        let bytes = [0x25, 0x10, 0xe3, 0x01, 0x21, 0x12, 0x80];
        let mut parser = MultiplexParser::new(&bytes);

        let voltage = parser.next_field().unwrap().unwrap();
        let value = parser.read_voltage(voltage.resolution).unwrap();
        assert!((value - 48.3).abs() < 1e-9);

        let temperature = parser.next_field().unwrap().unwrap();
        assert!(parser.read_temperature(temperature.resolution).unwrap().is_nan());
    }

    #[test]
    fn nop_padding_is_skipped() {
        let bytes = [NOP, 0x21, 0x01, 0x07, NOP, NOP];
        let mut parser = MultiplexParser::new(&bytes);
        let current = parser.next_field().unwrap().unwrap();
        assert_eq!(current.register, 0x001);
        assert_eq!(parser.read_int(current.resolution).unwrap(), 7);
        assert_eq!(parser.next_field().unwrap(), None);
    }

    #[test]
    fn ignored_value_keeps_stream_aligned() {
        let mut bytes = vec![0x2d, 0x40];
        bytes.extend_from_slice(&9.0f32.to_le_bytes());
        bytes.extend_from_slice(&[0x21, 0x00, 0x02]);
        let mut parser = MultiplexParser::new(&bytes);

        let unknown = parser.next_field().unwrap().unwrap();
        assert_eq!(unknown.register, 0x040);
        parser.ignore(unknown.resolution).unwrap();

        let state = parser.next_field().unwrap().unwrap();
        assert_eq!(state.register, 0x000);
        assert_eq!(parser.read_int(state.resolution).unwrap(), 2);
    }

    #[test]
    fn truncated_value_is_an_error() {
        let bytes = [0x2e, 0x10, 0x00, 0x00, 0x40, 0x42, 0x00];
        let mut parser = MultiplexParser::new(&bytes);
        let first = parser.next_field().unwrap().unwrap();
        parser.read_voltage(first.resolution).unwrap();

        let err = parser.next_field().unwrap_err();
        assert_eq!(err, MultiplexError::Truncated { needed: 4, available: 1 });
    }

    #[test]
    fn truncated_header_is_an_error() {
        let mut parser = MultiplexParser::new(&[REPLY_BASE]);
        let err = parser.next_field().unwrap_err();
        assert!(matches!(err, MultiplexError::Truncated { .. }));

        let mut parser = MultiplexParser::new(&[0x21]);
        let err = parser.next_field().unwrap_err();
        assert!(matches!(err, MultiplexError::Truncated { .. }));
    }

    #[test]
    fn read_opcodes_are_rejected() {
        let mut parser = MultiplexParser::new(&[READ_BASE | 0x01, 0x00]);
        let err = parser.next_field().unwrap_err();
        assert_eq!(err, MultiplexError::UnexpectedOpcode(0x11));
    }

    #[test]
    fn device_errors_surface() {
        let mut parser = MultiplexParser::new(&[READ_ERROR, 0x10, 0x03]);
        let err = parser.next_field().unwrap_err();
        assert_eq!(err, MultiplexError::DeviceError { register: 0x010, code: 3 });
    }

    #[test]
    fn empty_run_is_skipped() {
        let bytes = [REPLY_BASE, 0x00, 0x05, 0x21, 0x01, 0x09];
        let mut parser = MultiplexParser::new(&bytes);
        let current = parser.next_field().unwrap().unwrap();
        assert_eq!(current.register, 0x001);
    }

    #[test]
    fn run_past_last_register_is_rejected() {
        let bytes = [REPLY_BASE | 0x02, 0xff, 0xff, 0x03, 0x05, 0x02];
        let mut parser = MultiplexParser::new(&bytes);
        let err = parser.next_field().unwrap_err();
        assert_eq!(err, MultiplexError::RegisterOutOfRange(0x1_0000));
    }

    #[test]
    fn run_ending_at_last_register() {
        let bytes = [REPLY_BASE | 0x02, 0xfe, 0xff, 0x03, 0x05, 0x02];
        let mut parser = MultiplexParser::new(&bytes);
        assert_eq!(parser.next_field().unwrap(), field(0xfffe, Resolution::Int8));
        assert_eq!(parser.read_int(Resolution::Int8).unwrap(), 5);
        assert_eq!(parser.next_field().unwrap(), field(0xffff, Resolution::Int8));
        assert_eq!(parser.read_int(Resolution::Int8).unwrap(), 2);
        assert_eq!(parser.next_field().unwrap(), None);
    }

    #[test]
    fn oversized_address_is_rejected() {
        let bytes = [REPLY_BASE | 0x01, 0x80, 0x80, 0x80, 0x80, 0x10, 0x02];
        let mut parser = MultiplexParser::new(&bytes);
        let err = parser.next_field().unwrap_err();
        assert_eq!(err, MultiplexError::RegisterOutOfRange(u32::MAX));
    }

    #[test]
    fn parses_can_frame() {
        let frame = CanFrame::from_slice(&[0x21, 0x00, 0x02]).unwrap();
        let mut parser = MultiplexParser::from(&frame);
        let current = parser.next_field().unwrap().unwrap();
        assert_eq!(parser.read_int(current.resolution).unwrap(), 2);
    }
}
