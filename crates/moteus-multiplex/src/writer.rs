use std::fmt;

use bytes::{BufMut, Bytes};

use crate::codec::{encode_varuint, fd_frame_length, CanFrame, FrameConfig, MAX_FRAME_SIZE};
use crate::error::Result;
use crate::opcode::NOP;
use crate::resolution::{saturate, Resolution, Scale};

/// Append-only byte cursor over a single CAN frame.
///
/// Writers never grow past `capacity`. Combiners check [`remaining`] before
/// emitting anything; writing past the end is a caller bug and panics.
///
/// [`remaining`]: WriteFrame::remaining
#[derive(Clone)]
pub struct WriteFrame {
    data: [u8; MAX_FRAME_SIZE],
    len: usize,
    capacity: usize,
}

impl WriteFrame {
    /// Create an empty classic CAN frame.
    pub fn new() -> Self {
        Self {
            data: [0u8; MAX_FRAME_SIZE],
            len: 0,
            capacity: FrameConfig::default().capacity,
        }
    }

    /// Create an empty frame with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            data: [0u8; MAX_FRAME_SIZE],
            len: 0,
            capacity: config.capacity,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes that can still be written.
    pub fn remaining(&self) -> usize {
        self.capacity - self.len
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Drop everything written after `len`.
    pub fn truncate(&mut self, len: usize) {
        if len < self.len {
            self.data[len..self.len].fill(0);
            self.len = len;
        }
    }

    /// Hand the frame off for transmission.
    pub fn freeze(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }

    /// Copy the written bytes into a [`CanFrame`].
    pub fn to_can_frame(&self) -> CanFrame {
        CanFrame::from_slice(self.as_bytes())
            .unwrap_or_else(|_| unreachable!("writer length is bounded by MAX_FRAME_SIZE"))
    }

    /// Pad with NOP bytes up to the next valid CAN-FD length.
    pub fn pad_to_fd_length(&mut self) {
        let target = fd_frame_length(self.len).min(self.capacity);
        while self.len < target {
            self.put(&[NOP]);
        }
    }

    pub fn write_u8(&mut self, value: u8) {
        self.put(&[value]);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.put(&value.to_le_bytes());
    }

    pub fn write_i16(&mut self, value: i16) {
        self.put(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.put(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.put(&value.to_le_bytes());
    }

    /// Write a register address or count as a varuint.
    pub fn write_varuint(&mut self, value: u32) {
        let mut buf = [0u8; 5];
        let unused = {
            let mut dst = &mut buf[..];
            encode_varuint(value, &mut dst);
            dst.len()
        };
        self.put(&buf[..buf.len() - unused]);
    }

    /// Write a raw integer at `resolution`, truncating to its width.
    ///
    /// `Float` writes the integer as an IEEE value.
    pub fn write_int(&mut self, value: i32, resolution: Resolution) {
        match resolution {
            Resolution::Int8 => self.write_i8(value as i8),
            Resolution::Int16 => self.write_i16(value as i16),
            Resolution::Int32 => self.write_i32(value),
            Resolution::Float => self.write_f32(value as f32),
            Resolution::Ignore => unreachable!("ignored registers carry no value"),
        }
    }

    /// Write a physical value, scaled to `resolution` by `scale`.
    pub fn write_mapped(&mut self, value: f64, scale: Scale, resolution: Resolution) {
        match resolution {
            Resolution::Int8 => {
                let raw = saturate(value, scale.int8, f64::from(i8::MAX));
                self.write_i8(raw.map_or(i8::MIN, |raw| raw as i8));
            }
            Resolution::Int16 => {
                let raw = saturate(value, scale.int16, f64::from(i16::MAX));
                self.write_i16(raw.map_or(i16::MIN, |raw| raw as i16));
            }
            Resolution::Int32 => {
                let raw = saturate(value, scale.int32, f64::from(i32::MAX));
                self.write_i32(raw.map_or(i32::MIN, |raw| raw as i32));
            }
            Resolution::Float => self.write_f32(value as f32),
            Resolution::Ignore => unreachable!("ignored registers carry no value"),
        }
    }

    pub fn write_voltage(&mut self, value: f64, resolution: Resolution) {
        self.write_mapped(value, Scale::VOLTAGE, resolution);
    }

    pub fn write_current(&mut self, value: f64, resolution: Resolution) {
        self.write_mapped(value, Scale::CURRENT, resolution);
    }

    pub fn write_temperature(&mut self, value: f64, resolution: Resolution) {
        self.write_mapped(value, Scale::TEMPERATURE, resolution);
    }

    pub fn write_time(&mut self, value: f64, resolution: Resolution) {
        self.write_mapped(value, Scale::TIME, resolution);
    }

    pub fn write_energy(&mut self, value: f64, resolution: Resolution) {
        self.write_mapped(value, Scale::ENERGY, resolution);
    }

    fn put(&mut self, bytes: &[u8]) {
        assert!(
            bytes.len() <= self.remaining(),
            "write of {} bytes overruns frame ({} of {} used)",
            bytes.len(),
            self.len,
            self.capacity
        );
        let mut dst = &mut self.data[self.len..self.capacity];
        dst.put_slice(bytes);
        self.len += bytes.len();
    }
}

impl Default for WriteFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WriteFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteFrame")
            .field("data", &self.as_bytes())
            .field("capacity", &self.capacity)
            .finish()
    }
}
