use std::fmt;

use bytes::{Buf, BufMut};

use crate::error::{MultiplexError, Result};

/// Classic CAN data length.
pub const CLASSIC_FRAME_SIZE: usize = 8;

/// CAN-FD data length, the largest frame any writer can hold.
pub const MAX_FRAME_SIZE: usize = 64;

/// Data lengths a CAN-FD frame can actually carry.
const FD_LENGTHS: [usize; 15] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 12, 16, 20, 24, 32, 48];

/// Longest varuint that can still hold a `u32`.
const MAX_VARUINT_BYTES: usize = 5;

/// Configuration for frame encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    /// Maximum number of bytes a frame may hold. Default: 8 (classic CAN).
    pub capacity: usize,
}

impl FrameConfig {
    /// Classic CAN, 8 byte frames.
    pub const fn classic() -> Self {
        Self {
            capacity: CLASSIC_FRAME_SIZE,
        }
    }

    /// CAN-FD, 64 byte frames.
    pub const fn fd() -> Self {
        Self {
            capacity: MAX_FRAME_SIZE,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.capacity > MAX_FRAME_SIZE {
            return Err(MultiplexError::InvalidCapacity {
                capacity: self.capacity,
                max: MAX_FRAME_SIZE,
            });
        }
        Ok(())
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self::classic()
    }
}

/// Smallest CAN-FD data length that holds `len` bytes.
pub fn fd_frame_length(len: usize) -> usize {
    FD_LENGTHS
        .iter()
        .copied()
        .find(|&valid| valid >= len)
        .unwrap_or(MAX_FRAME_SIZE)
}

/// Number of bytes `value` takes as a varuint.
pub fn varuint_len(value: u32) -> usize {
    let mut len = 1;
    let mut rest = value >> 7;
    while rest != 0 {
        len += 1;
        rest >>= 7;
    }
    len
}

/// Encode a varuint: 7 bits per byte, least significant group first,
/// high bit set on every byte but the last.
pub fn encode_varuint(mut value: u32, dst: &mut impl BufMut) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            dst.put_u8(byte);
            return;
        }
        dst.put_u8(byte | 0x80);
    }
}

/// Payload bits the last varuint byte may carry before overflowing a `u32`.
const LAST_VARUINT_PAYLOAD: u8 = 0x0f;

/// Decode a varuint from the front of `src`, advancing past it.
///
/// Values wider than a `u32` fail with [`MultiplexError::RegisterOutOfRange`]
/// carrying `u32::MAX`.
pub fn decode_varuint(src: &mut &[u8]) -> Result<u32> {
    let mut value = 0u32;
    for index in 0..MAX_VARUINT_BYTES {
        if !src.has_remaining() {
            return Err(MultiplexError::Truncated {
                needed: index + 1,
                available: index,
            });
        }
        let byte = src.get_u8();
        let payload = byte & 0x7f;
        let last = index == MAX_VARUINT_BYTES - 1;
        if last && (payload > LAST_VARUINT_PAYLOAD || byte & 0x80 != 0) {
            return Err(MultiplexError::RegisterOutOfRange(u32::MAX));
        }
        value |= u32::from(payload) << (7 * index);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(MultiplexError::RegisterOutOfRange(u32::MAX))
}

/// A received or transmitted CAN data field.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CanFrame {
    data: [u8; MAX_FRAME_SIZE],
    size: u8,
}

impl CanFrame {
    /// Copy a data field into a frame.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > MAX_FRAME_SIZE {
            return Err(MultiplexError::FrameTooLarge {
                size: bytes.len(),
                max: MAX_FRAME_SIZE,
            });
        }
        let mut data = [0u8; MAX_FRAME_SIZE];
        data[..bytes.len()].copy_from_slice(bytes);
        Ok(Self {
            data,
            size: bytes.len() as u8,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.size as usize]
    }

    pub fn len(&self) -> usize {
        self.size as usize
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

impl TryFrom<&[u8]> for CanFrame {
    type Error = MultiplexError;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        Self::from_slice(bytes)
    }
}

impl fmt::Debug for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanFrame")
            .field("data", &self.as_bytes())
            .finish()
    }
}
