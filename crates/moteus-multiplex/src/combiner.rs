use tracing::debug;

use crate::codec::varuint_len;
use crate::error::{MultiplexError, Result};
use crate::opcode::{Command, MAX_SHORT_COUNT};
use crate::resolution::Resolution;
use crate::writer::WriteFrame;

/// Longest run a single header can describe (one count byte).
const MAX_RUN: usize = u8::MAX as usize;

/// Coalesces a block of consecutive registers into as few headers as
/// possible.
///
/// Each entry in `resolutions` is the register at `start_register + index`.
/// Consecutive entries with the same resolution share one header; `Ignore`
/// entries emit nothing but still advance the register address.
///
/// Drive it with one [`maybe_write`] call per entry, in order. When the
/// command carries values and the call returns `true`, the caller writes
/// that register's value to [`frame`] before the next call.
///
/// [`maybe_write`]: WriteCombiner::maybe_write
/// [`frame`]: WriteCombiner::frame
pub struct WriteCombiner<'a> {
    frame: &'a mut WriteFrame,
    command: Command,
    start_register: u16,
    resolutions: &'a [Resolution],
    mark: usize,
    offset: usize,
    run_remaining: usize,
    reply_size: usize,
}

impl<'a> WriteCombiner<'a> {
    pub fn new(
        frame: &'a mut WriteFrame,
        command: Command,
        start_register: u16,
        resolutions: &'a [Resolution],
    ) -> Self {
        let mark = frame.len();
        Self {
            frame,
            command,
            start_register,
            resolutions,
            mark,
            offset: 0,
            run_remaining: 0,
            reply_size: 0,
        }
    }

    /// Value bytes the device sends back for every register emitted so far.
    pub fn reply_size(&self) -> usize {
        self.reply_size
    }

    /// The frame being written, for appending register values.
    pub fn frame(&mut self) -> &mut WriteFrame {
        &mut *self.frame
    }

    pub fn is_finished(&self) -> bool {
        self.offset >= self.resolutions.len()
    }

    /// Advance to the next register in the block.
    ///
    /// Returns `Ok(true)` if the register is on the wire, `Ok(false)` if it
    /// is ignored or the block is exhausted. A run that does not fit in the
    /// frame fails with [`MultiplexError::CapacityExceeded`] and everything
    /// this combiner wrote is removed from the frame.
    pub fn maybe_write(&mut self) -> Result<bool> {
        let Some(&resolution) = self.resolutions.get(self.offset) else {
            return Ok(false);
        };
        let this_offset = self.offset;
        self.offset += 1;

        if self.run_remaining > 0 {
            self.run_remaining -= 1;
            return Ok(true);
        }
        if resolution.is_ignore() {
            return Ok(false);
        }

        let count = self.resolutions[this_offset..]
            .iter()
            .take(MAX_RUN)
            .take_while(|&&next| next == resolution)
            .count();

        let address = u32::from(self.start_register) + this_offset as u32;
        let Ok(register) = u16::try_from(address) else {
            self.frame.truncate(self.mark);
            return Err(MultiplexError::RegisterOutOfRange(address));
        };

        let count_len = if count > usize::from(MAX_SHORT_COUNT) { 2 } else { 1 };
        let mut needed = count_len + varuint_len(address);
        if self.command.carries_values() {
            needed += count * resolution.size();
        }
        if needed > self.frame.remaining() {
            let remaining = self.frame.remaining();
            self.frame.truncate(self.mark);
            return Err(MultiplexError::CapacityExceeded {
                register,
                needed,
                remaining,
            });
        }

        let opcode = self.command.opcode(resolution);
        if count > usize::from(MAX_SHORT_COUNT) {
            self.frame.write_u8(opcode);
            self.frame.write_u8(count as u8);
        } else {
            self.frame.write_u8(opcode | count as u8);
        }
        self.frame.write_varuint(address);

        debug!(register, count, ?resolution, opcode, "combined register run");

        self.reply_size += count * resolution.size();
        self.run_remaining = count - 1;
        Ok(true)
    }

    /// Drive the rest of the block, calling `write_value` with the block
    /// index and resolution of every register that is on the wire.
    ///
    /// Returns the reply size of the whole block.
    pub fn write_all<F>(mut self, mut write_value: F) -> Result<usize>
    where
        F: FnMut(usize, Resolution, &mut WriteFrame),
    {
        while !self.is_finished() {
            let index = self.offset;
            if self.maybe_write()? && self.command.carries_values() {
                write_value(index, self.resolutions[index], &mut *self.frame);
            }
        }
        Ok(self.reply_size)
    }

    /// Emit headers for the rest of a read block.
    ///
    /// Returns the reply size of the whole block.
    pub fn finish(self) -> Result<usize> {
        debug_assert!(
            !self.command.carries_values(),
            "finish() emits no values; use write_all()"
        );
        self.write_all(|_, _, _| {})
    }
}
