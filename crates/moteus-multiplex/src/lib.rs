//! Register multiplex codec for moteus-family CAN devices.
//!
//! A frame is a sequence of register runs, each made of:
//! - An opcode byte: command family, value resolution and a short count
//! - An optional count byte (when the short count is zero)
//! - The first register address as a varuint
//! - The run's values, in register order (omitted for reads)
//!
//! [`WriteCombiner`] packs blocks of registers into runs; [`MultiplexParser`]
//! walks replies back into individual registers.

pub mod codec;
pub mod combiner;
pub mod error;
pub mod opcode;
pub mod parser;
pub mod resolution;
pub mod writer;

pub use codec::{CanFrame, FrameConfig, CLASSIC_FRAME_SIZE, MAX_FRAME_SIZE};
pub use combiner::WriteCombiner;
pub use error::{MultiplexError, Result};
pub use opcode::Command;
pub use parser::{MultiplexParser, ParsedField};
pub use resolution::{Resolution, Scale};
pub use writer::WriteFrame;
