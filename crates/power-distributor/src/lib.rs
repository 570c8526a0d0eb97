//! Register map for the mjbots power distribution board.
//!
//! Queries read the status block (`0x000`..) and the measurement block
//! (`0x010`..) in one frame; replies are decoded into a [`QueryResult`].
//! A separate state command switches the output on or off.

pub mod error;
pub mod query;
pub mod register;
pub mod state_command;

pub use error::{DistributorError, Result};
pub use query::{EncodedQuery, QueryFormat, QueryResult};
pub use register::{Register, State, Unit};
pub use state_command::{StateCommand, StateFormat};
