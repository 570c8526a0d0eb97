use moteus_multiplex::{MultiplexError, Resolution};

use crate::register::Register;

/// Errors that can occur while encoding or decoding power distributor frames.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DistributorError {
    /// Frame-level encode or decode error.
    #[error("multiplex error: {0}")]
    Multiplex(#[from] MultiplexError),

    /// The board reported a state outside the known set.
    #[error("invalid power state {0}")]
    InvalidState(i32),

    /// The register cannot be encoded at the requested resolution.
    #[error("register {register:?} does not support {resolution:?} resolution")]
    UnsupportedResolution {
        register: Register,
        resolution: Resolution,
    },
}

pub type Result<T> = std::result::Result<T, DistributorError>;
