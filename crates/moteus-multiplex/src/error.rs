/// Errors that can occur while encoding or decoding multiplex frames.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MultiplexError {
    /// The requested registers do not fit in the remaining frame capacity.
    #[error("register {register:#05x} needs {needed} bytes, only {remaining} remain in frame")]
    CapacityExceeded {
        register: u16,
        needed: usize,
        remaining: usize,
    },

    /// The reply ended before a header or value was complete.
    #[error("truncated frame (needed {needed} bytes, {available} available)")]
    Truncated { needed: usize, available: usize },

    /// The reply contains an opcode this codec does not understand.
    #[error("unexpected opcode {0:#04x}")]
    UnexpectedOpcode(u8),

    /// A varuint register address does not fit in 16 bits.
    #[error("register address {0:#x} out of range")]
    RegisterOutOfRange(u32),

    /// The device reported a read or write error for a register.
    #[error("device reported error {code} for register {register:#05x}")]
    DeviceError { register: u16, code: u32 },

    /// The configured frame capacity is larger than any CAN frame.
    #[error("frame capacity too large ({capacity} bytes, max {max})")]
    InvalidCapacity { capacity: usize, max: usize },

    /// A received buffer is larger than any CAN frame.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, MultiplexError>;
