use thiserror::Error;

/// Everything that can stop a Chip-8.
///
/// None of these are fatal to the host: the VM moves to `Status::Faulted` and
/// reports the error from every `step` until it is reset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Chip8Error {
    #[error("ROM is too large ({size} bytes), max size is {max} bytes")]
    RomTooLarge { size: usize, max: usize },

    #[error("memory access out of bounds at address {address:#06X}")]
    OutOfBounds { address: usize },

    #[error("stack overflow: call stack already holds {depth} contexts")]
    StackOverflow { depth: usize },

    #[error("stack underflow: return with an empty call stack")]
    StackUnderflow,

    #[error("unknown opcode {0:#06X}")]
    UnknownOpcode(u16),
}
