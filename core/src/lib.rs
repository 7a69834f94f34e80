pub use chip8::{Chip8, Status, StepResult};
pub use config::Config;
pub use constants::CLOCK_SPEED;
pub use error::Chip8Error;
pub use frame_buffer::FrameBuffer;
pub use instruction::Instruction;
pub use keypad::Keypad;
pub use timer::{TimerClock, Timers};
pub use trace::TraceRecord;

mod chip8;
mod config;
pub mod constants;
mod error;
pub mod frame_buffer;
pub mod instruction;
mod keypad;
pub mod memory;
mod opcode;
pub mod operations;
pub mod state;
mod timer;
pub mod trace;
