use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::Config;
use crate::constants::{PROGRAM_START, REGISTER_COUNT};
use crate::error::Chip8Error;
use crate::frame_buffer::FrameBuffer;
use crate::keypad::Keypad;
use crate::memory::Memory;
use crate::timer::Timers;

/// # Registers
/// - (v) 16 primary 8-bit registers (V0..VF)
///     - the first 15 (V0..VE) are general purpose registers
///     - the 16th (VF) is the carry/borrow/collision flag
/// - (i) a 16-bit memory address register
/// - (pc) a 16-bit program counter
///
/// A plain value type: copying it is a deep copy, which is what lets the call
/// stack snapshot it safely.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Registers {
    pub v: [u8; REGISTER_COUNT],
    pub i: u16,
    pub pc: u16,
}

impl Registers {
    pub fn new() -> Self {
        Registers {
            v: [0; REGISTER_COUNT],
            i: 0,
            pc: PROGRAM_START,
        }
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

/// What CALL saves and RET restores
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SavedContext {
    pub v: [u8; REGISTER_COUNT],
    pub i: u16,
    pub return_pc: u16,
}

/// Bounded stack of saved contexts
#[derive(Clone, Debug)]
pub struct CallStack {
    frames: Vec<SavedContext>,
    capacity: usize,
}

impl CallStack {
    pub fn with_capacity(capacity: usize) -> Self {
        CallStack {
            frames: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, context: SavedContext) -> Result<(), Chip8Error> {
        if self.frames.len() >= self.capacity {
            return Err(Chip8Error::StackOverflow {
                depth: self.frames.len(),
            });
        }
        self.frames.push(context);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<SavedContext, Chip8Error> {
        self.frames.pop().ok_or(Chip8Error::StackUnderflow)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

/// # State
/// Everything one Chip-8 owns, passed explicitly to every operation.
///
/// The timers and keypad are behind `Arc`s because they are driven from other
/// threads (the timer clock and the input source); everything else is owned
/// outright.
pub struct State {
    pub registers: Registers,
    pub stack: CallStack,
    pub memory: Memory,
    pub frame_buffer: FrameBuffer,
    pub draw_flag: bool,
    pub timers: Arc<Timers>,
    pub keypad: Arc<Keypad>,
    pub rng: StdRng,
    pub full_context_return: bool,
}

impl State {
    pub fn new(config: &Config) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        State {
            registers: Registers::new(),
            stack: CallStack::with_capacity(config.stack_depth),
            memory: Memory::new(),
            frame_buffer: FrameBuffer::new(),
            draw_flag: false,
            timers: Arc::new(Timers::new()),
            keypad: Arc::new(Keypad::new()),
            rng,
            full_context_return: config.full_context_return,
        }
    }

    /// Back to power-on values, keeping the shared timer and keypad handles alive
    pub fn reset(&mut self) {
        self.registers = Registers::new();
        self.stack.clear();
        self.memory.clear();
        self.frame_buffer.clear();
        self.draw_flag = false;
        self.timers.reset();
        self.keypad.reset();
    }

    /// Vx
    pub fn v(&self, x: u8) -> u8 {
        self.registers.v[x as usize & 0xF]
    }

    pub fn set_v(&mut self, x: u8, value: u8) {
        self.registers.v[x as usize & 0xF] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(return_pc: u16) -> SavedContext {
        SavedContext {
            v: [0; REGISTER_COUNT],
            i: 0,
            return_pc,
        }
    }

    #[test]
    fn test_registers_start_at_program() {
        let registers = Registers::new();
        assert_eq!(registers.pc, 0x200);
        assert_eq!(registers.i, 0);
        assert_eq!(registers.v, [0; 16]);
    }

    #[test]
    fn test_stack_push_pop_order() {
        let mut stack = CallStack::with_capacity(16);
        stack.push(context(0x202)).unwrap();
        stack.push(context(0x304)).unwrap();
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.pop().unwrap().return_pc, 0x304);
        assert_eq!(stack.pop().unwrap().return_pc, 0x202);
    }

    #[test]
    fn test_stack_underflow() {
        let mut stack = CallStack::with_capacity(16);
        assert_eq!(stack.pop(), Err(Chip8Error::StackUnderflow));
    }

    #[test]
    fn test_stack_overflow() {
        let mut stack = CallStack::with_capacity(2);
        assert_eq!(stack.capacity(), 2);
        stack.push(context(0x202)).unwrap();
        stack.push(context(0x204)).unwrap();
        assert_eq!(
            stack.push(context(0x206)),
            Err(Chip8Error::StackOverflow { depth: 2 })
        );
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn test_saved_context_is_a_copy() {
        let mut registers = Registers::new();
        registers.v[0x3] = 0x33;
        let mut stack = CallStack::with_capacity(16);
        stack
            .push(SavedContext {
                v: registers.v,
                i: registers.i,
                return_pc: registers.pc,
            })
            .unwrap();
        registers.v[0x3] = 0x99;
        assert_eq!(stack.pop().unwrap().v[0x3], 0x33);
    }

    #[test]
    fn test_state_reset_keeps_shared_handles() {
        let mut state = State::new(&Config::default());
        let timers = Arc::clone(&state.timers);
        state.timers.set_delay(10);
        state.registers.v[0x1] = 0x1;
        state.reset();
        assert_eq!(timers.delay(), 0);
        assert_eq!(state.registers, Registers::new());
        assert!(Arc::ptr_eq(&timers, &state.timers));
    }
}
