use std::sync::Arc;

use log::{debug, log_enabled, trace, warn, Level};

use crate::config::Config;
use crate::constants::INSTRUCTION_SIZE;
use crate::error::Chip8Error;
use crate::frame_buffer::FrameBuffer;
use crate::instruction::Instruction;
use crate::keypad::Keypad;
use crate::memory::Memory;
use crate::operations::Flow;
use crate::state::{Registers, State};
use crate::timer::Timers;
use crate::trace::TraceRecord;

/// Where the VM is in its lifecycle
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Running,
    /// stopped deliberately, by STOP or a cancelled key wait
    Halted,
    Faulted(Chip8Error),
}

/// What a single `step` did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepResult {
    Continue,
    Halted,
    Faulted(Chip8Error),
}

/// # Chip-8
/// Chip-8 is a virtual machine and corresponding interpreted language.
///
/// Tracks:
///  - the owned VM `state`
///  - the current `status`
///  - the last loaded `rom`, so `reset` can put it back
///
/// Supplies interfaces for:
/// - loading roms
/// - stepping the CPU one instruction at a time, optionally traced
/// - handing out the shared timers and keypad to the timer clock and input source
/// - inspecting its frame buffer for rendering by some display
///
/// Halting and faulting are sticky: once `step` stops returning `Continue` it
/// keeps returning the same result until `reset`.
pub struct Chip8 {
    state: State,
    status: Status,
    rom: Vec<u8>,
}

impl Chip8 {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Chip8 {
            state: State::new(&config),
            status: Status::Running,
            rom: Vec::new(),
        }
    }

    /// Load a rom into memory at `PROGRAM_START`
    ///
    /// # Arguments
    /// * `rom` the raw program image; at most `MAX_ROM_SIZE` bytes
    pub fn load(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        self.state.memory.load(rom)?;
        self.rom = rom.to_vec();
        debug!(
            "loaded {} byte rom, call stack holds {} contexts",
            rom.len(),
            self.state.stack.capacity()
        );
        Ok(())
    }

    /// Back to the freshly loaded state: memory, registers, stack, display,
    /// timers and keypad are all cleared and the last rom is loaded again
    pub fn reset(&mut self) {
        self.state.reset();
        self.status = match self.state.memory.load(&self.rom) {
            Ok(()) => Status::Running,
            Err(error) => Status::Faulted(error),
        };
        debug!("reset");
    }

    /// Executes the instruction at PC
    pub fn step(&mut self) -> StepResult {
        self.advance(log_enabled!(Level::Trace)).0
    }

    /// Executes the instruction at PC and reports what it changed.
    /// No record is produced when nothing was executed.
    pub fn step_traced(&mut self) -> (StepResult, Option<TraceRecord>) {
        self.advance(true)
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    /// The current contents of the display
    pub fn frame(&self) -> &FrameBuffer {
        &self.state.frame_buffer
    }

    /// Returns the FrameBuffer if the display should be redrawn
    /// and clears the draw flag
    pub fn take_frame(&mut self) -> Option<FrameBuffer> {
        if self.state.draw_flag {
            self.state.draw_flag = false;
            Some(self.state.frame_buffer)
        } else {
            None
        }
    }

    pub fn registers(&self) -> &Registers {
        &self.state.registers
    }

    pub fn memory(&self) -> &Memory {
        &self.state.memory
    }

    /// The delay and sound timers, for a `TimerClock` to drive
    pub fn timers(&self) -> Arc<Timers> {
        Arc::clone(&self.state.timers)
    }

    /// The keypad, for an input source on another thread
    pub fn keypad(&self) -> Arc<Keypad> {
        Arc::clone(&self.state.keypad)
    }

    /// Set the pressed status of key
    pub fn set_key_pressed(&self, key: u8, pressed: bool) {
        self.state.keypad.set_key_pressed(key, pressed);
    }

    /// Number of contexts currently on the call stack
    pub fn stack_depth(&self) -> usize {
        self.state.stack.depth()
    }

    fn advance(&mut self, traced: bool) -> (StepResult, Option<TraceRecord>) {
        match &self.status {
            Status::Running => {}
            Status::Halted => return (StepResult::Halted, None),
            Status::Faulted(error) => return (StepResult::Faulted(error.clone()), None),
        }

        let before = self.state.registers;
        match self.cycle() {
            Ok((word, instruction, flow)) => {
                let record = if traced {
                    let mut record = TraceRecord::new(before.pc, word, instruction);
                    record.record_deltas(&before, &self.state.registers);
                    trace!("{}", record);
                    Some(record)
                } else {
                    None
                };
                let result = match flow {
                    Flow::Halt => {
                        debug!("halted by {} at {:#05X}", instruction, before.pc);
                        self.status = Status::Halted;
                        StepResult::Halted
                    }
                    Flow::Cancelled => {
                        debug!("key wait cancelled at {:#05X}", before.pc);
                        self.status = Status::Halted;
                        StepResult::Halted
                    }
                    _ => StepResult::Continue,
                };
                (result, record)
            }
            Err(error) => {
                warn!("faulted at {:#05X}: {}", before.pc, error);
                self.status = Status::Faulted(error.clone());
                (StepResult::Faulted(error), None)
            }
        }
    }

    /// Fetch, decode, execute, then move PC along according to the flow.
    /// An error leaves PC where it was.
    fn cycle(&mut self) -> Result<(u16, Instruction, Flow), Chip8Error> {
        let pc = self.state.registers.pc;
        let word = self.state.memory.fetch(pc)?;
        let instruction = Instruction::decode(word)?;
        let flow = instruction.execute(&mut self.state)?;
        self.state.registers.pc = match flow {
            Flow::Next => pc.wrapping_add(INSTRUCTION_SIZE),
            Flow::Skip => pc.wrapping_add(2 * INSTRUCTION_SIZE),
            Flow::Jump(addr) => addr,
            Flow::Halt | Flow::Cancelled => pc,
        };
        Ok((word, instruction, flow))
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}
