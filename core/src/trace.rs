use std::fmt;

use crate::instruction::Instruction;
use crate::state::Registers;

/// A register visible to the trace
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Register {
    V(u8),
    I,
    Pc,
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Register::V(x) => write!(f, "V{:X}", x),
            Register::I => write!(f, "I"),
            Register::Pc => write!(f, "PC"),
        }
    }
}

/// One register whose value an instruction changed
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RegisterDelta {
    pub register: Register,
    pub before: u16,
    pub after: u16,
}

/// # TraceRecord
/// What one executed instruction did, for debuggers and logs.
///
/// Built by `Chip8::step_traced`; plain `step` never pays for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceRecord {
    /// where the instruction was fetched from
    pub address: u16,
    /// the raw instruction word
    pub word: u16,
    pub instruction: Instruction,
    /// registers that changed, V0..VF first, then I and PC
    pub deltas: Vec<RegisterDelta>,
}

impl TraceRecord {
    pub fn new(address: u16, word: u16, instruction: Instruction) -> Self {
        TraceRecord {
            address,
            word,
            instruction,
            deltas: Vec::new(),
        }
    }

    /// Fills in `deltas` by comparing the register file around an instruction
    pub fn record_deltas(&mut self, before: &Registers, after: &Registers) {
        let v = before
            .v
            .iter()
            .zip(after.v.iter())
            .enumerate()
            .filter(|(_, (b, a))| b != a)
            .map(|(x, (&b, &a))| RegisterDelta {
                register: Register::V(x as u8),
                before: u16::from(b),
                after: u16::from(a),
            });
        self.deltas = v.collect();

        for &(register, b, a) in &[
            (Register::I, before.i, after.i),
            (Register::Pc, before.pc, after.pc),
        ] {
            if b != a {
                self.deltas.push(RegisterDelta {
                    register,
                    before: b,
                    after: a,
                });
            }
        }
    }
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04X}: {:04X} {:<16}",
            self.address, self.word, self.instruction.to_string()
        )?;
        for delta in &self.deltas {
            write!(
                f,
                " {}:{:X}->{:X}",
                delta.register, delta.before, delta.after
            )?;
        }
        Ok(())
    }
}
