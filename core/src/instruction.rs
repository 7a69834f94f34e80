use std::fmt;

use crate::error::Chip8Error;
use crate::opcode::Opcode;
use crate::operations::{self, Flow};
use crate::state::State;

/// A decoded Chip-8 instruction, one variant per opcode pattern
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// 0000
    Nop,
    /// 0NNN: call a machine-code routine; ignored
    Sys { nnn: u16 },
    /// 00E0
    Clear,
    /// 00EE
    Return,
    /// 1NNN
    Jump { nnn: u16 },
    /// 2NNN
    Call { nnn: u16 },
    /// 3XNN
    SkipEqByte { x: u8, nn: u8 },
    /// 4XNN
    SkipNeByte { x: u8, nn: u8 },
    /// 5XY0
    SkipEqReg { x: u8, y: u8 },
    /// 6XNN
    LoadByte { x: u8, nn: u8 },
    /// 7XNN
    AddByte { x: u8, nn: u8 },
    /// 8XY0
    Move { x: u8, y: u8 },
    /// 8XY1
    Or { x: u8, y: u8 },
    /// 8XY2
    And { x: u8, y: u8 },
    /// 8XY3
    Xor { x: u8, y: u8 },
    /// 8XY4
    AddReg { x: u8, y: u8 },
    /// 8XY5
    Sub { x: u8, y: u8 },
    /// 8XY6
    ShiftRight { x: u8, y: u8 },
    /// 8XY7
    SubN { x: u8, y: u8 },
    /// 8XYE
    ShiftLeft { x: u8, y: u8 },
    /// 9XY0
    SkipNeReg { x: u8, y: u8 },
    /// ANNN
    LoadIndex { nnn: u16 },
    /// BNNN
    JumpOffset { nnn: u16 },
    /// CXNN
    Random { x: u8, nn: u8 },
    /// DXYN
    Draw { x: u8, y: u8, n: u8 },
    /// EX9E
    SkipPressed { x: u8 },
    /// EXA1
    SkipNotPressed { x: u8 },
    /// FX00
    Stop,
    /// FX07
    LoadDelay { x: u8 },
    /// FX0A
    WaitKey { x: u8 },
    /// FX15
    SetDelay { x: u8 },
    /// FX18
    SetSound { x: u8 },
    /// FX1E
    AddIndex { x: u8 },
    /// FX29
    LoadFont { x: u8 },
    /// FX33
    Bcd { x: u8 },
    /// FX55
    StoreRegisters { x: u8 },
    /// FX65
    LoadRegisters { x: u8 },
}

impl Instruction {
    /// Selects the Instruction for an opcode by its class and sub-opcode
    pub fn decode(op: u16) -> Result<Instruction, Chip8Error> {
        use Instruction::*;

        let (x, y, n, nn, nnn) = (op.x(), op.y(), op.n(), op.nn(), op.nnn());
        let instruction = match op.nibbles() {
            (0x0, 0x0, 0x0, 0x0) => Nop,
            (0x0, 0x0, 0xE, 0x0) => Clear,
            (0x0, 0x0, 0xE, 0xE) => Return,
            (0x0, ..) => Sys { nnn },
            (0x1, ..) => Jump { nnn },
            (0x2, ..) => Call { nnn },
            (0x3, ..) => SkipEqByte { x, nn },
            (0x4, ..) => SkipNeByte { x, nn },
            (0x5, .., 0x0) => SkipEqReg { x, y },
            (0x6, ..) => LoadByte { x, nn },
            (0x7, ..) => AddByte { x, nn },
            (0x8, .., 0x0) => Move { x, y },
            (0x8, .., 0x1) => Or { x, y },
            (0x8, .., 0x2) => And { x, y },
            (0x8, .., 0x3) => Xor { x, y },
            (0x8, .., 0x4) => AddReg { x, y },
            (0x8, .., 0x5) => Sub { x, y },
            (0x8, .., 0x6) => ShiftRight { x, y },
            (0x8, .., 0x7) => SubN { x, y },
            (0x8, .., 0xE) => ShiftLeft { x, y },
            (0x9, .., 0x0) => SkipNeReg { x, y },
            (0xA, ..) => LoadIndex { nnn },
            (0xB, ..) => JumpOffset { nnn },
            (0xC, ..) => Random { x, nn },
            (0xD, ..) => Draw { x, y, n },
            (0xE, _, 0x9, 0xE) => SkipPressed { x },
            (0xE, _, 0xA, 0x1) => SkipNotPressed { x },
            (0xF, _, 0x0, 0x0) => Stop,
            (0xF, _, 0x0, 0x7) => LoadDelay { x },
            (0xF, _, 0x0, 0xA) => WaitKey { x },
            (0xF, _, 0x1, 0x5) => SetDelay { x },
            (0xF, _, 0x1, 0x8) => SetSound { x },
            (0xF, _, 0x1, 0xE) => AddIndex { x },
            (0xF, _, 0x2, 0x9) => LoadFont { x },
            (0xF, _, 0x3, 0x3) => Bcd { x },
            (0xF, _, 0x5, 0x5) => StoreRegisters { x },
            (0xF, _, 0x6, 0x5) => LoadRegisters { x },
            _ => return Err(Chip8Error::UnknownOpcode(op)),
        };
        Ok(instruction)
    }

    /// Runs the instruction against `state` and says where execution goes next
    pub fn execute(self, state: &mut State) -> Result<Flow, Chip8Error> {
        use Instruction::*;

        match self {
            Nop | Sys { .. } => Ok(Flow::Next),
            Clear => operations::clr(state),
            Return => operations::rts(state),
            Jump { nnn } => operations::jump(state, nnn),
            Call { nnn } => operations::call(state, nnn),
            SkipEqByte { x, nn } => operations::ske(state, x, nn),
            SkipNeByte { x, nn } => operations::skne(state, x, nn),
            SkipEqReg { x, y } => operations::skre(state, x, y),
            LoadByte { x, nn } => operations::load(state, x, nn),
            AddByte { x, nn } => operations::add(state, x, nn),
            Move { x, y } => operations::mv(state, x, y),
            Or { x, y } => operations::or(state, x, y),
            And { x, y } => operations::and(state, x, y),
            Xor { x, y } => operations::xor(state, x, y),
            AddReg { x, y } => operations::addr(state, x, y),
            Sub { x, y } => operations::sub(state, x, y),
            ShiftRight { x, .. } => operations::shr(state, x),
            SubN { x, y } => operations::subn(state, x, y),
            ShiftLeft { x, .. } => operations::shl(state, x),
            SkipNeReg { x, y } => operations::skrne(state, x, y),
            LoadIndex { nnn } => operations::loadi(state, nnn),
            JumpOffset { nnn } => operations::jumpi(state, nnn),
            Random { x, nn } => operations::rand(state, x, nn),
            Draw { x, y, n } => operations::draw(state, x, y, n),
            SkipPressed { x } => operations::skpr(state, x),
            SkipNotPressed { x } => operations::skup(state, x),
            Stop => Ok(Flow::Halt),
            LoadDelay { x } => operations::moved(state, x),
            WaitKey { x } => operations::keyd(state, x),
            SetDelay { x } => operations::loadd(state, x),
            SetSound { x } => operations::loads(state, x),
            AddIndex { x } => operations::addi(state, x),
            LoadFont { x } => operations::ldspr(state, x),
            Bcd { x } => operations::bcd(state, x),
            StoreRegisters { x } => operations::stor(state, x),
            LoadRegisters { x } => operations::read(state, x),
        }
    }
}

/// Disassembles to the conventional mnemonics, e.g. `LD VA, 0x12`
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Instruction::*;

        match *self {
            Nop => write!(f, "NOP"),
            Sys { nnn } => write!(f, "SYS {:#05X}", nnn),
            Clear => write!(f, "CLS"),
            Return => write!(f, "RET"),
            Jump { nnn } => write!(f, "JP {:#05X}", nnn),
            Call { nnn } => write!(f, "CALL {:#05X}", nnn),
            SkipEqByte { x, nn } => write!(f, "SE V{:X}, {:#04X}", x, nn),
            SkipNeByte { x, nn } => write!(f, "SNE V{:X}, {:#04X}", x, nn),
            SkipEqReg { x, y } => write!(f, "SE V{:X}, V{:X}", x, y),
            LoadByte { x, nn } => write!(f, "LD V{:X}, {:#04X}", x, nn),
            AddByte { x, nn } => write!(f, "ADD V{:X}, {:#04X}", x, nn),
            Move { x, y } => write!(f, "LD V{:X}, V{:X}", x, y),
            Or { x, y } => write!(f, "OR V{:X}, V{:X}", x, y),
            And { x, y } => write!(f, "AND V{:X}, V{:X}", x, y),
            Xor { x, y } => write!(f, "XOR V{:X}, V{:X}", x, y),
            AddReg { x, y } => write!(f, "ADD V{:X}, V{:X}", x, y),
            Sub { x, y } => write!(f, "SUB V{:X}, V{:X}", x, y),
            ShiftRight { x, .. } => write!(f, "SHR V{:X}", x),
            SubN { x, y } => write!(f, "SUBN V{:X}, V{:X}", x, y),
            ShiftLeft { x, .. } => write!(f, "SHL V{:X}", x),
            SkipNeReg { x, y } => write!(f, "SNE V{:X}, V{:X}", x, y),
            LoadIndex { nnn } => write!(f, "LD I, {:#05X}", nnn),
            JumpOffset { nnn } => write!(f, "JP V0, {:#05X}", nnn),
            Random { x, nn } => write!(f, "RND V{:X}, {:#04X}", x, nn),
            Draw { x, y, n } => write!(f, "DRW V{:X}, V{:X}, {}", x, y, n),
            SkipPressed { x } => write!(f, "SKP V{:X}", x),
            SkipNotPressed { x } => write!(f, "SKNP V{:X}", x),
            Stop => write!(f, "STOP"),
            LoadDelay { x } => write!(f, "LD V{:X}, DT", x),
            WaitKey { x } => write!(f, "LD V{:X}, K", x),
            SetDelay { x } => write!(f, "LD DT, V{:X}", x),
            SetSound { x } => write!(f, "LD ST, V{:X}", x),
            AddIndex { x } => write!(f, "ADD I, V{:X}", x),
            LoadFont { x } => write!(f, "LD F, V{:X}", x),
            Bcd { x } => write!(f, "LD B, V{:X}", x),
            StoreRegisters { x } => write!(f, "LD [I], V{:X}", x),
            LoadRegisters { x } => write!(f, "LD V{:X}, [I]", x),
        }
    }
}
