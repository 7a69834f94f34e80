use rand::Rng;

use crate::constants::{FLAG_REGISTER, FONT_BASE, FONT_SPRITE_SIZE};
use crate::error::Chip8Error;
use crate::state::{SavedContext, State};

/// Where the program counter goes after an instruction
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Flow {
    /// on to the following instruction
    Next,
    /// over the following instruction
    Skip,
    /// to an absolute address
    Jump(u16),
    /// nowhere; the program asked to stop
    Halt,
    /// nowhere; a key wait was cancelled before any key arrived
    Cancelled,
}

impl Flow {
    fn skip_if(condition: bool) -> Flow {
        if condition {
            Flow::Skip
        } else {
            Flow::Next
        }
    }
}

/// clear
pub fn clr(state: &mut State) -> Result<Flow, Chip8Error> {
    state.frame_buffer.clear();
    state.draw_flag = true;
    Ok(Flow::Next)
}

/// context = STACK.pop(); PC = context.return_pc
/// Registers and I come back too unless the VM is configured for PC-only returns
pub fn rts(state: &mut State) -> Result<Flow, Chip8Error> {
    let context = state.stack.pop()?;
    if state.full_context_return {
        state.registers.v = context.v;
        state.registers.i = context.i;
    }
    Ok(Flow::Jump(context.return_pc))
}

/// PC = addr
pub fn jump(_state: &mut State, addr: u16) -> Result<Flow, Chip8Error> {
    Ok(Flow::Jump(addr))
}

/// STACK.push(context); PC = addr
pub fn call(state: &mut State, addr: u16) -> Result<Flow, Chip8Error> {
    let registers = state.registers;
    state.stack.push(SavedContext {
        v: registers.v,
        i: registers.i,
        return_pc: registers.pc.wrapping_add(2),
    })?;
    Ok(Flow::Jump(addr))
}

/// if Vx == nn then skip
pub fn ske(state: &mut State, x: u8, nn: u8) -> Result<Flow, Chip8Error> {
    Ok(Flow::skip_if(state.v(x) == nn))
}

/// if Vx != nn then skip
pub fn skne(state: &mut State, x: u8, nn: u8) -> Result<Flow, Chip8Error> {
    Ok(Flow::skip_if(state.v(x) != nn))
}

/// if Vx == Vy then skip
pub fn skre(state: &mut State, x: u8, y: u8) -> Result<Flow, Chip8Error> {
    Ok(Flow::skip_if(state.v(x) == state.v(y)))
}

/// Vx = nn
pub fn load(state: &mut State, x: u8, nn: u8) -> Result<Flow, Chip8Error> {
    state.set_v(x, nn);
    Ok(Flow::Next)
}

/// Vx += nn
/// Overflow wraps and is dropped; VF is left alone
pub fn add(state: &mut State, x: u8, nn: u8) -> Result<Flow, Chip8Error> {
    let res = state.v(x).wrapping_add(nn);
    state.set_v(x, res);
    Ok(Flow::Next)
}

/// Vx = Vy
pub fn mv(state: &mut State, x: u8, y: u8) -> Result<Flow, Chip8Error> {
    let vy = state.v(y);
    state.set_v(x, vy);
    Ok(Flow::Next)
}

/// Vx |= Vy
pub fn or(state: &mut State, x: u8, y: u8) -> Result<Flow, Chip8Error> {
    let res = state.v(x) | state.v(y);
    state.set_v(x, res);
    Ok(Flow::Next)
}

/// Vx &= Vy
pub fn and(state: &mut State, x: u8, y: u8) -> Result<Flow, Chip8Error> {
    let res = state.v(x) & state.v(y);
    state.set_v(x, res);
    Ok(Flow::Next)
}

/// Vx ^= Vy
pub fn xor(state: &mut State, x: u8, y: u8) -> Result<Flow, Chip8Error> {
    let res = state.v(x) ^ state.v(y);
    state.set_v(x, res);
    Ok(Flow::Next)
}

/// Vx += Vy; VF = overflow
pub fn addr(state: &mut State, x: u8, y: u8) -> Result<Flow, Chip8Error> {
    let (res, over) = state.v(x).overflowing_add(state.v(y));
    set_with_flag(state, x, res, over);
    Ok(Flow::Next)
}

/// Vx -= Vy; VF = !underflow
pub fn sub(state: &mut State, x: u8, y: u8) -> Result<Flow, Chip8Error> {
    let (res, under) = state.v(x).overflowing_sub(state.v(y));
    set_with_flag(state, x, res, !under);
    Ok(Flow::Next)
}

/// Vx >>= 1; VF = the bit shifted out
pub fn shr(state: &mut State, x: u8) -> Result<Flow, Chip8Error> {
    let vx = state.v(x);
    set_with_flag(state, x, vx >> 1, vx & 0x1 == 1);
    Ok(Flow::Next)
}

/// Vx = Vy - Vx; VF = !underflow
pub fn subn(state: &mut State, x: u8, y: u8) -> Result<Flow, Chip8Error> {
    let (res, under) = state.v(y).overflowing_sub(state.v(x));
    set_with_flag(state, x, res, !under);
    Ok(Flow::Next)
}

/// Vx <<= 1; VF = the bit shifted out
pub fn shl(state: &mut State, x: u8) -> Result<Flow, Chip8Error> {
    let vx = state.v(x);
    set_with_flag(state, x, vx << 1, vx & 0x80 != 0);
    Ok(Flow::Next)
}

/// if Vx != Vy then skip
pub fn skrne(state: &mut State, x: u8, y: u8) -> Result<Flow, Chip8Error> {
    Ok(Flow::skip_if(state.v(x) != state.v(y)))
}

/// I = addr
pub fn loadi(state: &mut State, addr: u16) -> Result<Flow, Chip8Error> {
    state.registers.i = addr;
    Ok(Flow::Next)
}

/// PC = V0 + addr
pub fn jumpi(state: &mut State, addr: u16) -> Result<Flow, Chip8Error> {
    Ok(Flow::Jump(u16::from(state.v(0x0)) + addr))
}

/// Vx = rand_byte & nn
pub fn rand(state: &mut State, x: u8, nn: u8) -> Result<Flow, Chip8Error> {
    let rand_byte: u8 = state.rng.gen();
    state.set_v(x, rand_byte & nn);
    Ok(Flow::Next)
}

/// draw_sprite(x=Vx y=Vy size=n)
/// XORs the sprite at mem[I..I+n] onto the FrameBuffer.
/// VF = 1 if any lit pixel was erased, otherwise 0
pub fn draw(state: &mut State, x: u8, y: u8, n: u8) -> Result<Flow, Chip8Error> {
    let (vx, vy) = (state.v(x) as usize, state.v(y) as usize);
    let sprite = state.memory.slice(state.registers.i, n as usize)?;
    let collision = state.frame_buffer.draw_sprite(vx, vy, sprite);
    state.registers.v[FLAG_REGISTER] = collision as u8;
    state.draw_flag = true;
    Ok(Flow::Next)
}

/// if Vx.pressed then skip
pub fn skpr(state: &mut State, x: u8) -> Result<Flow, Chip8Error> {
    Ok(Flow::skip_if(state.keypad.is_pressed(state.v(x))))
}

/// if !Vx.pressed then skip
pub fn skup(state: &mut State, x: u8) -> Result<Flow, Chip8Error> {
    Ok(Flow::skip_if(!state.keypad.is_pressed(state.v(x))))
}

/// Vx = DT
pub fn moved(state: &mut State, x: u8) -> Result<Flow, Chip8Error> {
    let delay = state.timers.delay();
    state.set_v(x, delay);
    Ok(Flow::Next)
}

/// Vx = await keypress
/// Parks until the input source reports a press. A cancelled wait changes
/// nothing, so the instruction runs again from the top after a reset.
pub fn keyd(state: &mut State, x: u8) -> Result<Flow, Chip8Error> {
    match state.keypad.wait_for_press() {
        Some(key) => {
            state.set_v(x, key);
            Ok(Flow::Next)
        }
        None => Ok(Flow::Cancelled),
    }
}

/// DT = Vx
pub fn loadd(state: &mut State, x: u8) -> Result<Flow, Chip8Error> {
    state.timers.set_delay(state.v(x));
    Ok(Flow::Next)
}

/// ST = Vx
pub fn loads(state: &mut State, x: u8) -> Result<Flow, Chip8Error> {
    state.timers.set_sound(state.v(x));
    Ok(Flow::Next)
}

/// I += Vx
pub fn addi(state: &mut State, x: u8) -> Result<Flow, Chip8Error> {
    state.registers.i = state.registers.i.wrapping_add(u16::from(state.v(x)));
    Ok(Flow::Next)
}

/// I = FONT_BASE + Vx * 5
/// Set I to the memory address of the sprite for the hex digit in Vx.
/// See constants::SPRITE_SHEET for more details
pub fn ldspr(state: &mut State, x: u8) -> Result<Flow, Chip8Error> {
    let digit = u16::from(state.v(x) & 0xF);
    state.registers.i = FONT_BASE + digit * FONT_SPRITE_SIZE;
    Ok(Flow::Next)
}

/// mem[I..I+3] = bcd(Vx)
/// Store BCD repr of Vx in memory starting at address I
pub fn bcd(state: &mut State, x: u8) -> Result<Flow, Chip8Error> {
    let vx = state.v(x);
    let bcd = [vx / 100, vx / 10 % 10, vx % 10];
    state
        .memory
        .slice_mut(state.registers.i, bcd.len())?
        .copy_from_slice(&bcd);
    Ok(Flow::Next)
}

/// mem[I..=I+x] = V0..=Vx
/// I itself is unchanged
pub fn stor(state: &mut State, x: u8) -> Result<Flow, Chip8Error> {
    let count = x as usize + 1;
    state
        .memory
        .slice_mut(state.registers.i, count)?
        .copy_from_slice(&state.registers.v[..count]);
    Ok(Flow::Next)
}

/// V0..=Vx = mem[I..=I+x]
/// I itself is unchanged
pub fn read(state: &mut State, x: u8) -> Result<Flow, Chip8Error> {
    let count = x as usize + 1;
    let bytes = state.memory.slice(state.registers.i, count)?;
    state.registers.v[..count].copy_from_slice(bytes);
    Ok(Flow::Next)
}

// VF is written last so that it holds the flag even when x is F
fn set_with_flag(state: &mut State, x: u8, value: u8, flag: bool) {
    state.set_v(x, value);
    state.registers.v[FLAG_REGISTER] = flag as u8;
}
