use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Error, Result};
use log::{debug, info};
use sdl2::event::Event;
use sdl2::keyboard::Keycode;

use emu8_core::{Chip8, FrameBuffer, Instruction, Keypad, Status, StepResult, TimerClock};
use emu8_display::Display;

use crate::keymap::{from_hex_char, lookup};

/// How often the window polls input and redraws
const FRAME_TIME: Duration = Duration::from_millis(16);

/// What the executor thread and the window share
#[derive(Default)]
struct Shared {
    /// the newest frame the executor produced and the window hasn't shown yet
    frame: Mutex<Option<FrameBuffer>>,
    /// whether or not the clock speed should be respected
    fast_forward: AtomicBool,
    quit: AtomicBool,
}

impl Shared {
    fn publish(&self, frame: FrameBuffer) {
        *self.frame.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame);
    }

    fn take_frame(&self) -> Option<FrameBuffer> {
        self.frame
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Runs a loaded Chip-8 in an SDL2 window until the window is closed.
///
/// The VM steps on its own thread so that a blocking key wait never stalls the
/// event loop; closing the window cancels any such wait.
pub fn run(mut chip8: Chip8, ips: u32, scale: u32) -> Result<()> {
    // Get SDL2 context
    let sdl = sdl2::init().map_err(Error::msg).context("unable to start SDL2")?;
    let mut display = Display::new(&sdl, scale)
        .map_err(Error::msg)
        .context("unable to open a window")?;
    let mut events = sdl.event_pump().map_err(Error::msg)?;

    let keypad = chip8.keypad();
    let timers = chip8.timers();
    let clock = TimerClock::start(Arc::clone(&timers)).context("unable to start the timer clock")?;
    let shared = Arc::new(Shared::default());
    let mut sounding = false;

    let executor = {
        let shared = Arc::clone(&shared);
        thread::Builder::new()
            .name("executor".into())
            .spawn(move || {
                execute(&mut chip8, &shared, ips, None);
                chip8
            })
            .context("unable to start the executor")?
    };

    'event: loop {
        // Render the newest frame, if there is one
        if let Some(frame) = shared.take_frame() {
            display.render(&frame).map_err(Error::msg)?;
        }
        if timers.is_sounding() != sounding {
            sounding = !sounding;
            display.set_sounding(sounding).map_err(Error::msg)?;
        }

        // Handle input
        for event in events.poll_iter() {
            match event {
                Event::Quit { .. } => break 'event,
                Event::KeyDown {
                    keycode: Some(key),
                    repeat: false,
                    ..
                } => match (key, lookup(key)) {
                    (_, Some(kc)) => keypad.set_key_pressed(kc, true),
                    (Keycode::Space, _) => shared.fast_forward.store(true, Ordering::Relaxed),
                    (Keycode::Escape, _) => break 'event,
                    _ => continue,
                },
                Event::KeyUp {
                    keycode: Some(key), ..
                } => match (key, lookup(key)) {
                    (_, Some(kc)) => keypad.set_key_pressed(kc, false),
                    (Keycode::Space, _) => shared.fast_forward.store(false, Ordering::Relaxed),
                    _ => continue,
                },
                _ => continue,
            };
        }

        thread::sleep(FRAME_TIME);
    }

    shared.quit.store(true, Ordering::Relaxed);
    keypad.cancel();
    let chip8 = executor
        .join()
        .map_err(|_| anyhow!("the executor thread panicked"))?;
    clock.stop();
    report(&chip8)
}

/// Runs a loaded Chip-8 without a window for at most `max_cycles` instructions,
/// then prints the display as text.
///
/// Hex digits read from stdin are pressed and released in order; once stdin
/// closes, any key wait halts the VM.
pub fn run_headless(mut chip8: Chip8, ips: u32, max_cycles: u64) -> Result<()> {
    let keypad = chip8.keypad();
    thread::Builder::new()
        .name("stdin-keys".into())
        .spawn(move || read_keys(io::stdin().lock(), &keypad))
        .context("unable to start the stdin reader")?;

    let clock = TimerClock::start(chip8.timers()).context("unable to start the timer clock")?;
    let cycles = execute(&mut chip8, &Shared::default(), ips, Some(max_cycles));
    clock.stop();

    info!("ran {} cycles", cycles);
    println!("{}", chip8.frame());
    report(&chip8)
}

/// Steps the VM at `ips` instructions per second until it stops, the host
/// asks it to quit, or `max_cycles` have run. Returns the number of cycles run.
fn execute(chip8: &mut Chip8, shared: &Shared, ips: u32, max_cycles: Option<u64>) -> u64 {
    let cycle_time = Duration::from_secs(1) / ips.max(1);
    let mut last_cycle = Instant::now();
    let mut cycles = 0;

    while !shared.quit.load(Ordering::Relaxed) && max_cycles.map_or(true, |max| cycles < max) {
        let result = chip8.step();
        cycles += 1;
        if let Some(frame) = chip8.take_frame() {
            shared.publish(frame);
        }
        if result != StepResult::Continue {
            debug!("executor stopped: {:?}", result);
            break;
        }

        // Handle timing
        let elapsed_cycle_time = last_cycle.elapsed();
        if !shared.fast_forward.load(Ordering::Relaxed) && cycle_time > elapsed_cycle_time {
            thread::sleep(cycle_time - elapsed_cycle_time);
        }
        last_cycle = Instant::now();
    }
    cycles
}

fn read_keys(input: impl BufRead, keypad: &Keypad) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        for key in line.chars().filter_map(from_hex_char) {
            keypad.set_key_pressed(key, true);
            keypad.set_key_pressed(key, false);
        }
    }
    keypad.cancel();
}

/// Turns the final status into the process result, naming the instruction at
/// fault when it can be decoded
fn report(chip8: &Chip8) -> Result<()> {
    match chip8.status() {
        Status::Running => info!("stopped"),
        Status::Halted => info!("halted"),
        Status::Faulted(error) => {
            let pc = chip8.registers().pc;
            let at = match chip8.memory().fetch(pc).and_then(Instruction::decode) {
                Ok(instruction) => format!("at {:#05X} ({})", pc, instruction),
                Err(_) => format!("at {:#05X}", pc),
            };
            return Err(Error::new(error.clone()).context(format!("the VM faulted {}", at)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu8_core::Config;

    fn chip8_with(rom: &[u8]) -> Chip8 {
        let mut chip8 = Chip8::with_config(Config {
            seed: Some(8),
            ..Config::default()
        });
        chip8.load(rom).unwrap();
        chip8
    }

    #[test]
    fn test_execute_stops_at_max_cycles() {
        // JP 0x200 forever
        let mut chip8 = chip8_with(&[0x12, 0x00]);
        let shared = Shared::default();
        shared.fast_forward.store(true, Ordering::Relaxed);
        assert_eq!(execute(&mut chip8, &shared, 1, Some(5)), 5);
        assert_eq!(chip8.status(), &Status::Running);
    }

    #[test]
    fn test_execute_publishes_frames() {
        // CLS; STOP
        let mut chip8 = chip8_with(&[0x00, 0xE0, 0xF0, 0x00]);
        let shared = Shared::default();
        assert_eq!(execute(&mut chip8, &shared, 1000, None), 2);
        assert!(shared.take_frame().is_some());
        assert!(shared.take_frame().is_none());
        assert!(report(&chip8).is_ok());
    }

    #[test]
    fn test_execute_honours_quit() {
        let mut chip8 = chip8_with(&[0x12, 0x00]);
        let shared = Shared::default();
        shared.quit.store(true, Ordering::Relaxed);
        assert_eq!(execute(&mut chip8, &shared, 1000, None), 0);
    }

    #[test]
    fn test_read_keys_presses_then_cancels() {
        let keypad = Keypad::new();
        read_keys(io::Cursor::new("a\n"), &keypad);
        assert!(!keypad.is_pressed(0xA));
        assert!(keypad.is_cancelled());
    }

    #[test]
    fn test_report_names_faulting_instruction() {
        let mut chip8 = chip8_with(&[0x00, 0xEE]);
        chip8.step();
        let message = format!("{:#}", report(&chip8).unwrap_err());
        assert!(message.contains("at 0x200 (RET)"), "{}", message);
        assert!(message.contains("stack underflow"), "{}", message);
    }
}
