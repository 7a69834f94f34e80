use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;

use emu8_core::constants::STACK_DEPTH;
use emu8_core::{Chip8, Config, CLOCK_SPEED};

mod keymap;
mod run;

/// A Chip-8 emulator
#[derive(Parser, Debug)]
#[command(name = "emu8", version, about, long_about = None)]
struct Args {
    /// Path to the ROM file to run
    rom: PathBuf,

    #[arg(long, default_value_t = CLOCK_SPEED, help = "Instructions per second")]
    ips: u32,

    #[arg(long, default_value_t = 10, help = "Window pixels per Chip-8 pixel")]
    scale: u32,

    #[arg(long, help = "Seed for the random number generator")]
    seed: Option<u64>,

    #[arg(long, default_value_t = STACK_DEPTH, help = "Maximum nested subroutine calls")]
    stack_depth: usize,

    #[arg(long, help = "Return from subroutines restoring only the program counter")]
    pc_only_return: bool,

    #[arg(long, help = "Run without a window and print the final display")]
    headless: bool,

    #[arg(long, default_value_t = 10_000, help = "Instructions to run in headless mode")]
    max_cycles: u64,
}

impl Args {
    fn config(&self) -> Config {
        Config {
            stack_depth: self.stack_depth,
            seed: self.seed,
            full_context_return: !self.pc_only_return,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    // Load ROM
    let rom = fs::read(&args.rom)
        .with_context(|| format!("unable to read ROM {}", args.rom.display()))?;
    let mut chip8 = Chip8::with_config(args.config());
    chip8
        .load(&rom)
        .with_context(|| format!("unable to load ROM {}", args.rom.display()))?;
    info!("loaded {}", args.rom.display());

    if args.headless {
        run::run_headless(chip8, args.ips, args.max_cycles)
    } else {
        run::run(chip8, args.ips, args.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["emu8", "pong.ch8"]).unwrap();
        assert_eq!(args.ips, CLOCK_SPEED);
        assert_eq!(args.config(), Config::default());
        assert!(!args.headless);
    }

    #[test]
    fn test_args_config() {
        let args = Args::try_parse_from([
            "emu8",
            "pong.ch8",
            "--seed",
            "7",
            "--stack-depth",
            "4",
            "--pc-only-return",
        ])
        .unwrap();
        assert_eq!(
            args.config(),
            Config {
                stack_depth: 4,
                seed: Some(7),
                full_context_return: false,
            }
        );
    }
}
