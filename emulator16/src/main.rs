//! `emulator16`: boots a disk image through the bootloader and runs it.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use cpu16::bootloader;
use cpu16::disasm;
use cpu16::emulator::Emulator;
use thiserror::Error;

const SECTOR_WORDS: usize = 32;

#[derive(Parser, Debug)]
#[command(name = "emulator16", about = "Boots and runs a disk image")]
struct Args {
    /// Disk image to load onto sector 0 before booting.
    disk_image: PathBuf,

    /// Print a disassembled trace of every executed instruction.
    #[arg(long)]
    trace: bool,

    /// Stop after this many ticks even if the program never shuts down.
    #[arg(long, default_value_t = 1_000_000)]
    max_ticks: u64,
}

#[derive(Debug, Error)]
enum RunError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Disk(#[from] cpu16::error::DiskRangeError),
}

fn words_from_bytes(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [hi] => u16::from_be_bytes([*hi, 0]),
            _ => unreachable!("chunks(2) never yields more than 2 bytes"),
        })
        .collect()
}

fn run(args: Args) -> Result<(), RunError> {
    let bytes = fs::read(&args.disk_image)?;
    let words = words_from_bytes(&bytes);
    let sector_count = words.len().div_ceil(SECTOR_WORDS).max(1);

    let mut emulator = Emulator::new(sector_count);
    emulator.load_disk(words, sector_count);
    emulator.load_image(&bootloader::assemble());

    let mut ticks = 0u64;
    while ticks < args.max_ticks && !emulator.is_shutdown() {
        if args.trace {
            print_trace_line(&emulator, ticks);
        }
        emulator.tick()?;
        ticks += 1;
    }

    if emulator.is_shutdown() {
        println!("{} after {ticks} ticks", "shutdown".green().bold());
    } else {
        println!("{} after {ticks} ticks (max-ticks reached)", "stopped".yellow().bold());
    }
    Ok(())
}

fn print_trace_line(emulator: &Emulator, tick: u64) {
    let snapshot = emulator.snapshot();
    let instruction = emulator.peek(snapshot.pc);
    let target_constant = Some(emulator.peek(snapshot.pc.wrapping_add(1)));
    let source_constant = Some(emulator.peek(snapshot.pc.wrapping_add(2)));
    let mnemonic = disasm::disassemble(instruction, target_constant, source_constant);
    println!(
        "{}",
        disasm::trace_line(tick, snapshot.pc, &mnemonic, snapshot.a, snapshot.b, snapshot.c, snapshot.d, snapshot.sp)
    );
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", disasm::error_line(&err.to_string()));
            ExitCode::FAILURE
        }
    }
}
