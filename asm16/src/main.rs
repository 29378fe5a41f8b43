//! `asm16`: assembles a `.eas` source file into a binary image.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use colored::Colorize;
use cpu16::lexer::lex;
use cpu16::linker::{link, Mode as LinkMode};
use cpu16::parser::parse;
use thiserror::Error;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Boot,
    Loadable,
}

impl From<Mode> for LinkMode {
    fn from(mode: Mode) -> LinkMode {
        match mode {
            Mode::Boot => LinkMode::Boot,
            Mode::Loadable => LinkMode::Loadable,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "asm16", about = "Assembles a .eas source file into a binary image")]
struct Args {
    /// Source file to assemble.
    input: PathBuf,

    /// Where to write the assembled image.
    #[arg(short, long, default_value = "a.bin")]
    output: PathBuf,

    /// Boot images run in place at address 0; loadable images carry a
    /// relocating loader and can be placed anywhere.
    #[arg(long, value_enum, default_value = "loadable")]
    mode: Mode,
}

#[derive(Debug, Error)]
enum AsmError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Lexer(#[from] cpu16::error::LexerError),
    #[error("{0}")]
    Parser(#[from] cpu16::error::ParserError),
    #[error("{0}")]
    Linker(#[from] cpu16::error::LinkerError),
}

fn run(args: Args) -> Result<(), AsmError> {
    let source = fs::read_to_string(&args.input)?;
    let tokens = lex(&source)?;
    let parsed = parse(&tokens)?;
    let words = link(&parsed, args.mode.into())?;

    let mut bytes = Vec::with_capacity(words.len() * 2);
    for word in words {
        bytes.extend_from_slice(&word.to_be_bytes());
    }
    fs::write(&args.output, bytes)?;

    println!(
        "{} {} -> {}",
        "assembled".green().bold(),
        args.input.display(),
        args.output.display()
    );
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
