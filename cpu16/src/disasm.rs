//! Disassembly and a colored per-tick trace line, for `emulator16 --trace`.
//!
//! Not part of the instruction set itself — a supplemental diagnostic
//! surface, in the same spirit as the original project's own status
//! printer, which walked live register/flag state and echoed it to the
//! terminal in color rather than through a structured logging framework.

use colored::Colorize;

use crate::bits::Word;
use crate::opcodes::{self, selector, Arity, POINTER_BIT};

fn operand_text(spec: u8, constant: Option<Word>) -> String {
    let pointer = spec & POINTER_BIT != 0;
    let sel = spec & 0b0111;
    let name = match sel {
        selector::A => "a".to_string(),
        selector::B => "b".to_string(),
        selector::C => "c".to_string(),
        selector::D => "d".to_string(),
        selector::SP => "sp".to_string(),
        selector::CONSTANT => constant.map(|c| c.to_string()).unwrap_or_else(|| "?".to_string()),
        _ => "?".to_string(),
    };
    if pointer {
        format!("[{name}]")
    } else {
        name
    }
}

/// Renders one instruction word (plus, if it consumed them, its trailing
/// constant words) as assembly text. Mirrors the table in
/// [`crate::opcodes`] so the disassembler can never drift from what the
/// parser accepts.
pub fn disassemble(word: Word, target_constant: Option<Word>, source_constant: Option<Word>) -> String {
    let primary = ((word >> 12) & 0xF) as u8;
    let sub = ((word >> 8) & 0xF) as u8;
    let a_spec = ((word >> 4) & 0xF) as u8;
    let b_spec = (word & 0xF) as u8;

    let Some(entry) = opcodes::entry_for_primary_sub(primary, sub) else {
        return format!("<unknown {word:#06x}>");
    };

    match entry.arity {
        Arity::ZeroAddress => entry.mnemonic.to_string(),
        Arity::TwoAddress => format!(
            "{} {} {}",
            entry.mnemonic,
            operand_text(a_spec, target_constant),
            operand_text(b_spec, source_constant)
        ),
        Arity::OneAddressTarget => format!("{} {}", entry.mnemonic, operand_text(a_spec, target_constant)),
        Arity::OneAddressSource => format!("{} {}", entry.mnemonic, operand_text(b_spec, source_constant)),
    }
}

/// One colored line describing the machine's state right before a tick
/// executes, for `--trace` output. Bright green for the mnemonic, dimmed
/// labels for registers, leaving structural text plain.
pub fn trace_line(tick: u64, pc: Word, mnemonic: &str, a: Word, b: Word, c: Word, d: Word, sp: Word) -> String {
    format!(
        "{:>6} {}  {}  a={} b={} c={} d={} sp={}",
        tick.to_string().dimmed(),
        format!("pc={pc:#06x}").dimmed(),
        mnemonic.green().bold(),
        a,
        b,
        c,
        d,
        sp,
    )
}

/// A standalone error or status line, colored the way a terminal-facing
/// CLI reports a fatal condition.
pub fn error_line(message: &str) -> String {
    format!("{} {}", "error:".red().bold(), message)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn disassembles_move_literal_to_register() {
        let word = opcodes::encode_instruction(
            opcodes::primary::MOVE_HDD,
            opcodes::move_hdd_sub::MOVE,
            selector::A,
            selector::CONSTANT,
        );
        assert_eq!(disassemble(word, None, Some(7)), "move a 7");
    }

    #[test]
    fn disassembles_a_pointer_operand() {
        let word = opcodes::encode_instruction(
            opcodes::primary::MOVE_HDD,
            opcodes::move_hdd_sub::MOVE,
            POINTER_BIT | selector::C,
            selector::D,
        );
        assert_eq!(disassemble(word, None, None), "move [c] d");
    }

    #[test]
    fn unknown_bit_pattern_is_reported_without_panicking() {
        let word = opcodes::encode_instruction(0b1001, 0b1111, 0, 0);
        assert!(disassemble(word, None, None).starts_with("<unknown"));
    }
}
