//! The single compile-time table mapping a mnemonic to its encoding.
//!
//! Both the parser and the disassembler consume this table (`entry_for`,
//! `entry_for_primary_sub`) instead of each keeping their own copy of
//! primary/sub-opcode bit patterns.

use crate::alu::AluOp;

/// 4-bit primary opcode classes (`OOOO` of the instruction word).
pub mod primary {
    pub const RESET: u8 = 0b0000;
    pub const SHUTDOWN: u8 = 0b0001;
    pub const MOVE_HDD: u8 = 0b0010;
    pub const STACK: u8 = 0b0011;
    pub const JUMP: u8 = 0b0100;
    pub const JUMP_NEG: u8 = 0b0101;
    pub const JUMP_ZERO: u8 = 0b0110;
    pub const JUMP_OVERFLOW: u8 = 0b0111;
    pub const ALU_COMPARE: u8 = 0b1000;
    pub const ALU_WRITEBACK: u8 = 0b1010;
}

/// Sub-opcodes within the `MOVE_HDD` class.
pub mod move_hdd_sub {
    pub const MOVE: u8 = 0b0000;
    pub const HDDREAD: u8 = 0b1000;
    pub const HDDWRITE: u8 = 0b1001;
    pub const HDDSECTOR: u8 = 0b1010;
}

/// Sub-opcodes within the `STACK` class. Bit 3 selects push (1) vs. pop
/// (0); bit 0 selects the call/return variant that also touches PC.
pub mod stack_sub {
    pub const POP: u8 = 0b0000;
    pub const RETURN: u8 = 0b0001;
    pub const PUSH: u8 = 0b1000;
    pub const CALL: u8 = 0b1001;
}

/// The 3-bit selector half of a 4-bit operand specifier; the pointer bit
/// is the specifier's top bit, kept separate since it composes with any
/// selector.
pub mod selector {
    pub const A: u8 = 0b000;
    pub const B: u8 = 0b001;
    pub const C: u8 = 0b010;
    pub const D: u8 = 0b011;
    pub const SP: u8 = 0b100;
    pub const CONSTANT: u8 = 0b101;
}

pub const POINTER_BIT: u8 = 0b1000;

/// Packs a primary opcode, sub-opcode, and the two 4-bit operand
/// specifiers into one instruction word: `OOOO SSSS AAAA BBBB`.
pub const fn encode_instruction(primary: u8, sub: u8, target: u8, source: u8) -> u16 {
    ((primary as u16) << 12) | ((sub as u16) << 8) | ((target as u16) << 4) | (source as u16)
}

/// How many operands a mnemonic's statement carries, and what role they
/// play, per the parser grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// No operands: `shutdown`, `reset`, `return`.
    ZeroAddress,
    /// Two operand specifiers (target, source): `move`, the ALU ops,
    /// `compare`, `hddread`, `hddwrite`. A constant is allowed in either
    /// position but not both.
    TwoAddress,
    /// One target specifier, no constant allowed: `inc`, `dec`, `neg`,
    /// `not`, `pop`.
    OneAddressTarget,
    /// One source specifier, constants allowed: the jump family, `push`,
    /// `call`, `hddsector`.
    OneAddressSource,
}

/// A single row of the opcode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeEntry {
    pub mnemonic: &'static str,
    pub primary: u8,
    pub sub: u8,
    pub arity: Arity,
}

macro_rules! entry {
    ($mnemonic:literal, $primary:expr, $sub:expr, $arity:expr) => {
        OpcodeEntry {
            mnemonic: $mnemonic,
            primary: $primary,
            sub: $sub,
            arity: $arity,
        }
    };
}

pub const TABLE: &[OpcodeEntry] = &[
    entry!("shutdown", primary::SHUTDOWN, 0, Arity::ZeroAddress),
    entry!("reset", primary::RESET, 0, Arity::ZeroAddress),
    entry!("return", primary::STACK, stack_sub::RETURN, Arity::ZeroAddress),
    entry!("move", primary::MOVE_HDD, move_hdd_sub::MOVE, Arity::TwoAddress),
    entry!("hddread", primary::MOVE_HDD, move_hdd_sub::HDDREAD, Arity::TwoAddress),
    entry!("hddwrite", primary::MOVE_HDD, move_hdd_sub::HDDWRITE, Arity::TwoAddress),
    entry!(
        "hddsector",
        primary::MOVE_HDD,
        move_hdd_sub::HDDSECTOR,
        Arity::OneAddressSource
    ),
    entry!("pop", primary::STACK, stack_sub::POP, Arity::OneAddressTarget),
    entry!("push", primary::STACK, stack_sub::PUSH, Arity::OneAddressSource),
    entry!("call", primary::STACK, stack_sub::CALL, Arity::OneAddressSource),
    entry!("jump", primary::JUMP, 0, Arity::OneAddressSource),
    entry!("jump_neg", primary::JUMP_NEG, 0, Arity::OneAddressSource),
    entry!("jump_zero", primary::JUMP_ZERO, 0, Arity::OneAddressSource),
    entry!("jump_overflow", primary::JUMP_OVERFLOW, 0, Arity::OneAddressSource),
    entry!("add", primary::ALU_WRITEBACK, alu_bits(AluOp::Add), Arity::TwoAddress),
    entry!("sub", primary::ALU_WRITEBACK, alu_bits(AluOp::Subtract), Arity::TwoAddress),
    entry!("and", primary::ALU_WRITEBACK, alu_bits(AluOp::And), Arity::TwoAddress),
    entry!("or", primary::ALU_WRITEBACK, alu_bits(AluOp::Or), Arity::TwoAddress),
    entry!("xor", primary::ALU_WRITEBACK, alu_bits(AluOp::Xor), Arity::TwoAddress),
    entry!("not", primary::ALU_WRITEBACK, alu_bits(AluOp::Not), Arity::OneAddressTarget),
    entry!("neg", primary::ALU_WRITEBACK, alu_bits(AluOp::Negate), Arity::OneAddressTarget),
    entry!("inc", primary::ALU_WRITEBACK, alu_bits(AluOp::Increment), Arity::OneAddressTarget),
    entry!("dec", primary::ALU_WRITEBACK, alu_bits(AluOp::Decrement), Arity::OneAddressTarget),
    entry!("compare", primary::ALU_COMPARE, alu_bits(AluOp::Subtract), Arity::TwoAddress),
];

/// The canonical sub-opcode bits an ALU-class instruction uses, matching
/// [`AluOp::from_bits`]'s inverse.
const fn alu_bits(op: AluOp) -> u8 {
    match op {
        AluOp::Pass => 0b0000,
        AluOp::Negate => 0b0001,
        AluOp::Increment => 0b0010,
        AluOp::Decrement => 0b0011,
        AluOp::Add => 0b0100,
        AluOp::Subtract => 0b0101,
        AluOp::Not => 0b1001,
        AluOp::And => 0b1010,
        AluOp::Or => 0b1100,
        AluOp::Xor => 0b1110,
        AluOp::NotAnd => 0b1101,
        AluOp::NotOr => 0b1011,
        AluOp::NotXor => 0b1111,
    }
}

pub fn entry_for(mnemonic: &str) -> Option<&'static OpcodeEntry> {
    TABLE.iter().find(|e| e.mnemonic == mnemonic)
}

/// Looks up the table row matching a decoded instruction's primary/sub
/// bits, for the disassembler. Several mnemonics can share (primary, sub)
/// only when arity alone would disambiguate them, which doesn't happen in
/// this table, so the first match is always the right one.
pub fn entry_for_primary_sub(primary: u8, sub: u8) -> Option<&'static OpcodeEntry> {
    TABLE.iter().find(|e| e.primary == primary && e.sub == sub)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn every_mnemonic_round_trips_through_primary_sub_lookup() {
        for e in TABLE {
            let found = entry_for_primary_sub(e.primary, e.sub).unwrap();
            assert_eq!(found.mnemonic, e.mnemonic);
        }
    }

    #[test]
    fn unknown_mnemonic_is_none() {
        assert!(entry_for("nope").is_none());
    }

    #[test]
    fn alu_writeback_entries_use_the_same_bits_as_aluop_decodes_to() {
        for e in TABLE {
            if e.primary == primary::ALU_WRITEBACK || e.primary == primary::ALU_COMPARE {
                let op = AluOp::from_bits(e.sub);
                assert_eq!(alu_bits(op), e.sub, "{}", e.mnemonic);
            }
        }
    }
}
