//! Error taxonomy for the assembler pipeline and the emulator's external
//! failures. The CPU decoder itself never raises an error (see
//! [`crate::cpu`]); undefined opcode bit patterns execute as whatever the
//! combinational logic yields.

use thiserror::Error;

/// Raised by the lexer: a character outside the valid alphabet, or a
/// digit run that names an integer too large for a word.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexerError {
    #[error("line {line}: unexpected character {ch:?}")]
    UnexpectedCharacter { ch: char, line: u32 },

    #[error("line {line}: literal '{lexeme}' does not fit in a 16-bit word")]
    LiteralOutOfRange { lexeme: String, line: u32 },
}

/// Raised by the parser: unexpected tokens, arity mismatches, duplicate or
/// undeclared labels, literal-to-literal moves, and so on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParserError {
    #[error("line {line}: unexpected end of input")]
    UnexpectedEof { line: u32 },

    #[error("line {line}: expected an operand, got {found}")]
    ExpectedOperand { line: u32, found: String },

    #[error("line {line}: expected ']', got {found}")]
    ExpectedRightBracket { line: u32, found: String },

    #[error("line {line}: both operands of a two-address instruction are constants")]
    BothOperandsConstant { line: u32 },

    #[error("line {line}: a constant cannot be used as a target operand")]
    ConstantAsTarget { line: u32 },

    #[error("line {line}: '{name}' is already declared")]
    DuplicateName { line: u32, name: String },

    #[error("line {line}: unknown identifier '{name}'")]
    UnknownName { line: u32, name: String },

    #[error("line {line}: expected a name after ':' or 'alloc'")]
    ExpectedName { line: u32 },

    #[error("line {line}: expected an integer, got {found}")]
    ExpectedInteger { line: u32, found: String },
}

/// Raised by the linker when a sentinel survives linking. This is always a
/// parser bug: the parser is required to reject any operand referencing an
/// unknown name before the linker ever runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unresolved reference to '{name}' survived linking")]
pub struct LinkerError {
    pub name: String,
}

/// Raised when the hard disk is accessed beyond its backing store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("disk access at sector {sector} word {word} is out of range")]
pub struct DiskRangeError {
    pub sector: u16,
    pub word: u16,
}
