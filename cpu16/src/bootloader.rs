//! The bootloader: a small program written in the same assembly language
//! as anything else, assembled once in `boot` mode and burned into RAM at
//! address 0 before the machine's first tick.
//!
//! Its job, per the disk layout: read the total image length from disk
//! sector 0 word 0, copy the loader-plus-code portion (word 2 onward —
//! word 1 is the variable-allocation count, which the bootloader itself
//! has no use for) into RAM at [`PROGRAM_START`], push that address as
//! the relocating loader's base, and fall through into it.

use crate::bits::Word;
use crate::error::ParserError;
use crate::lexer::lex;
use crate::linker::{link, Mode};
use crate::parser::parse;

/// Where the bootloader places the copied program. Chosen comfortably
/// past the bootloader's own code so the copy never overwrites it.
pub const PROGRAM_START: u16 = 256;

const SOURCE: &str = r#"
move sp BP
move a 2
move c 256
hddread b 0
dec b
dec b
:copy_loop
compare b 0
jump_zero transfer
hddread d a
move [c] d
inc a
inc c
dec b
jump copy_loop
:transfer
push 256
jump 256
"#;

/// Assembles the bootloader source into its boot-mode word image. The
/// source is fixed, so this can only fail if a future edit to it breaks
/// the grammar — treated as a bug, not a runtime condition.
pub fn assemble() -> Vec<Word> {
    assemble_checked().expect("the bootloader source is a fixed, valid program")
}

fn assemble_checked() -> Result<Vec<Word>, ParserError> {
    let tokens = lex(SOURCE).expect("the bootloader source uses only the lexer's alphabet");
    let parsed = parse(&tokens)?;
    Ok(link(&parsed, Mode::Boot).expect("boot-mode linking cannot fail once parsing succeeds"))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::emulator::Emulator;

    const SECTOR_WORDS: usize = 32;

    #[test]
    fn assembles_without_error() {
        let image = assemble();
        assert!(!image.is_empty());
    }

    #[test]
    fn has_no_unresolved_references() {
        // assemble() would already have panicked on a LinkerError; this
        // just documents the expectation for a reader of the test file.
        let _ = assemble();
    }

    fn assemble_loadable(src: &str) -> Vec<Word> {
        let tokens = lex(src).unwrap();
        let parsed = parse(&tokens).unwrap();
        link(&parsed, Mode::Loadable).unwrap()
    }

    fn boot_and_run(disk_image: Vec<Word>, max_ticks: u64) -> Emulator {
        let sector_count = disk_image.len().div_ceil(SECTOR_WORDS).max(1);
        let mut emulator = Emulator::new(sector_count);
        emulator.load_disk(disk_image, sector_count);
        emulator.load_image(&assemble());
        let ticks = emulator.run(max_ticks).unwrap();
        assert!(emulator.is_shutdown(), "program never shut down within {ticks} ticks");
        emulator
    }

    /// Spec scenario 6: the bootloader, run against a loadable-mode disk
    /// image with no sentinels (so no relocating loader is even emitted),
    /// copies the program to `PROGRAM_START` and falls through into it.
    #[test]
    fn bootloader_runs_a_sentinel_free_loadable_program() {
        let disk_image = assemble_loadable("move a 9\nshutdown");
        // header(2) + code(3: the move's instruction word, its constant 9,
        // and the shutdown instruction word); no sentinels, so no loader.
        assert_eq!(disk_image.len(), 5);
        assert_eq!(disk_image[0], 5);
        assert_eq!(disk_image[1], 0);
        assert_eq!(disk_image[3], 9);

        let emulator = boot_and_run(disk_image, 1000);
        assert_eq!(emulator.snapshot().a, 9);
    }

    /// Spec scenario 5, composed with the full loader: a variable is
    /// referenced twice, so the linker emits a relocating loader with two
    /// four-word patch blocks (loader_size = 1 + 4*2 = 9), and the
    /// bootloader's copy-and-relocate path has to actually run for the
    /// variable's address to resolve to a real RAM location.
    #[test]
    fn bootloader_runs_a_loadable_program_with_a_relocated_variable() {
        let disk_image = assemble_loadable(
            "alloc counter 1\nmove [counter] 5\nmove a [counter]\nshutdown",
        );

        let loader_size: u16 = 1 + 4 * 2;
        let code_size: u16 = 6; // 2 instrs + sentinel + literal + instr + sentinel
        let counter_offset = loader_size + code_size;
        assert_eq!(disk_image[0], 2 + loader_size + code_size);

        let emulator = boot_and_run(disk_image, 1000);
        assert_eq!(emulator.snapshot().a, 5);

        let counter_address = PROGRAM_START + counter_offset;
        assert_eq!(emulator.peek(counter_address), 5);
    }
}
