//! The atomic datum of the machine: a 16-bit word.
//!
//! Every register, memory cell, and I/O value is exactly one `Word`. This
//! module only carries the conversions between a word and the decimal
//! integers the assembler and tests work with; the arithmetic itself lives
//! in [`crate::alu`].

/// A 16-bit word. Bit 0 is the most significant bit; bit 15 the least.
pub type Word = u16;

/// Converts a non-negative decimal value into its 16-bit word encoding.
///
/// Returns `None` outside `[0, 65535]` rather than truncating, so a literal
/// too large for a word is a rejected input, not a silently wrapped one.
/// This is the single conversion every layer that turns a decimal integer
/// into a `Word` should go through.
pub fn dec_to_bin(value: u64) -> Option<Word> {
    u16::try_from(value).ok()
}

/// Converts a word back into its unsigned decimal value.
pub fn bin_to_dec(word: Word) -> u64 {
    word as u64
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips_every_word() {
        for value in 0..=u16::MAX {
            assert_eq!(bin_to_dec(dec_to_bin(value as u64).unwrap()), value as u64);
        }
    }

    #[test]
    fn round_trips_every_decimal_in_range() {
        for value in [0u64, 1, 2, 1024, 32767, 32768, 65535] {
            let word = dec_to_bin(value).unwrap();
            assert_eq!(dec_to_bin(bin_to_dec(word)).unwrap(), word);
        }
    }

    #[test]
    fn rejects_values_past_a_word() {
        assert_eq!(dec_to_bin(65536), None);
        assert_eq!(dec_to_bin(u64::MAX), None);
    }
}
