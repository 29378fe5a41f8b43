//! The hard disk: a linear bit store organized into 512-bit (32-word)
//! sectors, addressed through a latched sector register.

use crate::bits::Word;
use crate::error::DiskRangeError;
use crate::register::Register;

const SECTOR_WORDS: usize = 32;

/// A sector-addressed word store. The sector register is edge-triggered
/// like any other register; the data itself is written immediately (it
/// has no staged/committed distinction — only the sector selector does).
pub struct HardDisk {
    words: Vec<Word>,
    sector: Register,
}

impl HardDisk {
    /// Creates a disk with `sector_count` sectors, all zeroed.
    pub fn new(sector_count: usize) -> HardDisk {
        HardDisk {
            words: vec![0; sector_count * SECTOR_WORDS],
            sector: Register::new(),
        }
    }

    /// Builds a disk from raw word content, sized up to a whole number of
    /// sectors. Used to load an assembled `.bin` image onto sector 0.
    pub fn from_words(words: Vec<Word>, sector_count: usize) -> HardDisk {
        let mut disk = HardDisk::new(sector_count.max(words.len().div_ceil(SECTOR_WORDS)));
        for (i, word) in words.into_iter().enumerate() {
            disk.words[i] = word;
        }
        disk
    }

    pub fn sector_count(&self) -> usize {
        self.words.len() / SECTOR_WORDS
    }

    /// Performs one disk access: stage the sector register, compute the
    /// word offset from the *current* (pre-tick) sector, optionally
    /// write, then return the word at that offset (reflecting the write
    /// just performed, if any).
    pub fn access(
        &mut self,
        address: Word,
        select_sector: bool,
        value: Word,
        write: bool,
    ) -> Result<Word, DiskRangeError> {
        self.sector.write(address, select_sector);

        let sector = self.sector.read();
        let offset = sector as usize * SECTOR_WORDS + address as usize;

        if offset >= self.words.len() {
            return Err(DiskRangeError {
                sector,
                word: address,
            });
        }

        if write {
            self.words[offset] = value;
        }
        Ok(self.words[offset])
    }

    pub fn tick(&mut self) {
        self.sector.tick();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn write_then_read_same_sector() {
        let mut disk = HardDisk::new(4);
        disk.access(0, false, 0, true).unwrap(); // select sector 0 implicitly (default)
        disk.access(3, false, 99, true).unwrap();
        assert_eq!(disk.access(3, false, 0, false).unwrap(), 99);
    }

    #[test]
    fn sector_register_is_edge_triggered() {
        let mut disk = HardDisk::new(4);
        disk.access(5, false, 111, true).unwrap(); // sector 0, word 5
        disk.access(1, true, 222, true).unwrap(); // select sector 1, but write lands in sector 0 this cycle
        assert_eq!(disk.access(5, false, 0, false).unwrap(), 111);
        disk.tick();
        // Now on sector 1.
        disk.access(5, false, 0, true).unwrap();
        assert_eq!(disk.access(5, false, 0, false).unwrap(), 0);
    }

    #[test]
    fn out_of_range_access_is_an_error() {
        let mut disk = HardDisk::new(1);
        let err = disk.access(SECTOR_WORDS as u16, false, 0, false).unwrap_err();
        assert_eq!(err.sector, 0);
    }

    #[test]
    fn from_words_preserves_content() {
        let disk = HardDisk::from_words(vec![1, 2, 3], 1);
        assert_eq!(disk.sector_count(), 1);
    }
}
