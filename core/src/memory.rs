use std::ops::Range;

use crate::constants::{FONT_BASE, MAX_ROM_SIZE, MEMORY_SIZE, PROGRAM_START, SPRITE_SHEET};
use crate::error::Chip8Error;

/// # Memory
/// 4096 bytes of byte-addressed RAM.
///
/// ```text
/// 0x000 - 0x1FF  reserved; the sprite sheet sits at FONT_BASE (0x050)
/// 0x200 - 0xFFF  program and data
/// ```
///
/// Every access is bounds checked and reports `OutOfBounds` rather than panicking.
#[derive(Clone)]
pub struct Memory {
    bytes: [u8; MEMORY_SIZE],
}

impl Memory {
    /// Zeroed memory with the sprite sheet copied in
    pub fn new() -> Self {
        let mut memory = Memory {
            bytes: [0; MEMORY_SIZE],
        };
        memory.clear();
        memory
    }

    /// Restores the power-on contents: zeroes and the sprite sheet
    pub fn clear(&mut self) {
        self.bytes = [0; MEMORY_SIZE];
        let font = FONT_BASE as usize;
        self.bytes[font..font + SPRITE_SHEET.len()].copy_from_slice(&SPRITE_SHEET);
    }

    /// Copies a ROM into memory starting at `PROGRAM_START`
    ///
    /// # Arguments
    /// * `rom` the raw program image
    pub fn load(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        if rom.len() > MAX_ROM_SIZE {
            return Err(Chip8Error::RomTooLarge {
                size: rom.len(),
                max: MAX_ROM_SIZE,
            });
        }
        let start = PROGRAM_START as usize;
        self.bytes[start..start + rom.len()].copy_from_slice(rom);
        Ok(())
    }

    pub fn read(&self, addr: u16) -> Result<u8, Chip8Error> {
        self.bytes
            .get(addr as usize)
            .copied()
            .ok_or(Chip8Error::OutOfBounds {
                address: addr as usize,
            })
    }

    pub fn write(&mut self, addr: u16, value: u8) -> Result<(), Chip8Error> {
        let byte = self
            .bytes
            .get_mut(addr as usize)
            .ok_or(Chip8Error::OutOfBounds {
                address: addr as usize,
            })?;
        *byte = value;
        Ok(())
    }

    /// Reads the big-endian instruction word at `addr`.
    /// Both bytes must be in memory, so the last fetchable address is `MEMORY_SIZE - 2`.
    pub fn fetch(&self, addr: u16) -> Result<u16, Chip8Error> {
        let word = self.slice(addr, 2)?;
        Ok(u16::from(word[0]) << 8 | u16::from(word[1]))
    }

    /// A read-only view of `len` bytes starting at `addr`
    pub fn slice(&self, addr: u16, len: usize) -> Result<&[u8], Chip8Error> {
        let range = Self::range(addr, len)?;
        Ok(&self.bytes[range])
    }

    /// A mutable view of `len` bytes starting at `addr`
    pub fn slice_mut(&mut self, addr: u16, len: usize) -> Result<&mut [u8], Chip8Error> {
        let range = Self::range(addr, len)?;
        Ok(&mut self.bytes[range])
    }

    /// The whole address space, for inspection by debuggers and tests
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn range(addr: u16, len: usize) -> Result<Range<usize>, Chip8Error> {
        let start = addr as usize;
        let end = start + len;
        if end > MEMORY_SIZE {
            // report the first byte that doesn't exist
            return Err(Chip8Error::OutOfBounds {
                address: start.max(MEMORY_SIZE),
            });
        }
        Ok(start..end)
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_zeroed_past_reserved_region() {
        let m = Memory::new();
        assert!(m.as_bytes()[PROGRAM_START as usize..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_sprite_sheet_at_font_base() {
        let m = Memory::new();
        assert_eq!(m.slice(FONT_BASE, 80).unwrap(), &SPRITE_SHEET[..]);
        assert_eq!(m.read(FONT_BASE - 1), Ok(0));
    }

    #[test]
    fn test_program_load_ok() {
        let mut m = Memory::new();
        m.load(&[0x00, 0xE0]).unwrap();
        assert_eq!(m.slice(0x200, 2).unwrap(), &[0x00, 0xE0]);
    }

    #[test]
    fn test_load_largest_rom() {
        let mut m = Memory::new();
        assert_eq!(m.load(&[0xAB; MEMORY_SIZE - 0x200]), Ok(()));
        assert_eq!(m.read(0xFFF), Ok(0xAB));
    }

    #[test]
    fn test_load_rejects_oversized_rom() {
        let mut m = Memory::new();
        assert_eq!(
            m.load(&[0xAB; MEMORY_SIZE - 0x200 + 1]),
            Err(Chip8Error::RomTooLarge {
                size: 0xE01,
                max: 0xE00
            })
        );
        // nothing was copied
        assert_eq!(m.read(0x200), Ok(0));
    }

    #[test]
    fn test_read_write() {
        let mut m = Memory::new();
        m.write(0x300, 0x42).unwrap();
        assert_eq!(m.read(0x300), Ok(0x42));
    }

    #[test]
    fn test_read_write_out_of_bounds() {
        let mut m = Memory::new();
        assert_eq!(
            m.read(0x1000),
            Err(Chip8Error::OutOfBounds { address: 0x1000 })
        );
        assert_eq!(
            m.write(0xFFFF, 1),
            Err(Chip8Error::OutOfBounds { address: 0xFFFF })
        );
    }

    #[test]
    fn test_fetch_word() {
        let mut m = Memory::new();
        m.load(&[0xAA, 0xBB]).unwrap();
        assert_eq!(m.fetch(0x200), Ok(0xAABB));
    }

    #[test]
    fn test_fetch_last_word() {
        let mut m = Memory::new();
        m.write(4094, 0x12).unwrap();
        m.write(4095, 0x34).unwrap();
        assert_eq!(m.fetch(4094), Ok(0x1234));
        assert_eq!(m.fetch(4095), Err(Chip8Error::OutOfBounds { address: 4096 }));
        assert_eq!(m.fetch(4096), Err(Chip8Error::OutOfBounds { address: 4096 }));
    }

    #[test]
    fn test_slice_out_of_bounds() {
        let mut m = Memory::new();
        assert!(m.slice(0xFFD, 3).is_ok());
        assert!(m.slice(0xFFE, 3).is_err());
        assert!(m.slice_mut(0xFFF, 2).is_err());
    }
}
