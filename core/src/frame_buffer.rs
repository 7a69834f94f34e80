use std::fmt;

use crate::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH};

/// Pixel grid indexed as [y][x]; each cell is 0 (unlit) or 1 (lit)
pub type Pixels = [[u8; DISPLAY_WIDTH]; DISPLAY_HEIGHT];

/// # FrameBuffer
/// The Chip-8 display is composed of 64x32 black/white pixels.
///
/// Sprites are XORed on; any pixel turned off by a draw is a collision.
/// Cheap to copy, so displays receive snapshots rather than borrowing the VM.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pixels: Pixels,
}

impl FrameBuffer {
    pub fn new() -> Self {
        FrameBuffer {
            pixels: [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
        }
    }

    pub fn clear(&mut self) {
        self.pixels = [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
    }

    /// XORs a sprite onto the display and reports whether any pixel was erased
    ///
    /// The origin wraps around the screen; the sprite itself is clipped at the
    /// right and bottom edges.
    ///
    /// # Arguments
    /// * `x` horizontal origin, taken modulo the display width
    /// * `y` vertical origin, taken modulo the display height
    /// * `sprite` one byte per row, most significant bit leftmost
    pub fn draw_sprite(&mut self, x: usize, y: usize, sprite: &[u8]) -> bool {
        let x0 = x % DISPLAY_WIDTH;
        let y0 = y % DISPLAY_HEIGHT;
        let mut collision = false;

        for (row, byte) in sprite.iter().enumerate() {
            let y = y0 + row;
            if y >= DISPLAY_HEIGHT {
                break;
            }
            for bit in 0..8 {
                let x = x0 + bit;
                if x >= DISPLAY_WIDTH {
                    break;
                }
                let pixel = (byte >> (7 - bit)) & 1;
                collision |= (pixel & self.pixels[y][x]) == 1;
                self.pixels[y][x] ^= pixel;
            }
        }
        collision
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.pixels
            .get(y)
            .and_then(|row| row.get(x))
            .map_or(false, |&p| p == 1)
    }

    pub fn rows(&self) -> &Pixels {
        &self.pixels
    }

    pub fn lit_pixels(&self) -> usize {
        self.pixels
            .iter()
            .flat_map(|row| row.iter())
            .filter(|&&p| p == 1)
            .count()
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "FrameBuffer({} lit)", self.lit_pixels())
    }
}

/// Renders the frame as text, `#` for lit pixels, inside a border
impl fmt::Display for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let border = "-".repeat(DISPLAY_WIDTH);
        writeln!(f, "+{}+", border)?;
        for row in self.pixels.iter() {
            let line: String = row
                .iter()
                .map(|&p| if p == 1 { '#' } else { ' ' })
                .collect();
            writeln!(f, "|{}|", line)?;
        }
        write!(f, "+{}+", border)
    }
}
