// Core types shared by the generator, the compositor and the coordinator.

use crate::error::Error;

/// One pixel, packed as 0xAARRGGBB. Colour channels are *not* premultiplied.
/// This is also what the overlay window consumes, so buffers go out as-is.
pub type Pixel = u32;

pub const ALPHA_SHIFT: u32 = 24;
pub const RED_SHIFT: u32 = 16;
pub const GREEN_SHIFT: u32 = 8;
pub const BLUE_SHIFT: u32 = 0;

#[inline]
pub fn alpha(p: Pixel) -> u32 {
    p >> ALPHA_SHIFT
}

/// Extract the 8-bit channel sitting at `shift`.
#[inline]
pub fn channel(p: Pixel, shift: u32) -> u32 {
    (p >> shift) & 0xFF
}

#[inline]
pub fn pack_argb(a: u32, r: u32, g: u32, b: u32) -> Pixel {
    (a << ALPHA_SHIFT) | (r << RED_SHIFT) | (g << GREEN_SHIFT) | (b << BLUE_SHIFT)
}

/// Combine a 0x00RRGGBB colour with an alpha byte.
#[inline]
pub fn with_alpha(rgb: u32, a: u8) -> Pixel {
    (rgb & 0x00FF_FFFF) | ((a as u32) << ALPHA_SHIFT)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    pub width: usize,     // pixels per row
    pub height: usize,    // number of rows
    pub pixels: Vec<u32>, // row-major, length = width * height
}

impl Bitmap {
    /// Fully transparent bitmap.
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, pixels: vec![0; width * height] }
    }

    pub fn square(size: usize) -> Self {
        Self::new(size, size)
    }

    pub fn from_pixels(width: usize, height: usize, pixels: Vec<u32>) -> Result<Self, Error> {
        if pixels.len() != width * height {
            return Err(Error::CursorImage(format!(
                "{width}x{height} bitmap needs {} pixels, got {}",
                width * height,
                pixels.len()
            )));
        }
        Ok(Self { width, height, pixels })
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[cfg(test)]
    pub fn get(&self, x: usize, y: usize) -> Pixel {
        self.pixels[self.index(x, y)]
    }
}

/// A cursor shape as delivered by the platform: bitmap plus hotspot.
/// The hotspot is the offset from the top-left pixel to the pointer position.
#[derive(Clone, Debug)]
pub struct CursorImage {
    pub bitmap: Bitmap,
    pub hotspot_x: i32,
    pub hotspot_y: i32,
}

/// Pressed mouse buttons, X11 numbering (1 = left, 2 = middle, 3 = right).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ButtonMask(u8);

impl ButtonMask {
    pub const NONE: ButtonMask = ButtonMask(0);
    pub const BUTTON1: ButtonMask = ButtonMask(1 << 0);
    pub const BUTTON2: ButtonMask = ButtonMask(1 << 1);
    pub const BUTTON3: ButtonMask = ButtonMask(1 << 2);

    pub fn contains(self, other: ButtonMask) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn insert(&mut self, other: ButtonMask) {
        self.0 |= other.0;
    }
}

impl std::ops::BitOr for ButtonMask {
    type Output = ButtonMask;

    fn bitor(self, rhs: ButtonMask) -> ButtonMask {
        ButtonMask(self.0 | rhs.0)
    }
}

/// Result of one pointer query: root-window coordinates plus buttons.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PointerState {
    pub x: i32,
    pub y: i32,
    pub mask: ButtonMask,
}
