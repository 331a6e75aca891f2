// Click highlight discs, one per mouse button, and the choice of which one
// is visible for the current button mask.
// Visual: a flat, half-transparent disc behind the cursor while a button is held.

use crate::types::{with_alpha, Bitmap, ButtonMask, Pixel};

/// Alpha shared by all three discs.
pub const HIGHLIGHT_ALPHA: u8 = 0x80;
pub const BUTTON1_COLOR: u32 = 0x80_80_00; // olive
pub const BUTTON2_COLOR: u32 = 0x80_00_80; // purple
pub const BUTTON3_COLOR: u32 = 0x00_80_80; // teal

/// Make a `size`x`size` bitmap with a hard-edged disc of `radius` around the
/// centre pixel. Pixels with `dx² + dy² < radius²` get the colour, the rest
/// stay fully transparent. A radius past the border is simply cut off.
pub fn generate(color: u32, alpha: u8, radius: usize, size: usize) -> Bitmap {
    let mut bmp = Bitmap::square(size);
    if radius == 0 {
        return bmp;
    }

    let fill: Pixel = with_alpha(color, alpha);
    let center = (size / 2) as i64;
    let radius_sq = (radius as i64) * (radius as i64);

    for y in 0..size {
        let dy = y as i64 - center;
        for x in 0..size {
            let dx = x as i64 - center;
            if dx * dx + dy * dy < radius_sq {
                let idx = bmp.index(x, y);
                bmp.pixels[idx] = fill;
            }
        }
    }
    bmp
}

/// The three precomputed discs. Built once at startup, never resized.
pub struct HighlightSet {
    pub radius: usize,
    pub button1: Bitmap,
    pub button2: Bitmap,
    pub button3: Bitmap,
}

impl HighlightSet {
    pub fn new(radius: usize, size: usize) -> Self {
        Self {
            radius,
            button1: generate(BUTTON1_COLOR, HIGHLIGHT_ALPHA, radius, size),
            button2: generate(BUTTON2_COLOR, HIGHLIGHT_ALPHA, radius, size),
            button3: generate(BUTTON3_COLOR, HIGHLIGHT_ALPHA, radius, size),
        }
    }

    /// True when highlights are switched off (radius 0, every disc empty).
    pub fn is_blank(&self) -> bool {
        self.radius == 0
    }
}

/// Pick the disc for the pressed buttons: button 1 wins over 2, 2 over 3.
/// A blank set never participates, so radius 0 composites exactly like
/// "no highlight" even when a button is held.
pub fn active_highlight(mask: ButtonMask, set: &HighlightSet) -> Option<&Bitmap> {
    if set.is_blank() {
        return None;
    }
    if mask.contains(ButtonMask::BUTTON1) {
        Some(&set.button1)
    } else if mask.contains(ButtonMask::BUTTON2) {
        Some(&set.button2)
    } else if mask.contains(ButtonMask::BUTTON3) {
        Some(&set.button3)
    } else {
        None
    }
}
