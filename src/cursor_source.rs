// Where the overlay gets its cursor shape from.
// Visual: either the built-in arrow or the image file given on the command
// line, drawn with its hotspot exactly under the pointer.

use crate::error::Error;
use crate::types::{pack_argb, Bitmap, CursorImage};
use image::RgbaImage;
use log::{info, warn};
use std::path::PathBuf;
use std::time::SystemTime;

const OUTLINE: u32 = 0xFF00_0000;
const FILL: u32 = 0xFFFF_FFFF;

/// Classic arrow, hotspot on the tip (0,0).
/// 'X' = black outline, '.' = white fill, ' ' = transparent.
const ARROW: [&str; 19] = [
    "X           ",
    "XX          ",
    "X.X         ",
    "X..X        ",
    "X...X       ",
    "X....X      ",
    "X.....X     ",
    "X......X    ",
    "X.......X   ",
    "X........X  ",
    "X.........X ",
    "X..........X",
    "X......XXXXX",
    "X...X..X    ",
    "X..XX..X    ",
    "X.X  X..X   ",
    "XX   X..X   ",
    "X     X..X  ",
    "      XXX   ",
];

/// Rasterise the built-in arrow.
pub fn builtin_arrow() -> CursorImage {
    let width = ARROW[0].len();
    let height = ARROW.len();
    let mut bitmap = Bitmap::new(width, height);
    for (y, row) in ARROW.iter().enumerate() {
        for (x, cell) in row.bytes().enumerate() {
            let idx = bitmap.index(x, y);
            bitmap.pixels[idx] = match cell {
                b'X' => OUTLINE,
                b'.' => FILL,
                _ => 0,
            };
        }
    }
    CursorImage { bitmap, hotspot_x: 0, hotspot_y: 0 }
}

/// Convert decoded RGBA into straight-alpha 0xAARRGGBB pixels.
pub fn rgba_to_cursor(img: &RgbaImage, hotspot_x: i32, hotspot_y: i32) -> Result<CursorImage, Error> {
    let (w, h) = img.dimensions();
    let pixels = img
        .pixels()
        .map(|p| pack_argb(p[3] as u32, p[0] as u32, p[1] as u32, p[2] as u32))
        .collect();
    let bitmap = Bitmap::from_pixels(w as usize, h as usize, pixels)?;
    Ok(CursorImage { bitmap, hotspot_x, hotspot_y })
}

pub enum CursorSource {
    Builtin,
    File {
        path: PathBuf,
        hotspot: (i32, i32),
        /// Modification time seen at the last load attempt
        loaded_at: Option<SystemTime>,
        /// Shape from the last successful decode
        last_good: Option<CursorImage>,
    },
}

impl CursorSource {
    pub fn new(path: Option<PathBuf>, hotspot: (i32, i32)) -> Self {
        match path {
            Some(path) => CursorSource::File { path, hotspot, loaded_at: None, last_good: None },
            None => CursorSource::Builtin,
        }
    }

    /// Load the current shape. Files are decoded fresh every time; if a
    /// reload fails (file caught mid-write) the previous shape is kept.
    pub fn load(&mut self, max_cursor_size: usize) -> Result<CursorImage, Error> {
        match self {
            CursorSource::Builtin => Ok(builtin_arrow()),
            CursorSource::File { path, hotspot, loaded_at, last_good } => {
                *loaded_at = std::fs::metadata(&*path).and_then(|m| m.modified()).ok();
                let decoded = image::open(&*path)
                    .map_err(Error::from)
                    .and_then(|img| rgba_to_cursor(&img.to_rgba8(), hotspot.0, hotspot.1));

                let cursor = match (decoded, last_good.as_ref()) {
                    (Ok(cursor), _) => cursor,
                    (Err(e), Some(previous)) => {
                        warn!("reloading cursor {} failed, keeping previous shape: {e}", path.display());
                        return Ok(previous.clone());
                    }
                    (Err(e), None) => return Err(e),
                };

                let (w, h) = (cursor.bitmap.width, cursor.bitmap.height);
                if w > max_cursor_size || h > max_cursor_size {
                    warn!("cursor {} is {w}x{h}, larger than --size {max_cursor_size}; it will be clipped", path.display());
                }
                info!("loaded cursor {} ({w}x{h}, hotspot {},{})", path.display(), hotspot.0, hotspot.1);
                *last_good = Some(cursor.clone());
                Ok(cursor)
            }
        }
    }

    /// Whether the shape on disk moved on since the last load.
    pub fn changed(&self) -> bool {
        match self {
            CursorSource::Builtin => false,
            CursorSource::File { path, loaded_at, .. } => {
                let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok();
                modified.is_some() && modified != *loaded_at
            }
        }
    }
}
