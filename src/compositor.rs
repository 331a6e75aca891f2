// Builds the overlay image: optional highlight disc first, cursor bitmap on top.
// Visual: the cursor's hotspot always lands on the centre pixel of the output,
// which the coordinator keeps glued to the real pointer.

use crate::types::{alpha, channel, pack_argb, Bitmap, CursorImage, Pixel, BLUE_SHIFT, GREEN_SHIFT, RED_SHIFT};
use log::warn;

/// Part of the cursor bitmap that lands inside the output buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Overlap {
    /// First visible column/row inside the cursor bitmap
    src_x: usize,
    src_y: usize,
    /// Where that pixel goes in the output
    dst_x: usize,
    dst_y: usize,
    /// Size of the visible region
    width: usize,
    height: usize,
}

/// Intersect a `src_w`x`src_h` bitmap placed at (`x`,`y`) with
/// `[0, out_w) x [0, out_h)`. None when nothing is visible.
fn clip_overlap(x: i64, y: i64, src_w: usize, src_h: usize, out_w: usize, out_h: usize) -> Option<Overlap> {
    let src_x = if x < 0 { x.unsigned_abs() as usize } else { 0 };
    let src_y = if y < 0 { y.unsigned_abs() as usize } else { 0 };
    let dst_x = x.max(0) as usize;
    let dst_y = y.max(0) as usize;

    let width = src_w.saturating_sub(src_x).min(out_w.saturating_sub(dst_x));
    let height = src_h.saturating_sub(src_y).min(out_h.saturating_sub(dst_y));
    if width == 0 || height == 0 {
        return None;
    }

    Some(Overlap { src_x, src_y, dst_x, dst_y, width, height })
}

/// Porter-Duff "over" on straight (non-premultiplied) 0xAARRGGBB pixels.
/// Integer math, truncating at every division.
#[inline]
pub fn blend_over(src: Pixel, dst: Pixel) -> Pixel {
    let a_src = alpha(src);
    let a_dst = alpha(dst) * (255 - a_src) / 255;
    let a_out = a_src + a_dst;
    if a_out == 0 {
        return 0;
    }

    let mix = |shift: u32| (a_src * channel(src, shift) + a_dst * channel(dst, shift)) / a_out;
    pack_argb(a_out, mix(RED_SHIFT), mix(GREEN_SHIFT), mix(BLUE_SHIFT))
}

/// Repaint `output` for the given cursor shape.
///
/// 1. Background: copy of `highlight`, or fully transparent without one.
/// 2. Place the cursor so its hotspot sits on the output centre.
/// 3. Clip to the output bounds and copy (no highlight) or blend "over"
///    (highlight) every visible cursor pixel.
pub fn composite(output: &mut Bitmap, highlight: Option<&Bitmap>, cursor: &CursorImage) {
    let highlight = highlight.filter(|bg| {
        let fits = bg.width == output.width && bg.height == output.height;
        if !fits {
            warn!(
                "highlight is {}x{} but output is {}x{}, drawing without it",
                bg.width, bg.height, output.width, output.height
            );
        }
        fits
    });

    match highlight {
        Some(bg) => output.pixels.copy_from_slice(&bg.pixels),
        None => output.clear(),
    }

    let src = &cursor.bitmap;
    let x = (output.width / 2) as i64 - cursor.hotspot_x as i64;
    let y = (output.height / 2) as i64 - cursor.hotspot_y as i64;
    let Some(clip) = clip_overlap(x, y, src.width, src.height, output.width, output.height) else {
        return;
    };

    let blend = highlight.is_some();
    for row in 0..clip.height {
        let src_start = src.index(clip.src_x, clip.src_y + row);
        let dst_start = output.index(clip.dst_x, clip.dst_y + row);
        let src_row = &src.pixels[src_start..src_start + clip.width];
        let dst_row = &mut output.pixels[dst_start..dst_start + clip.width];

        if blend {
            for (d, &s) in dst_row.iter_mut().zip(src_row) {
                *d = blend_over(s, *d);
            }
        } else {
            dst_row.copy_from_slice(src_row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::{active_highlight, HighlightSet};
    use crate::types::ButtonMask;

    fn cursor(width: usize, height: usize, hotspot_x: i32, hotspot_y: i32) -> CursorImage {
        // Distinct, partially transparent pixels so copies are traceable.
        let pixels = (0..width * height)
            .map(|i| pack_argb((i % 256) as u32, (i * 7 % 256) as u32, (i * 13 % 256) as u32, (i * 31 % 256) as u32))
            .collect();
        CursorImage { bitmap: Bitmap::from_pixels(width, height, pixels).unwrap(), hotspot_x, hotspot_y }
    }

    fn solid(size: usize, px: Pixel) -> Bitmap {
        Bitmap { width: size, height: size, pixels: vec![px; size * size] }
    }

    #[test]
    fn test_clip_overlap_inside() {
        let c = clip_overlap(10, 20, 5, 5, 65, 65).unwrap();
        assert_eq!(c, Overlap { src_x: 0, src_y: 0, dst_x: 10, dst_y: 20, width: 5, height: 5 });
    }

    #[test]
    fn test_clip_overlap_partial_and_outside() {
        let c = clip_overlap(-3, 60, 10, 10, 65, 65).unwrap();
        assert_eq!(c, Overlap { src_x: 3, src_y: 0, dst_x: 0, dst_y: 60, width: 7, height: 5 });

        assert!(clip_overlap(-10, 0, 10, 10, 65, 65).is_none());
        assert!(clip_overlap(65, 0, 10, 10, 65, 65).is_none());
        assert!(clip_overlap(0, 0, 0, 10, 65, 65).is_none());
    }

    #[test]
    fn test_plain_copy_without_highlight() {
        let mut out = solid(65, 0xDEAD_BEEF);
        let cur = cursor(16, 24, 3, 5);
        composite(&mut out, None, &cur);

        let (x, y) = (32 - 3, 32 - 5);
        for yy in 0..65 {
            for xx in 0..65 {
                let in_cursor = (x..x + 16).contains(&xx) && (y..y + 24).contains(&yy);
                let expected = if in_cursor { cur.bitmap.get(xx - x, yy - y) } else { 0 };
                assert_eq!(out.get(xx, yy), expected, "({xx},{yy})");
            }
        }
    }

    #[test]
    fn test_opaque_source_occludes() {
        for dst in [0u32, 0x8080_8000, 0xFF12_3456, 0x01FF_FFFF] {
            for src in [0xFF00_0000u32, 0xFFAB_CDEF, 0xFFFF_FFFF] {
                assert_eq!(blend_over(src, dst), src, "src={src:08x} dst={dst:08x}");
            }
        }
    }

    #[test]
    fn test_transparent_source_keeps_destination() {
        for dst in [0x8080_8000u32, 0xFF12_3456, 0x0180_4020, 0x4000_00FF] {
            assert_eq!(blend_over(0x00FF_FFFF, dst), dst, "dst={dst:08x}");
        }
        assert_eq!(blend_over(0, 0), 0);
    }

    #[test]
    fn test_blend_truncates() {
        // src a=0x80 white over highlight a=0x80 olive.
        // a_dst' = 128*127/255 = 63, a_out = 191
        // r = (128*255 + 63*128)/191 = 213, g = 213, b = (128*255 + 0)/191 = 170
        assert_eq!(blend_over(0x80FF_FFFF, 0x8080_8000), pack_argb(191, 213, 213, 170));
    }

    #[test]
    fn test_blend_over_highlight() {
        let mut out = Bitmap::square(65);
        let bg = solid(65, 0x8080_8000);
        let mut cur = cursor(2, 1, 0, 0);
        cur.bitmap.pixels = vec![0xFF11_2233, 0x0000_0000];
        composite(&mut out, Some(&bg), &cur);

        assert_eq!(out.get(32, 32), 0xFF11_2233);
        assert_eq!(out.get(33, 32), 0x8080_8000);
        assert_eq!(out.get(0, 0), 0x8080_8000);
    }

    #[test]
    fn test_clipping_near_origin_hotspot() {
        // 64x64 cursor with hotspot (0,0) in a 65x65 output: only the
        // top-left 33x33 of the cursor is visible, in the bottom-right quadrant.
        let mut out = Bitmap::square(65);
        let cur = cursor(64, 64, 0, 0);
        composite(&mut out, None, &cur);

        for yy in 0..65 {
            for xx in 0..65 {
                let expected = if xx >= 32 && yy >= 32 { cur.bitmap.get(xx - 32, yy - 32) } else { 0 };
                assert_eq!(out.get(xx, yy), expected, "({xx},{yy})");
            }
        }
    }

    #[test]
    fn test_clipping_far_hotspot() {
        // Hotspot at the far corner pushes the cursor up and left.
        let mut out = Bitmap::square(65);
        let cur = cursor(64, 64, 63, 63);
        composite(&mut out, None, &cur);

        for yy in 0..65 {
            for xx in 0..65 {
                let expected = if xx <= 32 && yy <= 32 { cur.bitmap.get(xx + 31, yy + 31) } else { 0 };
                assert_eq!(out.get(xx, yy), expected, "({xx},{yy})");
            }
        }
    }

    #[test]
    fn test_empty_cursor_is_noop() {
        let mut out = solid(9, 0x1234_5678);
        let cur = CursorImage { bitmap: Bitmap::new(0, 0), hotspot_x: 0, hotspot_y: 0 };
        composite(&mut out, None, &cur);
        assert!(out.pixels.iter().all(|&p| p == 0));

        let bg = solid(9, 0x8000_8080);
        composite(&mut out, Some(&bg), &cur);
        assert_eq!(out, bg);
    }

    #[test]
    fn test_mismatched_highlight_is_ignored() {
        let mut out = Bitmap::square(9);
        let bg = solid(5, 0x8000_8080);
        let cur = cursor(1, 1, 0, 0);
        composite(&mut out, Some(&bg), &cur);
        assert_eq!(out.get(4, 4), cur.bitmap.get(0, 0));
        assert_eq!(out.get(0, 0), 0);
    }

    #[test]
    fn test_zero_radius_matches_no_highlight() {
        let set = HighlightSet::new(0, 65);
        let cur = cursor(32, 32, 4, 4);

        let mut with_zero = Bitmap::square(65);
        let all = ButtonMask::BUTTON1 | ButtonMask::BUTTON2 | ButtonMask::BUTTON3;
        composite(&mut with_zero, active_highlight(all, &set), &cur);

        let mut without = Bitmap::square(65);
        composite(&mut without, None, &cur);

        assert_eq!(with_zero, without);
    }
}
