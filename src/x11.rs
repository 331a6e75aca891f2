// X11 side of the overlay.
// Visual: a 32-bit ARGB override-redirect square that shows the *live* cursor
// shape, follows the pointer and lets every click fall through to the window
// underneath.
//
// Shape changes come from XFixes CursorNotify, motion and buttons from
// XInput2 raw events on the root window; the loop blocks on the X connection.

use crate::config::OverlayConfig;
use crate::coordinator::{OverlayEvent, Platform};
use crate::cursor_source::CursorSource;
use crate::error::Error;
use crate::types::{Bitmap, ButtonMask, CursorImage, PointerState};
use log::{debug, info, warn};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::shape;
use x11rb::protocol::xfixes::{self, ConnectionExt as _};
use x11rb::protocol::xinput::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{self, ConnectionExt as _};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

/// Fixed part of a PutImage request, in bytes.
const PUT_IMAGE_HEADER: usize = 24;

pub struct X11Platform {
    conn: RustConnection,
    root: xproto::Window,
    window: xproto::Window,
    gc: xproto::Gcontext,
    /// Server wants image words most-significant byte first
    msb_first: bool,
    /// `--cursor` replaces the live shape when given
    cursor_override: Option<CursorSource>,
    max_cursor_size: usize,
    /// Reused wire buffer for PutImage
    scratch: Vec<u8>,
    /// Event held back while a ShapeChange for the override file goes first
    deferred: Option<OverlayEvent>,
    open: bool,
}

impl X11Platform {
    /// Connect to `$DISPLAY` and create the overlay window.
    pub fn new(config: &OverlayConfig) -> Result<Self, Error> {
        Self::connect(None, config)
    }

    pub fn connect(display: Option<&str>, config: &OverlayConfig) -> Result<Self, Error> {
        let (conn, screen_num) = x11rb::connect(display)?;

        require_extension(&conn, xfixes::X11_EXTENSION_NAME)?;
        require_extension(&conn, xinput::X11_EXTENSION_NAME)?;
        // Both extensions refuse requests until the version is negotiated.
        conn.xfixes_query_version(5, 0)?.reply()?;
        conn.xinput_xi_query_version(2, 2)?.reply()?;

        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;
        let (depth, visual) = argb_visual(screen)
            .ok_or_else(|| Error::WindowInit("no 32-bit TrueColor visual".into()))?;
        let msb_first = conn.setup().image_byte_order == xproto::ImageOrder::MSB_FIRST;

        let size = config.output_size() as u16;
        let colormap = conn.generate_id()?;
        conn.create_colormap(xproto::ColormapAlloc::NONE, colormap, root, visual)?;

        let window = conn.generate_id()?;
        conn.create_window(
            depth,
            window,
            root,
            0,
            0,
            size,
            size,
            0,
            xproto::WindowClass::INPUT_OUTPUT,
            visual,
            &overlay_window_aux(colormap),
        )?;
        conn.change_property8(
            xproto::PropMode::REPLACE,
            window,
            xproto::AtomEnum::WM_CLASS,
            xproto::AtomEnum::STRING,
            b"SoftwareCursor\0softwarecursor\0",
        )?;

        // Clicks pass through: empty input region, default bounding shape.
        let empty = conn.generate_id()?;
        conn.xfixes_create_region(empty, &[])?;
        for req in passthrough_shape(window, empty) {
            conn.xfixes_set_window_shape_region(req.dest, req.dest_kind, req.x_offset, req.y_offset, req.region)?;
        }
        conn.xfixes_destroy_region(empty)?;

        // What we listen to on the root window.
        conn.xfixes_select_cursor_input(root, xfixes::CursorNotifyMask::DISPLAY_CURSOR)?;
        conn.xinput_xi_select_events(
            root,
            &[xinput::EventMask {
                deviceid: xinput::Device::ALL.into(),
                mask: vec![raw_pointer_mask().into()],
            }],
        )?;
        conn.change_window_attributes(
            root,
            &xproto::ChangeWindowAttributesAux::new()
                .event_mask(xproto::EventMask::PROPERTY_CHANGE | xproto::EventMask::FOCUS_CHANGE),
        )?;

        let gc = conn.generate_id()?;
        conn.create_gc(gc, window, &xproto::CreateGCAux::new())?;
        conn.map_window(window)?;
        conn.flush()?;
        info!("overlay window 0x{window:x} ({size}x{size}, depth {depth}) on screen {screen_num}");

        Ok(Self {
            conn,
            root,
            window,
            gc,
            msb_first,
            cursor_override: config.cursor.clone().map(|path| CursorSource::new(Some(path), config.hotspot)),
            max_cursor_size: config.max_cursor_size,
            scratch: Vec::new(),
            deferred: None,
            open: true,
        })
    }

    /// Map one X event onto what the coordinator cares about.
    fn classify(&mut self, event: Event) -> Option<OverlayEvent> {
        match event {
            Event::XfixesCursorNotify(_) => Some(OverlayEvent::ShapeChange),
            Event::XinputRawMotion(_) => Some(OverlayEvent::Motion),
            Event::XinputRawButtonPress(_) | Event::XinputRawButtonRelease(_) => Some(OverlayEvent::ButtonChange),
            Event::Expose(e) if e.window == self.window => Some(OverlayEvent::Expose),
            Event::VisibilityNotify(_) | Event::PropertyNotify(_) | Event::FocusIn(_) | Event::FocusOut(_) => {
                Some(OverlayEvent::Other)
            }
            Event::DestroyNotify(e) if e.window == self.window => {
                self.open = false;
                None
            }
            Event::Error(e) => {
                warn!("X error: {e:?}");
                None
            }
            _ => None,
        }
    }

    /// The override file has no X notification; check it on pointer motion.
    fn with_override_check(&mut self, event: OverlayEvent) -> OverlayEvent {
        let changed = event == OverlayEvent::Motion
            && self.cursor_override.as_ref().is_some_and(CursorSource::changed);
        if changed {
            debug!("cursor file changed on disk");
            self.deferred = Some(event);
            OverlayEvent::ShapeChange
        } else {
            event
        }
    }
}

fn require_extension(conn: &RustConnection, name: &'static str) -> Result<(), Error> {
    conn.extension_information(name)?
        .ok_or(Error::MissingExtension(name))?;
    Ok(())
}

/// First 32-bit TrueColor visual of the screen, if any.
fn argb_visual(screen: &xproto::Screen) -> Option<(u8, xproto::Visualid)> {
    screen
        .allowed_depths
        .iter()
        .filter(|d| d.depth == 32)
        .flat_map(|d| d.visuals.iter().map(move |v| (d.depth, v)))
        .find(|(_, v)| v.class == xproto::VisualClass::TRUE_COLOR)
        .map(|(depth, v)| (depth, v.visual_id))
}

/// Attributes of the overlay window: transparent, unmanaged, told about
/// exposure and visibility only.
fn overlay_window_aux(colormap: xproto::Colormap) -> xproto::CreateWindowAux {
    xproto::CreateWindowAux::new()
        .background_pixel(0)
        .border_pixel(0)
        .override_redirect(1)
        .colormap(colormap)
        .event_mask(
            xproto::EventMask::EXPOSURE | xproto::EventMask::STRUCTURE_NOTIFY | xproto::EventMask::VISIBILITY_CHANGE,
        )
}

/// Shape requests that make the window invisible to input: the bounding
/// shape is reset to the full window, the input shape to `empty_region`.
fn passthrough_shape(window: xproto::Window, empty_region: xfixes::Region) -> [xfixes::SetWindowShapeRegionRequest; 2] {
    [
        xfixes::SetWindowShapeRegionRequest {
            dest: window,
            dest_kind: shape::SK::BOUNDING,
            x_offset: 0,
            y_offset: 0,
            region: x11rb::NONE,
        },
        xfixes::SetWindowShapeRegionRequest {
            dest: window,
            dest_kind: shape::SK::INPUT,
            x_offset: 0,
            y_offset: 0,
            region: empty_region,
        },
    ]
}

fn raw_pointer_mask() -> xinput::XIEventMask {
    xinput::XIEventMask::RAW_MOTION | xinput::XIEventMask::RAW_BUTTON_PRESS | xinput::XIEventMask::RAW_BUTTON_RELEASE
}

/// Buttons 1-3 out of the core pointer mask.
fn button_mask(mask: xproto::KeyButMask) -> ButtonMask {
    let bits = u16::from(mask);
    let mut out = ButtonMask::NONE;
    for (x_bit, button) in [
        (xproto::KeyButMask::BUTTON1, ButtonMask::BUTTON1),
        (xproto::KeyButMask::BUTTON2, ButtonMask::BUTTON2),
        (xproto::KeyButMask::BUTTON3, ButtonMask::BUTTON3),
    ] {
        if bits & u16::from(x_bit) != 0 {
            out.insert(button);
        }
    }
    out
}

/// XFixes hands out ARGB words already in our pixel layout.
fn cursor_from_argb(width: u16, height: u16, xhot: u16, yhot: u16, pixels: Vec<u32>) -> Result<CursorImage, Error> {
    let bitmap = Bitmap::from_pixels(width as usize, height as usize, pixels)?;
    Ok(CursorImage { bitmap, hotspot_x: xhot as i32, hotspot_y: yhot as i32 })
}

/// How many rows of `row_bytes` fit in one PutImage request (at least one).
fn rows_per_request(row_bytes: usize, max_request_bytes: usize) -> usize {
    if row_bytes == 0 {
        return 1;
    }
    (max_request_bytes.saturating_sub(PUT_IMAGE_HEADER) / row_bytes).max(1)
}

/// Serialize pixels in the server's image byte order.
fn encode_pixels(pixels: &[u32], msb_first: bool, out: &mut Vec<u8>) {
    out.clear();
    out.reserve(pixels.len() * 4);
    for &p in pixels {
        let bytes = if msb_first { p.to_be_bytes() } else { p.to_le_bytes() };
        out.extend_from_slice(&bytes);
    }
}

impl Platform for X11Platform {
    fn wait_event(&mut self) -> Result<Option<OverlayEvent>, Error> {
        if let Some(ev) = self.deferred.take() {
            return Ok(Some(ev));
        }
        while self.open {
            let event = self.conn.wait_for_event()?;
            if let Some(ev) = self.classify(event) {
                return Ok(Some(self.with_override_check(ev)));
            }
        }
        Ok(None)
    }

    fn poll_event(&mut self) -> Result<Option<OverlayEvent>, Error> {
        if let Some(ev) = self.deferred.take() {
            return Ok(Some(ev));
        }
        while let Some(event) = self.conn.poll_for_event()? {
            if let Some(ev) = self.classify(event) {
                return Ok(Some(self.with_override_check(ev)));
            }
        }
        Ok(None)
    }

    fn cursor_image(&mut self) -> Result<CursorImage, Error> {
        if let Some(source) = self.cursor_override.as_mut() {
            return source.load(self.max_cursor_size);
        }
        let reply = self.conn.xfixes_get_cursor_image()?.reply()?;
        debug!(
            "cursor {}x{} hotspot {},{} serial {}",
            reply.width, reply.height, reply.xhot, reply.yhot, reply.cursor_serial
        );
        cursor_from_argb(reply.width, reply.height, reply.xhot, reply.yhot, reply.cursor_image)
    }

    fn query_pointer(&mut self) -> Result<PointerState, Error> {
        let reply = self.conn.query_pointer(self.root)?.reply()?;
        Ok(PointerState {
            x: reply.root_x.into(),
            y: reply.root_y.into(),
            mask: button_mask(reply.mask),
        })
    }

    fn move_window(&mut self, x: i32, y: i32) -> Result<(), Error> {
        self.conn
            .configure_window(self.window, &xproto::ConfigureWindowAux::new().x(x).y(y))?;
        self.conn.flush()?;
        Ok(())
    }

    fn present(&mut self, buffer: &Bitmap) -> Result<(), Error> {
        if buffer.width == 0 || buffer.height == 0 {
            return Ok(());
        }
        let rows = rows_per_request(buffer.width * 4, self.conn.maximum_request_bytes());
        for (band, chunk) in buffer.pixels.chunks(rows * buffer.width).enumerate() {
            encode_pixels(chunk, self.msb_first, &mut self.scratch);
            self.conn.put_image(
                xproto::ImageFormat::Z_PIXMAP,
                self.window,
                self.gc,
                buffer.width as u16,
                (chunk.len() / buffer.width) as u16,
                0,
                (band * rows) as i16,
                0,
                32,
                &self.scratch,
            )?;
        }
        self.conn.flush()?;
        Ok(())
    }

    fn raise_window(&mut self) -> Result<(), Error> {
        self.conn.configure_window(
            self.window,
            &xproto::ConfigureWindowAux::new().stack_mode(xproto::StackMode::ABOVE),
        )?;
        self.conn.flush()?;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_display_is_an_error() {
        let result = X11Platform::connect(Some("not a display name"), &OverlayConfig::default());
        assert!(matches!(result, Err(Error::Connect(_))));
    }

    #[test]
    fn test_input_shape_is_empty_region() {
        let [bounding, input] = passthrough_shape(0x40_0001, 0x40_0002);

        assert_eq!(input.dest, 0x40_0001);
        assert_eq!(input.dest_kind, shape::SK::INPUT);
        assert_eq!(input.region, 0x40_0002);
        assert_eq!((input.x_offset, input.y_offset), (0, 0));

        assert_eq!(bounding.dest, 0x40_0001);
        assert_eq!(bounding.dest_kind, shape::SK::BOUNDING);
        assert_eq!(bounding.region, x11rb::NONE);
    }

    #[test]
    fn test_window_is_unmanaged_and_transparent() {
        let aux = overlay_window_aux(7);
        assert_eq!(aux.override_redirect, Some(1));
        assert_eq!(aux.background_pixel, Some(0));
        assert_eq!(aux.colormap, Some(7));
        let mask = u32::from(aux.event_mask.unwrap());
        assert_ne!(mask & u32::from(xproto::EventMask::EXPOSURE), 0);
        // Input never reaches the overlay itself.
        assert_eq!(mask & u32::from(xproto::EventMask::BUTTON_PRESS), 0);
    }

    #[test]
    fn test_raw_pointer_mask() {
        let mask = u32::from(raw_pointer_mask());
        for bit in [
            xinput::XIEventMask::RAW_MOTION,
            xinput::XIEventMask::RAW_BUTTON_PRESS,
            xinput::XIEventMask::RAW_BUTTON_RELEASE,
        ] {
            assert_ne!(mask & u32::from(bit), 0);
        }
    }

    #[test]
    fn test_button_mask_from_core_mask() {
        let mask = button_mask(xproto::KeyButMask::BUTTON1 | xproto::KeyButMask::BUTTON3 | xproto::KeyButMask::SHIFT);
        assert_eq!(mask, ButtonMask::BUTTON1 | ButtonMask::BUTTON3);
        assert_eq!(button_mask(xproto::KeyButMask::BUTTON4), ButtonMask::NONE);
    }

    #[test]
    fn test_cursor_from_argb() {
        let cur = cursor_from_argb(2, 1, 1, 0, vec![0x8011_2233, 0xFF00_0000]).unwrap();
        assert_eq!((cur.bitmap.width, cur.bitmap.height), (2, 1));
        assert_eq!((cur.hotspot_x, cur.hotspot_y), (1, 0));
        assert_eq!(cur.bitmap.pixels, vec![0x8011_2233, 0xFF00_0000]);

        assert!(cursor_from_argb(2, 2, 0, 0, vec![0; 3]).is_err());
    }

    #[test]
    fn test_rows_per_request() {
        assert_eq!(rows_per_request(65 * 4, 262_140), (262_140 - 24) / 260);
        // A single row always goes out, even when oversized.
        assert_eq!(rows_per_request(4097 * 4, 1000), 1);
        assert_eq!(rows_per_request(0, 1000), 1);
    }

    #[test]
    fn test_encode_pixels_byte_order() {
        let mut out = Vec::new();
        encode_pixels(&[0xAABB_CCDD], false, &mut out);
        assert_eq!(out, vec![0xDD, 0xCC, 0xBB, 0xAA]);
        encode_pixels(&[0xAABB_CCDD, 0x0102_0304], true, &mut out);
        assert_eq!(out, vec![0xAA, 0xBB, 0xCC, 0xDD, 1, 2, 3, 4]);
    }
}
