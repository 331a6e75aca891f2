// Desktop side of the overlay on systems without X11: the window we paint
// into and the global pointer we follow.
// Visual: a small borderless, transparent, always-on-top square whose centre
// pixel sits on the real pointer.
// There is no portable way to read the live cursor bitmap here, so the shape
// comes from the built-in arrow or --cursor, and the pointer is sampled.

use crate::config::OverlayConfig;
use crate::coordinator::{OverlayEvent, Platform};
use crate::cursor_source::CursorSource;
use crate::error::Error;
use crate::types::{Bitmap, ButtonMask, CursorImage, PointerState};
use device_query::{DeviceQuery, DeviceState};
use log::{debug, info};
use minifb::{Window, WindowOptions};
use std::collections::VecDeque;
use std::time::Duration;

pub struct DesktopPlatform {
    window: Window, // the overlay you see
    device: DeviceState,
    cursor: CursorSource,
    max_cursor_size: usize,
    poll_interval: Duration,
    queue: VecDeque<OverlayEvent>,
    /// Previous pointer sample, diffed to synthesize Motion/ButtonChange
    last: PointerState,
    last_active: bool,
}

impl DesktopPlatform {
    /// Create the overlay window sized to the output buffer.
    pub fn new(config: &OverlayConfig) -> Result<Self, Error> {
        let size = config.output_size();
        let opts = WindowOptions {
            borderless: true,
            title: false,
            resize: false,
            topmost: true,
            transparency: true,
            none: true,
            ..WindowOptions::default()
        };
        let mut window = Window::new("SoftwareCursor", size, size, opts)
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        // We pace ourselves with the poll interval.
        window.set_target_fps(0);

        let device = DeviceState::checked_new()
            .ok_or_else(|| Error::WindowInit("could not open the pointer device".into()))?;
        let last = sample(&device);
        info!("overlay window {size}x{size}, polling every {:?}", config.poll_interval);

        let mut queue = VecDeque::new();
        queue.push_back(OverlayEvent::Expose);

        Ok(Self {
            window,
            device,
            cursor: CursorSource::new(config.cursor.clone(), config.hotspot),
            max_cursor_size: config.max_cursor_size,
            poll_interval: config.poll_interval,
            queue,
            last,
            last_active: false,
        })
    }

    /// Sample pointer, focus and cursor file once; queue what changed.
    fn collect(&mut self) {
        let now = sample(&self.device);
        if (now.x, now.y) != (self.last.x, self.last.y) {
            self.queue.push_back(OverlayEvent::Motion);
        }
        if now.mask != self.last.mask {
            self.queue.push_back(OverlayEvent::ButtonChange);
        }
        self.last = now;

        let active = self.window.is_active();
        if active != self.last_active {
            self.queue.push_back(OverlayEvent::Other);
            self.last_active = active;
        }

        if self.cursor.changed() {
            debug!("cursor file changed on disk");
            self.queue.push_back(OverlayEvent::ShapeChange);
        }
    }
}

fn sample(device: &DeviceState) -> PointerState {
    let mouse = device.get_mouse();
    PointerState {
        x: mouse.coords.0,
        y: mouse.coords.1,
        mask: buttons_from_pressed(&mouse.button_pressed),
    }
}

/// `button_pressed[n]` is button `n` (index 0 is unused).
fn buttons_from_pressed(pressed: &[bool]) -> ButtonMask {
    let mut mask = ButtonMask::NONE;
    for (num, button) in [(1, ButtonMask::BUTTON1), (2, ButtonMask::BUTTON2), (3, ButtonMask::BUTTON3)] {
        if pressed.get(num).copied().unwrap_or(false) {
            mask.insert(button);
        }
    }
    mask
}

impl Platform for DesktopPlatform {
    fn wait_event(&mut self) -> Result<Option<OverlayEvent>, Error> {
        loop {
            if let Some(event) = self.queue.pop_front() {
                return Ok(Some(event));
            }
            if !self.window.is_open() {
                return Ok(None);
            }
            std::thread::sleep(self.poll_interval);
            // Keeps the window responsive while nothing is being presented.
            self.window.update();
            self.collect();
        }
    }

    fn poll_event(&mut self) -> Result<Option<OverlayEvent>, Error> {
        Ok(self.queue.pop_front())
    }

    fn cursor_image(&mut self) -> Result<CursorImage, Error> {
        self.cursor.load(self.max_cursor_size)
    }

    fn query_pointer(&mut self) -> Result<PointerState, Error> {
        Ok(sample(&self.device))
    }

    fn move_window(&mut self, x: i32, y: i32) -> Result<(), Error> {
        self.window.set_position(x as isize, y as isize);
        Ok(())
    }

    fn present(&mut self, buffer: &Bitmap) -> Result<(), Error> {
        self.window
            .update_with_buffer(&buffer.pixels, buffer.width, buffer.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))
    }

    fn raise_window(&mut self) -> Result<(), Error> {
        self.window.topmost(true);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.window.is_open()
    }
}
