// Decides *when* to recomposite and when to merely move the overlay.
// Events are drained in bursts; each burst ends in at most one composite,
// one present and one move, however many notifications arrived.

use crate::compositor::composite;
use crate::config::OverlayConfig;
use crate::error::Error;
use crate::highlight::{active_highlight, HighlightSet};
use crate::types::{Bitmap, ButtonMask, CursorImage, PointerState};
use log::{debug, info, trace};

/// Notifications coming from the windowing side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayEvent {
    /// Pointer moved
    Motion,
    /// A mouse button went down or up
    ButtonChange,
    /// The cursor shape changed
    ShapeChange,
    /// Window contents were lost and need repainting as they are
    Expose,
    /// Anything else (visibility, focus, ...); only keeps us on top
    Other,
}

/// Everything the overlay needs from the display system.
pub trait Platform {
    /// Block until the next event. None once the platform shut down.
    fn wait_event(&mut self) -> Result<Option<OverlayEvent>, Error>;

    /// Next already-queued event, never blocks.
    fn poll_event(&mut self) -> Result<Option<OverlayEvent>, Error>;

    fn cursor_image(&mut self) -> Result<CursorImage, Error>;

    fn query_pointer(&mut self) -> Result<PointerState, Error>;

    fn move_window(&mut self, x: i32, y: i32) -> Result<(), Error>;

    fn present(&mut self, buffer: &Bitmap) -> Result<(), Error>;

    fn raise_window(&mut self) -> Result<(), Error>;

    fn is_open(&self) -> bool;
}

/// Pending work accumulated while draining a burst.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Changes {
    pub position: bool,
    pub shape: bool,
    pub repaint: bool,
    pub raise: bool,
}

impl Changes {
    pub fn is_empty(&self) -> bool {
        *self == Changes::default()
    }
}

impl std::ops::BitOrAssign for Changes {
    fn bitor_assign(&mut self, rhs: Changes) {
        self.position |= rhs.position;
        self.shape |= rhs.shape;
        self.repaint |= rhs.repaint;
        self.raise |= rhs.raise;
    }
}

/// What a single event asks for.
pub fn changes_for(event: OverlayEvent) -> Changes {
    match event {
        OverlayEvent::Motion => Changes { position: true, ..Changes::default() },
        OverlayEvent::ShapeChange => Changes { shape: true, ..Changes::default() },
        // The highlight may appear or vanish, and we want to stay on top.
        OverlayEvent::ButtonChange => Changes { position: true, shape: true, raise: true, ..Changes::default() },
        OverlayEvent::Expose => Changes { repaint: true, ..Changes::default() },
        OverlayEvent::Other => Changes { raise: true, ..Changes::default() },
    }
}

/// The whole overlay state. Owned by the one thread running the loop.
pub struct Overlay {
    output: Bitmap,
    highlights: HighlightSet,
    mask: ButtonMask,
    pending: Changes,
    /// Buttons already re-queried during the current burst
    buttons_fresh: bool,
}

impl Overlay {
    /// Allocate every fixed-size buffer. Nothing is resized afterwards.
    pub fn new(config: &OverlayConfig) -> Self {
        let size = config.output_size();
        info!(
            "overlay {size}x{size}, highlight radius {}",
            config.highlight_radius
        );
        Self {
            output: Bitmap::square(size),
            highlights: HighlightSet::new(config.highlight_radius, size),
            mask: ButtonMask::NONE,
            pending: Changes::default(),
            buttons_fresh: false,
        }
    }

    /// Draw and place the overlay once before any event arrives.
    pub fn start<P: Platform>(&mut self, platform: &mut P) -> Result<(), Error> {
        self.pending = Changes { position: true, shape: true, repaint: false, raise: true };
        self.flush(platform)
    }

    /// Fold one event into the pending changes.
    pub fn note<P: Platform>(&mut self, event: OverlayEvent, platform: &mut P) -> Result<(), Error> {
        trace!("event {event:?}");
        if event == OverlayEvent::ButtonChange && !self.buttons_fresh {
            self.mask = platform.query_pointer()?.mask;
            self.buttons_fresh = true;
        }
        self.pending |= changes_for(event);
        Ok(())
    }

    /// Act on everything noted since the last flush, then forget it.
    pub fn flush<P: Platform>(&mut self, platform: &mut P) -> Result<(), Error> {
        let changes = std::mem::take(&mut self.pending);
        self.buttons_fresh = false;
        if changes.is_empty() {
            return Ok(());
        }
        debug!("flush {changes:?}");

        if changes.shape {
            let cursor = platform.cursor_image()?;
            let highlight = active_highlight(self.mask, &self.highlights);
            composite(&mut self.output, highlight, &cursor);
            platform.present(&self.output)?;
        } else if changes.repaint {
            platform.present(&self.output)?;
        }

        if changes.position {
            let pointer = platform.query_pointer()?;
            self.mask = pointer.mask;
            let offset = (self.output.width / 2) as i32;
            platform.move_window(pointer.x - offset, pointer.y - offset)?;
        }

        if changes.raise {
            platform.raise_window()?;
        }
        Ok(())
    }

    /// Wait for one event, drain whatever else is ready, then flush once.
    /// Returns false when the platform has shut down.
    pub fn pump<P: Platform>(&mut self, platform: &mut P) -> Result<bool, Error> {
        let Some(first) = platform.wait_event()? else {
            return Ok(false);
        };
        self.note(first, platform)?;

        let mut burst = 1usize;
        while let Some(event) = platform.poll_event()? {
            self.note(event, platform)?;
            burst += 1;
        }
        trace!("drained {burst} events");

        self.flush(platform)?;
        Ok(true)
    }

    /// Main loop: runs until the platform closes.
    pub fn run<P: Platform>(&mut self, platform: &mut P) -> Result<(), Error> {
        self.start(platform)?;
        while platform.is_open() {
            if !self.pump(platform)? {
                break;
            }
        }
        info!("overlay closed");
        Ok(())
    }
}
