// Software cursor overlay.
// What you SEE:
// • A small transparent, always-on-top window glued to the mouse pointer,
//   showing the current cursor shape (or the --cursor image). Clicks go
//   straight through it.
// • Hold a mouse button: a coloured disc appears behind the cursor
//   (olive = button 1, purple = button 2, teal = button 3).
// Useful when screen recorders or remote viewers drop the real cursor.

mod compositor;
mod config;
mod coordinator;
mod cursor_source;
#[cfg(not(target_os = "linux"))]
mod draw;
mod error;
mod highlight;
mod types;
#[cfg(target_os = "linux")]
mod x11;

use clap::Parser;
use config::{OverlayArgs, OverlayConfig};
use coordinator::Overlay;
use error::Error;

#[cfg(target_os = "linux")]
use x11::X11Platform as NativePlatform;
#[cfg(not(target_os = "linux"))]
use draw::DesktopPlatform as NativePlatform;

fn main() -> Result<(), Error> {
    env_logger::init();

    /* --- Options ---
       Rejected here, before any buffer or window exists. */
    let config = OverlayConfig::from_args(OverlayArgs::parse())?;

    /* --- Fixed buffers ---
       Highlight discs and the output image, allocated once. */
    let mut overlay = Overlay::new(&config);

    /* --- Window + pointer ---
       Visual: the overlay square appears at the pointer. */
    let mut platform = NativePlatform::new(&config)?;

    /* --- Main loop ---
       Drain events, then recomposite and/or move at most once per burst. */
    overlay.run(&mut platform)
}
