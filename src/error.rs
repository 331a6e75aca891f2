// One error type for the whole overlay.
// Every variant states *where* things went wrong; all of them are fatal.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Command line values out of range (checked before anything is allocated)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Creating the overlay window failed (no display, no usable visual, ...)
    #[error("Window init error: {0}")]
    WindowInit(String),

    /// Pushing pixels to the overlay window failed
    #[error("Window update error: {0}")]
    WindowUpdate(String),

    /// Cursor bitmap has inconsistent dimensions
    #[error("Cursor image error: {0}")]
    CursorImage(String),

    /// Cursor file missing or not decodable
    #[error("Cursor decode error: {0}")]
    CursorDecode(#[from] image::ImageError),

    /// The display server lacks an extension we cannot work without
    #[cfg(target_os = "linux")]
    #[error("Missing X extension: {0}")]
    MissingExtension(&'static str),

    /// Could not reach the X server at all
    #[cfg(target_os = "linux")]
    #[error("X11 connect error: {0}")]
    Connect(#[from] x11rb::errors::ConnectError),

    /// The X connection broke while sending
    #[cfg(target_os = "linux")]
    #[error("X11 connection error: {0}")]
    Connection(#[from] x11rb::errors::ConnectionError),

    /// The X server answered a request with an error
    #[cfg(target_os = "linux")]
    #[error("X11 request error: {0}")]
    Reply(#[from] x11rb::errors::ReplyError),

    /// Allocating an X resource id failed
    #[cfg(target_os = "linux")]
    #[error("X11 id error: {0}")]
    ReplyOrId(#[from] x11rb::errors::ReplyOrIdError),
}
