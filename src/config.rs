// Command line options, validated once at startup before anything is allocated.

use crate::error::Error;
use clap::Parser;
use std::path::PathBuf;
#[cfg(not(target_os = "linux"))]
use std::time::Duration;

const ABOUT: &str = "Draws the mouse cursor into an always-on-top overlay window so \
screen recorders and remote viewers that drop the real cursor still see it. \
Holding a mouse button shows a coloured disc behind the cursor.";

/// Largest accepted value for `--size` and `--highlight-radius`.
pub const MAX_SIZE: usize = 2048;

pub const DEFAULT_MAX_CURSOR_SIZE: usize = 32;

/// Parse a non-negative size no larger than [`MAX_SIZE`].
pub fn parse_size(arg: &str) -> Result<usize, String> {
    let value: i64 = arg.trim().parse().map_err(|_| format!("Not a number: {arg}"))?;
    if value < 0 {
        return Err(format!("Size cannot be negative: {arg}"));
    }
    if value > MAX_SIZE as i64 {
        return Err(format!("Maximum size is {MAX_SIZE}, but given: {arg}"));
    }
    Ok(value as usize)
}

/// Parse `X,Y` into a hotspot offset.
pub fn parse_hotspot(arg: &str) -> Result<(i32, i32), String> {
    let (x, y) = arg
        .split_once(',')
        .ok_or_else(|| format!("Expected X,Y but given: {arg}"))?;
    let x = x.trim().parse().map_err(|_| format!("Not a number: {x}"))?;
    let y = y.trim().parse().map_err(|_| format!("Not a number: {y}"))?;
    Ok((x, y))
}

#[derive(Parser, Debug)]
#[command(version, about = ABOUT, long_about = None)]
pub struct OverlayArgs {
    /// Maximum cursor size in pixels; the overlay is 2*size+1 pixels square.
    #[arg(short, long, value_parser = parse_size, default_value_t = DEFAULT_MAX_CURSOR_SIZE)]
    pub size: usize,

    /// Radius of the click highlight disc (0 disables it; default: half the overlay).
    // Same parser as --size, so the radius tops out at MAX_SIZE even though
    // the overlay itself can be up to 2*MAX_SIZE+1 wide.
    #[arg(short = 'r', long, value_parser = parse_size)]
    pub highlight_radius: Option<usize>,

    /// Image file to use as the cursor shape instead of the built-in arrow.
    #[arg(short, long)]
    pub cursor: Option<PathBuf>,

    /// Hotspot of the cursor image, as X,Y pixels from its top-left corner.
    #[arg(long, value_parser = parse_hotspot, default_value = "0,0")]
    pub hotspot: (i32, i32),

    /// How often the pointer is sampled, in milliseconds.
    #[cfg(not(target_os = "linux"))]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=1000), default_value_t = 8)]
    pub poll_interval_ms: u64,
}

/// Validated, process-lifetime configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverlayConfig {
    pub max_cursor_size: usize,
    pub highlight_radius: usize,
    pub cursor: Option<PathBuf>,
    pub hotspot: (i32, i32),
    /// Pointer sampling period of the non-X11 backend
    #[cfg(not(target_os = "linux"))]
    pub poll_interval: Duration,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        let max_cursor_size = DEFAULT_MAX_CURSOR_SIZE;
        Self {
            max_cursor_size,
            highlight_radius: (2 * max_cursor_size + 1) / 2,
            cursor: None,
            hotspot: (0, 0),
            #[cfg(not(target_os = "linux"))]
            poll_interval: Duration::from_millis(8),
        }
    }
}

impl OverlayConfig {
    pub fn from_args(args: OverlayArgs) -> Result<Self, Error> {
        let output_size = 2 * args.size + 1;
        let highlight_radius = match args.highlight_radius {
            None => output_size / 2,
            Some(r) if r > output_size => {
                return Err(Error::Config(format!(
                    "Highlight radius cannot be larger than size ({r} > {output_size})"
                )));
            }
            Some(r) => r,
        };

        Ok(Self {
            max_cursor_size: args.size,
            highlight_radius,
            cursor: args.cursor,
            hotspot: args.hotspot,
            #[cfg(not(target_os = "linux"))]
            poll_interval: Duration::from_millis(args.poll_interval_ms),
        })
    }

    /// Side of the square overlay: any cursor up to `max_cursor_size` fits
    /// around the centre whatever its hotspot.
    pub fn output_size(&self) -> usize {
        2 * self.max_cursor_size + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(args: &[&str]) -> Result<OverlayConfig, Error> {
        let args = OverlayArgs::try_parse_from(std::iter::once("cursor-overlay").chain(args.iter().copied()))
            .map_err(|e| Error::Config(e.to_string()))?;
        OverlayConfig::from_args(args)
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg, OverlayConfig::default());
        assert_eq!(cfg.output_size(), 65);
        assert_eq!(cfg.highlight_radius, 32);
    }

    #[test]
    fn test_size_and_radius() {
        let cfg = config(&["-s", "64", "-r", "10"]).unwrap();
        assert_eq!(cfg.output_size(), 129);
        assert_eq!(cfg.highlight_radius, 10);

        let cfg = config(&["--size", "0"]).unwrap();
        assert_eq!(cfg.output_size(), 1);
        assert_eq!(cfg.highlight_radius, 0);
    }

    #[test]
    fn test_radius_bound_is_output_size() {
        assert_eq!(config(&["-s", "4", "-r", "9"]).unwrap().highlight_radius, 9);
        assert!(matches!(config(&["-s", "4", "-r", "10"]), Err(Error::Config(_))));
    }

    #[test]
    fn test_parse_size_messages() {
        assert_eq!(parse_size("2048"), Ok(2048));
        assert_eq!(parse_size("abc"), Err("Not a number: abc".to_string()));
        assert_eq!(parse_size("-1"), Err("Size cannot be negative: -1".to_string()));
        assert_eq!(parse_size("2049"), Err("Maximum size is 2048, but given: 2049".to_string()));
        assert!(config(&["-s", "5000"]).is_err());
    }

    #[test]
    fn test_radius_capped_like_size() {
        // The overlay is 4097 wide here, but the radius parser stops at 2048.
        assert_eq!(config(&["-s", "2048"]).unwrap().output_size(), 4097);
        assert_eq!(config(&["-s", "2048", "-r", "2048"]).unwrap().highlight_radius, 2048);
        assert!(config(&["-s", "2048", "-r", "2049"]).is_err());
    }

    #[test]
    fn test_cursor_and_hotspot() {
        let cfg = config(&["--cursor", "/tmp/arrow.png", "--hotspot", "3,7"]).unwrap();
        assert_eq!(cfg.cursor, Some(PathBuf::from("/tmp/arrow.png")));
        assert_eq!(cfg.hotspot, (3, 7));

        assert!(parse_hotspot("3").is_err());
    }

    #[cfg(not(target_os = "linux"))]
    #[test]
    fn test_poll_interval() {
        let cfg = config(&["--poll-interval-ms", "16"]).unwrap();
        assert_eq!(cfg.poll_interval, Duration::from_millis(16));
        assert!(config(&["--poll-interval-ms", "0"]).is_err());
    }
}
