//! Session timing configuration and presentation constants.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Spinner / motto shimmer tick
    pub animation_interval: Duration,

    /// Typewriter tick and how many characters each tick reveals
    pub typewriter_interval: Duration,
    pub typewriter_batch: usize,

    /// Cursor blink period
    pub cursor_blink_interval: Duration,

    /// One map line is revealed per tick
    pub map_reveal_interval: Duration,

    /// How long the loading screen stays up before the main phase
    pub loading_duration: Duration,

    /// How long the link acknowledgement stays visible
    pub flash_duration: Duration,
    pub flash_message: &'static str,
}

impl Config {
    /// Timings for the SSH terminal experience.
    pub fn terminal() -> Self {
        Self {
            animation_interval: Duration::from_millis(100),
            typewriter_interval: Duration::from_millis(45),
            typewriter_batch: 3,
            cursor_blink_interval: Duration::from_millis(500),
            map_reveal_interval: Duration::from_millis(50),
            loading_duration: Duration::from_millis(2000),
            flash_duration: Duration::from_millis(2000),
            flash_message: "Copied to clipboard",
        }
    }

    /// The browser runs a little faster.
    pub fn web() -> Self {
        Self {
            animation_interval: Duration::from_millis(80),
            typewriter_interval: Duration::from_millis(30),
            typewriter_batch: 6,
            map_reveal_interval: Duration::from_millis(40),
            loading_duration: Duration::from_millis(1500),
            flash_message: "Opened in a new tab",
            ..Self::terminal()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::terminal()
    }
}

/// Shown in the footer.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Dimensions used when a client opens a shell without requesting a PTY.
pub const DEFAULT_COLS: u16 = 80;
pub const DEFAULT_ROWS: u16 = 24;

/// Largest terminal a session will draw for. Client-reported sizes are capped
/// here before a cell buffer is allocated.
pub const MAX_COLS: u16 = 512;
pub const MAX_ROWS: u16 = 256;

/// Bio column width, shared by both renderers for wrapping.
pub const BIO_WIDTH: usize = 50;
