//! Escape sequences written straight to the client terminal, outside of the
//! ratatui frame.

use base64::{engine::general_purpose::STANDARD, Engine as _};

const BEL: char = '\x07';

/// Strips characters that would terminate or hijack an OSC payload.
fn sanitize(value: &str) -> String {
    value.chars().filter(|c| *c != '\x07' && *c != '\x1b').collect()
}

fn payload(url: &str) -> String {
    STANDARD.encode(sanitize(url).as_bytes())
}

/// iTerm2 open-URL request; other terminals ignore it.
pub fn open_url(url: &str) -> String {
    format!("\x1b]1337;OpenURL=:{}{BEL}", payload(url))
}

/// OSC 52: put the URL on the client's clipboard.
pub fn copy_to_clipboard(url: &str) -> String {
    format!("\x1b]52;c;{}{BEL}", payload(url))
}

pub fn set_background(hex: &str) -> String {
    format!("\x1b]11;{}{BEL}", sanitize(hex))
}

/// Restores the client terminal on the way out.
pub fn farewell() -> String {
    [
        "\x1b[?25h",    // show cursor
        "\x1b[0m",      // reset attributes
        "\x1b]111\x07", // default background
        "\x1b[2J",
        "\x1b[H",
        "Goodbye!\r\n",
    ]
    .concat()
}
