use ratatui::style::Color;

/// Palette as hex strings so the web renderer can use it verbatim as CSS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub bg: &'static str,
    pub bg_subtle: &'static str,
    pub fg: &'static str,
    pub fg_muted: &'static str,
    pub accent: &'static str,
    pub border: &'static str,
}

pub const EMBER: Theme = Theme {
    bg: "#0d0d0d",
    bg_subtle: "#141414",
    fg: "#e8e4de",
    fg_muted: "#5a5549",
    accent: "#e86a10",
    border: "#2a2622",
};

/// Parses `#rrggbb`. Anything else falls back to the terminal default.
pub fn color(hex: &str) -> Color {
    parse_hex(hex)
        .map(|(r, g, b)| Color::Rgb(r, g, b))
        .unwrap_or(Color::Reset)
}

fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}
