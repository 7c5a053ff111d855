use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::state::Page;

/// User actions that can be triggered by key presses or web UI events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Tab
    NextPage,
    /// Shift+Tab
    PrevPage,
    /// Direct tab click (web)
    ShowPage(Page),
    SelectUp,
    SelectDown,
    /// Hover over a link row (web)
    SelectLink(usize),
    /// Enter or space on the links page
    OpenLink,
    /// Quit application
    Quit,
}

const ESC: u8 = 0x1b;

/// Longest CSI sequence kept while waiting for its final byte.
const MAX_SEQUENCE: usize = 32;

/// Turns raw PTY input into actions.
///
/// Escape sequences may be split across reads, so an unfinished sequence is
/// held back until the next chunk arrives. A read consisting of a single ESC
/// is the Escape key; ESC followed by another byte is an Alt-modified key and
/// does nothing.
#[derive(Debug, Default)]
pub struct KeyDecoder {
    pending: Vec<u8>,
}

enum Decoded {
    /// Bytes consumed and the action they mapped to, if any
    Key(Option<Action>, usize),
    Incomplete,
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, data: &[u8]) -> Vec<Action> {
        self.pending.extend_from_slice(data);
        let mut actions = Vec::new();
        let mut i = 0;

        while i < self.pending.len() {
            let rest = &self.pending[i..];
            let decoded = match rest[0] {
                ESC => decode_escape(rest),
                byte => Decoded::Key(decode_byte(byte), 1),
            };
            match decoded {
                Decoded::Key(action, consumed) => {
                    actions.extend(action);
                    i += consumed;
                }
                Decoded::Incomplete => {
                    if rest == [ESC] && data == [ESC] {
                        actions.push(Action::Quit);
                        i += 1;
                    }
                    break;
                }
            }
        }

        self.pending.drain(..i);
        actions
    }
}

fn decode_byte(byte: u8) -> Option<Action> {
    match byte {
        b'\t' => Some(Action::NextPage),
        b'\r' | b'\n' | b' ' => Some(Action::OpenLink),
        b'q' | b'Q' => Some(Action::Quit),
        // Ctrl-C
        0x03 => Some(Action::Quit),
        _ => None,
    }
}

/// `rest` starts with ESC.
fn decode_escape(rest: &[u8]) -> Decoded {
    match rest.get(1) {
        None => Decoded::Incomplete,
        Some(b'[') => decode_csi(rest),
        Some(b'O') => match rest.get(2) {
            None => Decoded::Incomplete,
            Some(&final_byte) => Decoded::Key(decode_final(final_byte), 3),
        },
        // Alt+Escape; the second ESC may start a sequence of its own
        Some(&ESC) => Decoded::Key(None, 1),
        // Alt+key
        Some(_) => Decoded::Key(None, 2),
    }
}

/// `rest` starts with `ESC [`. Parameters are skipped; only the final byte
/// picks the key, so modified arrows act like plain ones.
fn decode_csi(rest: &[u8]) -> Decoded {
    for (offset, &byte) in rest.iter().enumerate().skip(2) {
        match byte {
            0x20..=0x3f => {}
            0x40..=0x7e => return Decoded::Key(decode_final(byte), offset + 1),
            // Malformed; resume at the offending byte
            _ => return Decoded::Key(None, offset),
        }
    }
    if rest.len() >= MAX_SEQUENCE {
        Decoded::Key(None, rest.len())
    } else {
        Decoded::Incomplete
    }
}

fn decode_final(final_byte: u8) -> Option<Action> {
    match final_byte {
        b'A' => Some(Action::SelectUp),
        b'B' => Some(Action::SelectDown),
        b'C' => Some(Action::NextPage),
        b'D' => Some(Action::PrevPage),
        b'Z' => Some(Action::PrevPage),
        _ => None,
    }
}

impl Action {
    /// Maps a key event from the local terminal.
    pub fn from_key_event(key: KeyEvent) -> Option<Self> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        match key.code {
            KeyCode::Tab if key.modifiers.contains(KeyModifiers::SHIFT) => Some(Action::PrevPage),
            KeyCode::Tab => Some(Action::NextPage),
            KeyCode::BackTab => Some(Action::PrevPage),
            KeyCode::Right => Some(Action::NextPage),
            KeyCode::Left => Some(Action::PrevPage),
            KeyCode::Up => Some(Action::SelectUp),
            KeyCode::Down => Some(Action::SelectDown),
            KeyCode::Enter | KeyCode::Char(' ') => Some(Action::OpenLink),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Quit)
            }
            KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
            _ => None,
        }
    }

    /// Maps a browser `KeyboardEvent.key`. The browser tab has no quit key.
    pub fn from_web_key(key: &str, shift: bool) -> Option<Self> {
        match key {
            "Tab" if shift => Some(Action::PrevPage),
            "Tab" => Some(Action::NextPage),
            "ArrowRight" => Some(Action::NextPage),
            "ArrowLeft" => Some(Action::PrevPage),
            "ArrowUp" => Some(Action::SelectUp),
            "ArrowDown" => Some(Action::SelectDown),
            "Enter" | " " => Some(Action::OpenLink),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain_keys() {
        let mut decoder = KeyDecoder::new();
        assert_eq!(
            decoder.feed(b"\t \rqx\x03"),
            vec![
                Action::NextPage,
                Action::OpenLink,
                Action::OpenLink,
                Action::Quit,
                Action::Quit,
            ]
        );
    }

    #[test]
    fn test_decode_arrow_keys() {
        let mut decoder = KeyDecoder::new();
        assert_eq!(
            decoder.feed(b"\x1b[A\x1b[B\x1bOC\x1b[D"),
            vec![
                Action::SelectUp,
                Action::SelectDown,
                Action::NextPage,
                Action::PrevPage,
            ]
        );
    }

    #[test]
    fn test_decode_shift_tab() {
        let mut decoder = KeyDecoder::new();
        assert_eq!(decoder.feed(b"\x1b[Z"), vec![Action::PrevPage]);
    }

    #[test]
    fn test_decode_split_sequence() {
        let mut decoder = KeyDecoder::new();
        assert!(decoder.feed(b"\x1b[").is_empty());
        assert_eq!(decoder.feed(b"B"), vec![Action::SelectDown]);
    }

    #[test]
    fn test_decode_lone_escape_quits() {
        let mut decoder = KeyDecoder::new();
        assert_eq!(decoder.feed(b"\x1b"), vec![Action::Quit]);
        assert!(decoder.feed(b"").is_empty());
    }

    #[test]
    fn test_decode_alt_keys_do_not_quit() {
        let mut decoder = KeyDecoder::new();
        assert!(decoder.feed(b"\x1bx").is_empty());
        assert_eq!(decoder.feed(b"\x1bq\t"), vec![Action::NextPage]);
        // Alt+Up is sent as ESC followed by the arrow sequence
        assert_eq!(decoder.feed(b"\x1b\x1b[A"), vec![Action::SelectUp]);
    }

    #[test]
    fn test_decode_parameterised_csi() {
        let mut decoder = KeyDecoder::new();
        assert_eq!(
            decoder.feed(b"\x1b[1;2A\x1b[1;5B\x1b[5~\t"),
            vec![Action::SelectUp, Action::SelectDown, Action::NextPage]
        );
        assert!(decoder.feed(b"\x1b[1;").is_empty());
        assert_eq!(decoder.feed(b"2C"), vec![Action::NextPage]);
    }

    #[test]
    fn test_decode_escape_ending_longer_read_is_held() {
        let mut decoder = KeyDecoder::new();
        assert_eq!(decoder.feed(b"\t\x1b"), vec![Action::NextPage]);
        assert_eq!(decoder.feed(b"[B"), vec![Action::SelectDown]);
    }

    #[test]
    fn test_decode_overlong_csi_discarded() {
        let mut decoder = KeyDecoder::new();
        let mut input = b"\x1b[".to_vec();
        input.extend(std::iter::repeat(b'1').take(MAX_SEQUENCE));
        assert!(decoder.feed(&input).is_empty());
        assert!(decoder.pending.is_empty());
        assert_eq!(decoder.feed(b"\t"), vec![Action::NextPage]);
    }

    #[test]
    fn test_decode_unknown_csi_ignored() {
        let mut decoder = KeyDecoder::new();
        assert_eq!(decoder.feed(b"\x1b[H\t"), vec![Action::NextPage]);
    }

    #[test]
    fn test_from_key_event() {
        let tab = KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE);
        let back = KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        let plain_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE);

        assert_eq!(Action::from_key_event(tab), Some(Action::NextPage));
        assert_eq!(Action::from_key_event(back), Some(Action::PrevPage));
        assert_eq!(Action::from_key_event(ctrl_c), Some(Action::Quit));
        assert_eq!(Action::from_key_event(plain_c), None);
    }

    #[test]
    fn test_from_web_key() {
        assert_eq!(Action::from_web_key("Tab", false), Some(Action::NextPage));
        assert_eq!(Action::from_web_key("Tab", true), Some(Action::PrevPage));
        assert_eq!(Action::from_web_key(" ", false), Some(Action::OpenLink));
        assert_eq!(Action::from_web_key("q", false), None);
        assert_eq!(Action::from_web_key("Escape", false), None);
    }
}
