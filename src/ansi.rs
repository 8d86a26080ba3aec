//! ANSI escape sequence parser for terminal input
//!
//! Turns the raw byte stream of an SSH pty into key events:
//! - Control bytes (Ctrl+A .. Ctrl+Z, Enter, Backspace, Tab)
//! - CSI / SS3 sequences for arrows and navigation keys, including
//!   xterm modifier parameters (`ESC [ 1 ; 5 C` is Ctrl+Right)
//! - Alt combinations sent as an ESC prefix
//! - UTF-8 multi-byte characters

use crate::keys::{Key, KeyEvent, Modifiers};

/// Parser state for multi-byte input
#[derive(Debug, Default)]
pub struct EscapeParser {
    state: ParseState,
    params: Vec<u8>,
    utf8: Vec<u8>,
    utf8_len: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    #[default]
    Normal,
    /// Got ESC (0x1b)
    Escape,
    /// Got ESC [
    Csi,
    /// Got ESC O
    Ss3,
    /// Inside a UTF-8 multi-byte character
    Utf8,
}

impl EscapeParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a byte and return the parsed event, if one completed
    pub fn feed(&mut self, byte: u8) -> Option<KeyEvent> {
        match self.state {
            ParseState::Normal => self.handle_normal(byte),
            ParseState::Escape => self.handle_escape(byte),
            ParseState::Csi => self.handle_csi(byte),
            ParseState::Ss3 => self.handle_ss3(byte),
            ParseState::Utf8 => self.handle_utf8(byte),
        }
    }

    /// Parse a whole packet, flushing a trailing bare ESC
    pub fn feed_all(&mut self, data: &[u8]) -> Vec<KeyEvent> {
        let mut events: Vec<KeyEvent> = data.iter().filter_map(|b| self.feed(*b)).collect();
        events.extend(self.flush());
        events
    }

    /// Flush pending state at the end of a data packet.
    /// Returns Escape if we were waiting for a sequence that never came.
    pub fn flush(&mut self) -> Option<KeyEvent> {
        if self.state == ParseState::Escape {
            self.reset();
            Some(KeyEvent::plain(Key::Escape))
        } else {
            None
        }
    }

    fn reset(&mut self) {
        self.state = ParseState::Normal;
        self.params.clear();
        self.utf8.clear();
        self.utf8_len = 0;
    }

    fn handle_normal(&mut self, byte: u8) -> Option<KeyEvent> {
        match byte {
            0x1b => {
                self.state = ParseState::Escape;
                None
            }
            0x0d | 0x0a => Some(KeyEvent::plain(Key::Enter)),
            0x09 => Some(KeyEvent::plain(Key::Tab)),
            0x7f | 0x08 => Some(KeyEvent::plain(Key::Backspace)),
            // Ctrl+A .. Ctrl+Z
            0x01..=0x1a => Some(KeyEvent::ctrl((b'a' + byte - 1) as char)),
            0x20..=0x7e => Some(KeyEvent::char(byte as char)),
            0xc2..=0xf4 => {
                self.state = ParseState::Utf8;
                self.utf8.clear();
                self.utf8.push(byte);
                self.utf8_len = match byte {
                    0xc2..=0xdf => 2,
                    0xe0..=0xef => 3,
                    _ => 4,
                };
                None
            }
            _ => Some(KeyEvent::plain(Key::Unknown)),
        }
    }

    fn handle_escape(&mut self, byte: u8) -> Option<KeyEvent> {
        match byte {
            b'[' => {
                self.state = ParseState::Csi;
                self.params.clear();
                None
            }
            b'O' => {
                self.state = ParseState::Ss3;
                None
            }
            0x7f => {
                self.reset();
                Some(KeyEvent::new(Key::Backspace, Modifiers::ALT))
            }
            0x20..=0x7e => {
                self.reset();
                Some(KeyEvent::alt(byte as char))
            }
            _ => {
                self.reset();
                Some(KeyEvent::plain(Key::Unknown))
            }
        }
    }

    fn handle_ss3(&mut self, byte: u8) -> Option<KeyEvent> {
        self.reset();
        let key = match byte {
            b'A' => Key::Up,
            b'B' => Key::Down,
            b'C' => Key::Right,
            b'D' => Key::Left,
            b'H' => Key::Home,
            b'F' => Key::End,
            _ => Key::Unknown,
        };
        Some(KeyEvent::plain(key))
    }

    fn handle_csi(&mut self, byte: u8) -> Option<KeyEvent> {
        let key = match byte {
            // Parameter bytes (digits and semicolons)
            b'0'..=b'9' | b';' => {
                self.params.push(byte);
                return None;
            }
            b'A' => Key::Up,
            b'B' => Key::Down,
            b'C' => Key::Right,
            b'D' => Key::Left,
            b'H' => Key::Home,
            b'F' => Key::End,
            // Tilde sequences: ESC [ n ~
            b'~' => match self.first_param() {
                Some(1) | Some(7) => Key::Home,
                Some(3) => Key::Delete,
                Some(4) | Some(8) => Key::End,
                Some(5) => Key::PageUp,
                Some(6) => Key::PageDown,
                _ => Key::Unknown,
            },
            _ => Key::Unknown,
        };
        let modifiers = self
            .modifier_param()
            .map(Modifiers::from_xterm_param)
            .unwrap_or_default();
        self.reset();
        Some(KeyEvent::new(key, modifiers))
    }

    fn handle_utf8(&mut self, byte: u8) -> Option<KeyEvent> {
        if byte & 0xc0 != 0x80 {
            // Broken sequence, drop what we had and reparse this byte
            self.reset();
            return self.handle_normal(byte);
        }
        self.utf8.push(byte);
        if self.utf8.len() < self.utf8_len {
            return None;
        }
        let decoded = std::str::from_utf8(&self.utf8)
            .ok()
            .and_then(|s| s.chars().next());
        self.reset();
        Some(match decoded {
            Some(c) => KeyEvent::char(c),
            None => KeyEvent::plain(Key::Unknown),
        })
    }

    fn params(&self) -> impl Iterator<Item = Option<u8>> + '_ {
        self.params
            .split(|b| *b == b';')
            .map(|p| std::str::from_utf8(p).ok().and_then(|s| s.parse().ok()))
    }

    fn first_param(&self) -> Option<u8> {
        self.params().next().flatten()
    }

    fn modifier_param(&self) -> Option<u8> {
        self.params().nth(1).flatten()
    }
}
