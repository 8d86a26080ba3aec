//! Key events delivered by the terminal surface

/// A key, either a character or a named key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Character input (letters of Ctrl/Alt combinations are lowercase)
    Char(char),
    Enter,
    Backspace,
    Tab,
    /// Bare escape key, not part of a sequence
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    Delete,
    PageUp,
    PageDown,
    /// Unknown or unhandled input
    Unknown,
}

/// Modifier keys held during a key press
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        alt: false,
        shift: false,
    };

    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        alt: false,
        shift: false,
    };

    pub const ALT: Modifiers = Modifiers {
        ctrl: false,
        alt: true,
        shift: false,
    };

    /// Decode an xterm modifier parameter (`ESC [ 1 ; <m> C`)
    pub fn from_xterm_param(param: u8) -> Self {
        let bits = param.saturating_sub(1);
        Self {
            shift: bits & 1 != 0,
            alt: bits & 2 != 0,
            ctrl: bits & 4 != 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.ctrl && !self.alt
    }
}

/// A single key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::NONE)
    }

    pub fn char(c: char) -> Self {
        Self::plain(Key::Char(c))
    }

    pub fn ctrl(c: char) -> Self {
        Self::new(Key::Char(c.to_ascii_lowercase()), Modifiers::CTRL)
    }

    pub fn alt(c: char) -> Self {
        Self::new(Key::Char(c), Modifiers::ALT)
    }

    /// Ctrl+C
    pub fn is_interrupt(&self) -> bool {
        self.modifiers.ctrl && self.key == Key::Char('c')
    }

    /// The character this key inserts, if it is plain printable input
    pub fn printable(&self) -> Option<char> {
        match self.key {
            Key::Char(c) if self.modifiers.is_empty() && !c.is_control() => Some(c),
            _ => None,
        }
    }
}

/// Event from the terminal surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    Key(KeyEvent),
    /// Geometry changed; the new size is queryable on the surface
    Resize,
}

impl From<KeyEvent> for SurfaceEvent {
    fn from(key: KeyEvent) -> Self {
        SurfaceEvent::Key(key)
    }
}
