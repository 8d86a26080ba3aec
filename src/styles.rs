//! Colors and control sequences, rendered to `String`
//!
//! Everything here produces text for [`Surface::write`](crate::surface::Surface::write);
//! nothing talks to a tty directly.

use std::borrow::Cow;

use crossterm::style::{Attribute, Stylize};
use unicode_width::UnicodeWidthChar;

/// The local user's own name (chat and prompt)
pub fn own_name(name: &str) -> String {
    format!("{}", name.yellow())
}

/// Another participant's name
pub fn peer_name(name: &str) -> String {
    format!("{}", name.green())
}

/// Name shown for system-originated chat messages
pub fn system_name(name: &str) -> String {
    format!("{}", name.red())
}

/// Format the command prompt with yellow
pub fn prompt(text: &str) -> String {
    format!("{}", text.yellow())
}

/// Format status text as dim
pub fn dim(text: &str) -> String {
    format!("{}", text.attribute(Attribute::Dim))
}

/// Format error text as red
pub fn error(text: &str) -> String {
    format!("{}", text.red())
}

/// Format a banner line (chat header, exit notice) as cyan
pub fn banner(text: &str) -> String {
    format!("{}", text.cyan())
}

/// Directory names in listings
pub fn directory(text: &str) -> String {
    format!("{}", text.blue().bold())
}

/// Room names in listings
pub fn room(text: &str) -> String {
    format!("{}", text.green())
}

/// Format a time-of-day label as gray
pub fn timestamp(ts: &str) -> String {
    format!("{}", format!("[{}]", ts).dark_grey())
}

/// Rounded box-drawing corners and edges
pub struct BoxChars;

impl BoxChars {
    pub const TOP_LEFT: &'static str = "╭";
    pub const TOP_RIGHT: &'static str = "╮";
    pub const BOTTOM_LEFT: &'static str = "╰";
    pub const BOTTOM_RIGHT: &'static str = "╯";
    pub const HORIZONTAL: &'static str = "─";
    pub const VERTICAL: &'static str = "│";
}

/// Three-line cyan box `width` columns wide with `title` centered inside.
/// No trailing newline.
pub fn boxed_header(title: &str, width: u16) -> String {
    let inner = usize::from(width.saturating_sub(2));
    let title = truncate_to_width(title, inner);
    let padding = inner.saturating_sub(title.chars().map(|c| c.width().unwrap_or(0)).sum());
    let left = padding / 2;

    let edge = BoxChars::HORIZONTAL.repeat(inner);
    let rows = [
        format!("{}{}{}", BoxChars::TOP_LEFT, edge, BoxChars::TOP_RIGHT),
        format!(
            "{}{:left$}{}{:right$}{}",
            BoxChars::VERTICAL,
            "",
            title,
            "",
            BoxChars::VERTICAL,
            left = left,
            right = padding - left
        ),
        format!("{}{}{}", BoxChars::BOTTOM_LEFT, edge, BoxChars::BOTTOM_RIGHT),
    ];
    rows.iter()
        .map(|row| row.as_str().cyan().bold().to_string())
        .collect::<Vec<_>>()
        .join(ctrl::CRLF)
}

/// `text` without control characters, so remote content cannot move the
/// cursor or start escape sequences
pub fn strip_controls(text: &str) -> Cow<'_, str> {
    if text.chars().any(char::is_control) {
        Cow::Owned(text.chars().filter(|c| !c.is_control()).collect())
    } else {
        Cow::Borrowed(text)
    }
}

/// Truncate `text` to at most `max` display columns
pub fn truncate_to_width(text: &str, max: usize) -> &str {
    let mut width = 0;
    for (idx, c) in text.char_indices() {
        width += c.width().unwrap_or(0);
        if width > max {
            return &text[..idx];
        }
    }
    text
}

/// The longest suffix of `text` that fits in `max` display columns
pub fn tail_to_width(text: &str, max: usize) -> &str {
    let mut width = 0;
    for (idx, c) in text.char_indices().rev() {
        width += c.width().unwrap_or(0);
        if width > max {
            return &text[idx + c.len_utf8()..];
        }
    }
    text
}

/// Terminal control sequences as strings (for SSH output)
pub mod ctrl {
    use crossterm::cursor;
    use crossterm::terminal::{Clear, ClearType};
    use crossterm::Command;

    /// Move cursor right N columns
    pub fn move_right(n: u16) -> String {
        let mut buf = String::new();
        let _ = cursor::MoveRight(n).write_ansi(&mut buf);
        buf
    }

    /// Clear current line
    pub fn clear_line() -> String {
        let mut buf = String::new();
        let _ = Clear(ClearType::CurrentLine).write_ansi(&mut buf);
        buf
    }

    /// Clear screen and home the cursor
    pub fn clear_screen() -> String {
        let mut buf = String::new();
        let _ = Clear(ClearType::All).write_ansi(&mut buf);
        buf.push_str(&move_to(1, 1));
        buf
    }

    /// Move cursor to absolute position (1-indexed)
    pub fn move_to(row: u16, col: u16) -> String {
        format!("\x1b[{};{}H", row, col)
    }

    /// Carriage return + newline (for SSH terminals)
    pub const CRLF: &str = "\r\n";
}
