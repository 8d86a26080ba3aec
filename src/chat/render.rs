//! Chat screen layout
//!
//! ```text
//! row 1        === Chat Room: /home/general ===
//! row 2        Press Ctrl+C to exit chat mode
//! row 3        (blank)
//! row 4..=r-2  messages, newest at the bottom
//! row r-1      alice> pending input
//! row r        (blank)
//! ```
//!
//! Every function returns a complete repaint of its region; nothing relies
//! on what was on screen before.

use std::fmt::Write;

use unicode_width::UnicodeWidthStr;

use super::buffer::{Author, ChatBuffer, ChatEntry};
use crate::styles::{self, ctrl};

/// Smallest surface that fits header, one message row and the input region
pub const MIN_ROWS: u16 = 6;

const HEADER_ROWS: u16 = 3;
const FIRST_MESSAGE_ROW: u16 = HEADER_ROWS + 1;

/// Number of message rows available on a surface `rows` tall
pub fn message_rows(rows: u16) -> u16 {
    rows.saturating_sub(5)
}

/// Clear the surface and draw the header
pub fn header(room: &str, cols: u16) -> String {
    let width = cols as usize;
    let title = format!("=== Chat Room: {} ===", room);
    let mut out = ctrl::clear_screen();
    let _ = write!(
        out,
        "{}{}{}",
        ctrl::move_to(1, 1),
        ctrl::clear_line(),
        styles::banner(styles::truncate_to_width(&title, width))
    );
    let _ = write!(
        out,
        "{}{}{}",
        ctrl::move_to(2, 1),
        ctrl::clear_line(),
        styles::dim(styles::truncate_to_width(
            "Press Ctrl+C to exit chat mode",
            width
        ))
    );
    let _ = write!(out, "{}{}", ctrl::move_to(3, 1), ctrl::clear_line());
    out
}

/// Repaint the message region with the newest entries that fit
pub fn messages(buffer: &ChatBuffer, local_user: &str, cols: u16, rows: u16) -> String {
    let available = message_rows(rows);
    let mut out = String::new();
    let visible: Vec<&ChatEntry> = buffer.tail(available as usize).collect();
    for offset in 0..available {
        let _ = write!(
            out,
            "{}{}",
            ctrl::move_to(FIRST_MESSAGE_ROW + offset, 1),
            ctrl::clear_line()
        );
        if let Some(entry) = visible.get(offset as usize) {
            out.push_str(&message_line(entry, local_user, cols as usize));
        }
    }
    out
}

/// One formatted message, at most `width` display columns
pub fn message_line(entry: &ChatEntry, local_user: &str, width: usize) -> String {
    let time = entry.created_at.format("%H:%M").to_string();
    // "[HH:MM] "
    let stamp_width = time.width() + 3;
    if width < stamp_width {
        return String::new();
    }

    let name = styles::strip_controls(entry.author.display_name());
    let name = styles::truncate_to_width(&name, width - stamp_width);
    let used = stamp_width + name.width();
    let styled_name = match &entry.author {
        Author::System => styles::system_name(name),
        Author::Local(_) => styles::own_name(name),
        Author::Remote(author) if author == local_user => styles::own_name(name),
        Author::Remote(_) => styles::peer_name(name),
    };

    let mut line = format!("{} {}", styles::timestamp(&time), styled_name);
    if used + 2 <= width {
        line.push_str(": ");
        let text = styles::strip_controls(&entry.text);
        line.push_str(styles::truncate_to_width(&text, width - used - 2));
    }
    line
}

/// Repaint the input region and leave the cursor after the pending text
pub fn input(local_user: &str, pending: &str, cols: u16, rows: u16) -> String {
    let width = cols as usize;
    let prompt = format!("{}> ", local_user);
    let prompt = styles::truncate_to_width(&prompt, width.saturating_sub(1));
    let room_for_text = width.saturating_sub(prompt.width() + 1);
    let shown = styles::tail_to_width(pending, room_for_text);

    let input_row = rows.saturating_sub(1).max(1);
    let mut out = String::new();
    let _ = write!(out, "{}{}", ctrl::move_to(rows, 1), ctrl::clear_line());
    let _ = write!(
        out,
        "{}{}{}{}",
        ctrl::move_to(input_row, 1),
        ctrl::clear_line(),
        styles::own_name(prompt),
        shown
    );
    out
}

/// Header, messages and input in one write
pub fn full(room: &str, buffer: &ChatBuffer, local_user: &str, pending: &str, size: (u16, u16)) -> String {
    let (cols, rows) = size;
    let mut out = header(room, cols);
    out.push_str(&messages(buffer, local_user, cols, rows));
    out.push_str(&input(local_user, pending, cols, rows));
    out
}
