//! Command-mode input line
//!
//! Readline-style editing over `tui_input`: Ctrl+A/E and arrows move, Up/Down
//! browse history, Ctrl+K/U/W kill, and Tab hands the line to completion.
//! The editor only reports what happened; the controller decides what to draw.

use std::collections::VecDeque;

use tui_input::{Input, InputRequest};
use unicode_width::UnicodeWidthStr;

use crate::keys::{Key, KeyEvent};
use crate::styles;

const HISTORY_CAPACITY: usize = 500;

pub struct LineEditor {
    /// Text and cursor (cursor counted in chars)
    input: Input,
    history: History,
}

impl LineEditor {
    pub fn new() -> Self {
        Self {
            input: Input::default(),
            history: History::new(HISTORY_CAPACITY),
        }
    }

    pub fn value(&self) -> &str {
        self.input.value()
    }

    /// Cursor position in chars
    pub fn cursor(&self) -> usize {
        self.input.cursor()
    }

    fn len(&self) -> usize {
        self.input.value().chars().count()
    }

    /// Handle a key event
    pub fn handle_key(&mut self, event: KeyEvent) -> EditorAction {
        if event.modifiers.ctrl {
            return match event.key {
                Key::Char('a') => self.request(InputRequest::GoToStart),
                Key::Char('e') => self.request(InputRequest::GoToEnd),
                Key::Char('k') => {
                    self.kill_to_end();
                    EditorAction::Redraw
                }
                Key::Char('u') => {
                    self.kill_to_start();
                    EditorAction::Redraw
                }
                Key::Char('w') => {
                    self.kill_word_back();
                    EditorAction::Redraw
                }
                Key::Char('c') => {
                    self.clear();
                    EditorAction::Redraw
                }
                Key::Char('l') => EditorAction::ClearScreen,
                Key::Char('d') if self.input.value().is_empty() => EditorAction::Quit,
                Key::Left => self.request(InputRequest::GoToPrevWord),
                Key::Right => self.request(InputRequest::GoToNextWord),
                _ => EditorAction::None,
            };
        }

        if let Some(c) = event.printable() {
            self.history.stop_browsing();
            return self.request(InputRequest::InsertChar(c));
        }

        match event.key {
            Key::Enter => EditorAction::Execute(self.submit().unwrap_or_default()),
            Key::Backspace => {
                self.history.stop_browsing();
                if self.cursor() > 0 {
                    self.request(InputRequest::DeletePrevChar)
                } else {
                    EditorAction::None
                }
            }
            Key::Delete => {
                self.history.stop_browsing();
                if self.cursor() < self.len() {
                    self.request(InputRequest::DeleteNextChar)
                } else {
                    EditorAction::None
                }
            }
            Key::Left if self.cursor() > 0 => self.request(InputRequest::GoToPrevChar),
            Key::Right if self.cursor() < self.len() => self.request(InputRequest::GoToNextChar),
            Key::Home => self.request(InputRequest::GoToStart),
            Key::End => self.request(InputRequest::GoToEnd),
            Key::Up => {
                self.history_prev();
                EditorAction::Redraw
            }
            Key::Down => {
                self.history_next();
                EditorAction::Redraw
            }
            Key::Tab => EditorAction::Tab,
            _ => EditorAction::None,
        }
    }

    fn request(&mut self, req: InputRequest) -> EditorAction {
        self.input.handle(req);
        EditorAction::Redraw
    }

    /// Take the line and reset; blank lines are not recorded
    fn submit(&mut self) -> Option<String> {
        let line = self.input.value().to_string();
        self.input.reset();
        self.history.record(&line);
        (!line.trim().is_empty()).then_some(line)
    }

    fn history_prev(&mut self) {
        if let Some(line) = self.history.older(self.input.value()) {
            self.set_input(&line);
        }
    }

    fn history_next(&mut self) {
        if let Some(line) = self.history.newer() {
            self.set_input(&line);
        }
    }

    fn set_input(&mut self, value: &str) {
        self.input = Input::new(value.to_string());
    }

    fn clear(&mut self) {
        self.input.reset();
        self.history.stop_browsing();
    }

    fn kill_to_end(&mut self) {
        while self.cursor() < self.len() {
            self.input.handle(InputRequest::DeleteNextChar);
        }
    }

    fn kill_to_start(&mut self) {
        for _ in 0..self.cursor() {
            self.input.handle(InputRequest::DeletePrevChar);
        }
    }

    /// Ctrl+W: trailing spaces, then the word before them
    fn kill_word_back(&mut self) {
        let before: Vec<char> = self.input.value().chars().take(self.cursor()).collect();
        let mut pos = before.len();
        while pos > 0 && before[pos - 1] == ' ' {
            pos -= 1;
        }
        while pos > 0 && before[pos - 1] != ' ' {
            pos -= 1;
        }
        for _ in pos..before.len() {
            self.input.handle(InputRequest::DeletePrevChar);
        }
    }

    /// Replace the chars from `start` up to the cursor with completion text
    pub fn replace_with_completion(&mut self, start: usize, text: &str) {
        let to_delete = self.cursor().saturating_sub(start);
        for _ in 0..to_delete {
            self.input.handle(InputRequest::DeletePrevChar);
        }
        for c in text.chars() {
            self.input.handle(InputRequest::InsertChar(c));
        }
    }

    /// Render the input line (ANSI output), leaving the cursor in place
    pub fn render(&self, prompt: &str) -> String {
        let before_cursor: String = self.input.value().chars().take(self.cursor()).collect();
        // +1 for the space after the prompt
        let cursor_col = prompt.width() + 1 + before_cursor.width();

        let mut out = format!(
            "\r{}{} {}\r",
            styles::ctrl::clear_line(),
            styles::prompt(prompt),
            self.input.value()
        );
        if cursor_col > 0 {
            out.push_str(&styles::ctrl::move_right(cursor_col as u16));
        }
        out
    }

    pub fn history(&self) -> &History {
        &self.history
    }
}

impl Default for LineEditor {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of handling an editor event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorAction {
    /// No action needed
    None,
    /// Redraw the input line
    Redraw,
    /// Execute the given line (empty when nothing was typed)
    Execute(String),
    /// Tab completion requested
    Tab,
    /// Clear screen requested
    ClearScreen,
    /// Quit (Ctrl+D on empty line)
    Quit,
}

/// Bounded command history with a browse position
pub struct History {
    lines: VecDeque<String>,
    capacity: usize,
    /// Index shown while browsing with Up/Down
    browsing: Option<usize>,
    /// The unsubmitted line stashed when browsing started
    draft: String,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            capacity,
            browsing: None,
            draft: String::new(),
        }
    }

    /// Record a submitted line; blanks and repeats of the newest line are skipped
    fn record(&mut self, line: &str) {
        self.stop_browsing();
        if line.trim().is_empty() || self.lines.back().is_some_and(|last| last == line) {
            return;
        }
        self.lines.push_back(line.to_string());
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }

    /// Step to an older line, stashing `current` on the first step
    fn older(&mut self, current: &str) -> Option<String> {
        let idx = match self.browsing {
            None => {
                let newest = self.lines.len().checked_sub(1)?;
                self.draft = current.to_string();
                newest
            }
            Some(0) => return None,
            Some(i) => i - 1,
        };
        self.browsing = Some(idx);
        self.lines.get(idx).cloned()
    }

    /// Step to a newer line; past the newest, the stashed draft comes back
    fn newer(&mut self) -> Option<String> {
        let idx = self.browsing? + 1;
        if idx < self.lines.len() {
            self.browsing = Some(idx);
            self.lines.get(idx).cloned()
        } else {
            self.browsing = None;
            Some(std::mem::take(&mut self.draft))
        }
    }

    fn stop_browsing(&mut self) {
        self.browsing = None;
        self.draft.clear();
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }
}
