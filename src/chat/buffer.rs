//! Bounded message buffer for one chat session

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::remote::ChatMessage;

/// Who a buffered line came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Author {
    /// Optimistic echo of something this session sent
    Local(String),
    /// Fetched from the messaging service
    Remote(String),
    /// Produced by the client itself (errors, notices)
    System,
}

impl Author {
    pub fn display_name(&self) -> &str {
        match self {
            Author::Local(name) | Author::Remote(name) => name,
            Author::System => "system",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub author: Author,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl ChatEntry {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            author: Author::System,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    pub fn local(name: &str, text: impl Into<String>) -> Self {
        Self {
            author: Author::Local(name.to_string()),
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    pub fn remote(message: ChatMessage) -> Self {
        Self {
            author: Author::Remote(message.author_name),
            text: message.text,
            created_at: message.created_at,
        }
    }
}

/// Chronological entries, oldest evicted first once full
#[derive(Debug)]
pub struct ChatBuffer {
    entries: VecDeque<ChatEntry>,
    capacity: usize,
}

impl ChatBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: ChatEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The newest `n` entries, oldest first
    pub fn tail(&self, n: usize) -> impl Iterator<Item = &ChatEntry> {
        self.entries.iter().skip(self.entries.len().saturating_sub(n))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatEntry> {
        self.entries.iter()
    }
}
