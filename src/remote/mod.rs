//! Remote directory and messaging services
//!
//! The session core talks to the chat service only through the two traits
//! here. Calls are typed and async; the wire protocol lives behind whichever
//! implementation is plugged in ([`MemoryBackend`] in this crate).

mod memory;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use memory::MemoryBackend;

/// Kind of node in the virtual hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Room,
    Directory,
    Unknown,
}

impl EntryKind {
    /// Suffix appended to names in listings
    pub fn suffix(&self) -> &'static str {
        match self {
            EntryKind::Directory => "/",
            EntryKind::Room => "#",
            EntryKind::Unknown => "?",
        }
    }

    /// Fixed-width label for listings
    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::Directory => "DIR ",
            EntryKind::Room => "ROOM",
            EntryKind::Unknown => "UNKN",
        }
    }
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub owner_name: String,
    pub kind: EntryKind,
    pub modified_at: Option<DateTime<Utc>>,
}

/// A message as stored by the messaging service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub author_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a mutating call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub ok: bool,
    pub message: String,
}

impl Status {
    pub fn ok() -> Self {
        Self {
            ok: true,
            message: String::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// Opaque credential authorizing writes
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(..)")
    }
}

/// Failure of a remote call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("no such path: {0}")]
    NotFound(String),
    #[error("{0}")]
    Rejected(String),
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

/// Directory operations of the chat service
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Entries under `path`; a room path lists the room itself
    async fn list_entries(&self, path: &str) -> Result<Vec<DirectoryEntry>, RemoteError>;

    async fn create_room(&self, path: &str, credential: &Credential) -> Result<Status, RemoteError>;

    async fn create_directory(
        &self,
        path: &str,
        credential: &Credential,
    ) -> Result<Status, RemoteError>;

    /// Whether a directory exists at `path`
    async fn path_exists(&self, path: &str) -> Result<bool, RemoteError>;

    async fn delete_path(&self, path: &str, credential: &Credential) -> Result<Status, RemoteError>;
}

/// Message operations of the chat service
#[async_trait]
pub trait MessagingService: Send + Sync {
    /// The most recent `limit` messages of a room, oldest first
    async fn list_messages(
        &self,
        room_path: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, RemoteError>;

    async fn append_message(
        &self,
        text: &str,
        room_path: &str,
        credential: &Credential,
    ) -> Result<Status, RemoteError>;
}

/// Handles to both services
#[derive(Clone)]
pub struct Services {
    pub directory: Arc<dyn DirectoryService>,
    pub messaging: Arc<dyn MessagingService>,
}

impl Services {
    pub fn new(directory: Arc<dyn DirectoryService>, messaging: Arc<dyn MessagingService>) -> Self {
        Self {
            directory,
            messaging,
        }
    }

    /// Both services from one backend
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: DirectoryService + MessagingService + 'static,
    {
        Self {
            directory: backend.clone(),
            messaging: backend,
        }
    }
}

/// Bound a remote call by `limit`
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, RemoteError>
where
    F: std::future::Future<Output = Result<T, RemoteError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(RemoteError::Timeout(limit)),
    }
}
