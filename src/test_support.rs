//! Shared fakes for unit tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::remote::{
    ChatMessage, Credential, DirectoryEntry, DirectoryService, MemoryBackend, MessagingService,
    RemoteError, Status,
};
use crate::surface::Surface;

/// Surface that records everything written to it
pub struct RecordingSurface {
    output: Mutex<String>,
    size: Mutex<(u16, u16)>,
    closed: AtomicBool,
}

impl RecordingSurface {
    pub fn new(cols: u16, rows: u16) -> Arc<Self> {
        Arc::new(Self {
            output: Mutex::new(String::new()),
            size: Mutex::new((cols, rows)),
            closed: AtomicBool::new(false),
        })
    }

    pub fn contents(&self) -> String {
        self.output.lock().unwrap().clone()
    }

    /// Return and forget everything written so far
    pub fn take(&self) -> String {
        std::mem::take(&mut *self.output.lock().unwrap())
    }

    pub fn resize(&self, cols: u16, rows: u16) {
        *self.size.lock().unwrap() = (cols, rows);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Surface for RecordingSurface {
    fn write(&self, text: &str) {
        self.output.lock().unwrap().push_str(text);
    }

    fn size(&self) -> (u16, u16) {
        *self.size.lock().unwrap()
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Backend with `user` registered and the room (and its parents) created
pub async fn backend_with_room(user: &str, room: &str) -> (Arc<MemoryBackend>, Credential) {
    let backend = Arc::new(MemoryBackend::new());
    let credential = Credential::new(format!("{}-token", user));
    backend.register(&credential, user);
    backend
        .ensure_directory_all(&crate::vpath::parent(room))
        .unwrap();
    let status = backend.create_room(room, &credential).await.unwrap();
    assert!(status.ok, "{}", status.message);
    (backend, credential)
}

/// Backend with `user` registered and `dir` created
pub fn backend_with_dir(user: &str, dir: &str) -> (Arc<MemoryBackend>, Credential) {
    let backend = Arc::new(MemoryBackend::new());
    let credential = Credential::new(format!("{}-token", user));
    backend.register(&credential, user);
    backend.ensure_directory_all(dir).unwrap();
    (backend, credential)
}

fn outage() -> RemoteError {
    RemoteError::Unavailable("connection refused".to_string())
}

/// Messaging wrapper whose calls can be switched to fail
pub struct FlakyMessaging {
    inner: Arc<MemoryBackend>,
    fail_list: AtomicBool,
    fail_append: AtomicBool,
}

impl FlakyMessaging {
    pub fn new(inner: Arc<MemoryBackend>) -> Self {
        Self {
            inner,
            fail_list: AtomicBool::new(false),
            fail_append: AtomicBool::new(false),
        }
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_append(&self, fail: bool) {
        self.fail_append.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessagingService for FlakyMessaging {
    async fn list_messages(
        &self,
        room_path: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, RemoteError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(outage());
        }
        self.inner.list_messages(room_path, limit).await
    }

    async fn append_message(
        &self,
        text: &str,
        room_path: &str,
        credential: &Credential,
    ) -> Result<Status, RemoteError> {
        if self.fail_append.load(Ordering::SeqCst) {
            return Err(outage());
        }
        self.inner.append_message(text, room_path, credential).await
    }
}

/// Directory wrapper that fails every call while switched on
pub struct FlakyDirectory {
    inner: Arc<MemoryBackend>,
    fail: AtomicBool,
}

impl FlakyDirectory {
    pub fn new(inner: Arc<MemoryBackend>) -> Self {
        Self {
            inner,
            fail: AtomicBool::new(false),
        }
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), RemoteError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(outage())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DirectoryService for FlakyDirectory {
    async fn list_entries(&self, path: &str) -> Result<Vec<DirectoryEntry>, RemoteError> {
        self.check()?;
        self.inner.list_entries(path).await
    }

    async fn create_room(&self, path: &str, credential: &Credential) -> Result<Status, RemoteError> {
        self.check()?;
        self.inner.create_room(path, credential).await
    }

    async fn create_directory(
        &self,
        path: &str,
        credential: &Credential,
    ) -> Result<Status, RemoteError> {
        self.check()?;
        self.inner.create_directory(path, credential).await
    }

    async fn path_exists(&self, path: &str) -> Result<bool, RemoteError> {
        self.check()?;
        self.inner.path_exists(path).await
    }

    async fn delete_path(&self, path: &str, credential: &Credential) -> Result<Status, RemoteError> {
        self.check()?;
        self.inner.delete_path(path, credential).await
    }
}

/// Directory wrapper whose `path_exists` blocks until released
pub struct GatedDirectory {
    inner: Arc<MemoryBackend>,
    gate: Notify,
}

impl GatedDirectory {
    pub fn new(inner: Arc<MemoryBackend>) -> Self {
        Self {
            inner,
            gate: Notify::new(),
        }
    }

    /// Let one blocked call through
    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl DirectoryService for GatedDirectory {
    async fn list_entries(&self, path: &str) -> Result<Vec<DirectoryEntry>, RemoteError> {
        self.inner.list_entries(path).await
    }

    async fn create_room(&self, path: &str, credential: &Credential) -> Result<Status, RemoteError> {
        self.inner.create_room(path, credential).await
    }

    async fn create_directory(
        &self,
        path: &str,
        credential: &Credential,
    ) -> Result<Status, RemoteError> {
        self.inner.create_directory(path, credential).await
    }

    async fn path_exists(&self, path: &str) -> Result<bool, RemoteError> {
        self.gate.notified().await;
        self.inner.path_exists(path).await
    }

    async fn delete_path(&self, path: &str, credential: &Credential) -> Result<Status, RemoteError> {
        self.inner.delete_path(path, credential).await
    }
}
