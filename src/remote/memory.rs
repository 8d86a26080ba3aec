//! In-process chat service backing every connection

use std::collections::{BTreeMap, VecDeque};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use tracing::{debug, info};

use super::{
    ChatMessage, Credential, DirectoryEntry, DirectoryService, EntryKind, MessagingService,
    RemoteError, Status,
};
use crate::vpath;

/// Messages kept per room
pub const ROOM_HISTORY_CAP: usize = 1000;

const SYSTEM_OWNER: &str = "system";

#[derive(Debug, Clone)]
struct Node {
    kind: EntryKind,
    owner_name: String,
    owner_token: Option<Credential>,
    modified_at: DateTime<Utc>,
}

/// Directory tree and room histories held in memory
///
/// Paths are normalized before lookup, so `/a//b/` and `/a/b` are the same
/// node. The root directory always exists and cannot be deleted.
pub struct MemoryBackend {
    nodes: RwLock<BTreeMap<String, Node>>,
    messages: DashMap<String, VecDeque<ChatMessage>>,
    users: DashMap<Credential, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            vpath::ROOT.to_string(),
            Node {
                kind: EntryKind::Directory,
                owner_name: SYSTEM_OWNER.to_string(),
                owner_token: None,
                modified_at: Utc::now(),
            },
        );
        Self {
            nodes: RwLock::new(nodes),
            messages: DashMap::new(),
            users: DashMap::new(),
        }
    }

    /// Associate a credential with a display name
    pub fn register(&self, credential: &Credential, name: &str) {
        debug!(user = %name, "registered credential");
        self.users.insert(credential.clone(), name.to_string());
    }

    /// Create `path` and any missing ancestors as system-owned directories
    pub fn ensure_directory_all(&self, path: &str) -> Result<(), RemoteError> {
        let path = vpath::normalize(path);
        let mut nodes = self.write_nodes()?;
        let mut current = vpath::ROOT.to_string();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = vpath::join(&current, segment);
            match nodes.get(&current) {
                Some(node) if node.kind == EntryKind::Directory => {}
                Some(_) => {
                    return Err(RemoteError::Rejected(format!(
                        "{} exists and is not a directory",
                        current
                    )))
                }
                None => {
                    nodes.insert(current.clone(), system_node(EntryKind::Directory));
                }
            }
        }
        Ok(())
    }

    /// Create a system-owned room if it does not exist yet
    pub fn seed_room(&self, path: &str) -> Result<(), RemoteError> {
        let path = vpath::normalize(path);
        self.ensure_directory_all(&vpath::parent(&path))?;
        let mut nodes = self.write_nodes()?;
        if !nodes.contains_key(&path) {
            info!(room = %path, "seeded room");
            nodes.insert(path, system_node(EntryKind::Room));
        }
        Ok(())
    }

    fn read_nodes(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<String, Node>>, RemoteError> {
        self.nodes
            .read()
            .map_err(|_| RemoteError::Unavailable("directory store poisoned".to_string()))
    }

    fn write_nodes(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, BTreeMap<String, Node>>, RemoteError> {
        self.nodes
            .write()
            .map_err(|_| RemoteError::Unavailable("directory store poisoned".to_string()))
    }

    fn user_for(&self, credential: &Credential) -> Result<String, RemoteError> {
        self.users
            .get(credential)
            .map(|name| name.value().clone())
            .ok_or_else(|| RemoteError::Rejected("unknown credential".to_string()))
    }

    fn create_node(
        &self,
        path: &str,
        kind: EntryKind,
        credential: &Credential,
    ) -> Result<Status, RemoteError> {
        let owner_name = self.user_for(credential)?;
        let path = vpath::normalize(path);
        let Some(name) = vpath::file_name(&path) else {
            return Ok(Status::failed("cannot create the root directory"));
        };
        if name.starts_with('.') {
            return Ok(Status::failed(format!("invalid name: {}", name)));
        }

        let parent = vpath::parent(&path);
        let mut nodes = self.write_nodes()?;
        match nodes.get(&parent) {
            Some(node) if node.kind == EntryKind::Directory => {}
            Some(_) => return Ok(Status::failed(format!("{} is not a directory", parent))),
            None => return Ok(Status::failed(format!("no such directory: {}", parent))),
        }
        if nodes.contains_key(&path) {
            return Ok(Status::failed(format!("{} already exists", path)));
        }

        let now = Utc::now();
        nodes.insert(
            path.clone(),
            Node {
                kind,
                owner_name,
                owner_token: Some(credential.clone()),
                modified_at: now,
            },
        );
        if let Some(parent_node) = nodes.get_mut(&parent) {
            parent_node.modified_at = now;
        }
        debug!(path = %path, ?kind, "created node");
        Ok(Status::ok())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn system_node(kind: EntryKind) -> Node {
    Node {
        kind,
        owner_name: SYSTEM_OWNER.to_string(),
        owner_token: None,
        modified_at: Utc::now(),
    }
}

fn entry(name: &str, node: &Node) -> DirectoryEntry {
    DirectoryEntry {
        name: name.to_string(),
        owner_name: node.owner_name.clone(),
        kind: node.kind,
        modified_at: Some(node.modified_at),
    }
}

fn is_child_of(path: &str, dir: &str) -> bool {
    path != dir && vpath::parent(path) == dir
}

#[async_trait]
impl DirectoryService for MemoryBackend {
    async fn list_entries(&self, path: &str) -> Result<Vec<DirectoryEntry>, RemoteError> {
        let path = vpath::normalize(path);
        let nodes = self.read_nodes()?;
        let node = nodes
            .get(&path)
            .ok_or_else(|| RemoteError::NotFound(path.clone()))?;

        if node.kind != EntryKind::Directory {
            let name = vpath::file_name(&path).unwrap_or(vpath::ROOT);
            return Ok(vec![entry(name, node)]);
        }

        Ok(nodes
            .iter()
            .filter(|(child, _)| is_child_of(child, &path))
            .filter_map(|(child, node)| {
                let name = vpath::file_name(child)?;
                (!name.starts_with('.')).then(|| entry(name, node))
            })
            .collect())
    }

    async fn create_room(&self, path: &str, credential: &Credential) -> Result<Status, RemoteError> {
        self.create_node(path, EntryKind::Room, credential)
    }

    async fn create_directory(
        &self,
        path: &str,
        credential: &Credential,
    ) -> Result<Status, RemoteError> {
        self.create_node(path, EntryKind::Directory, credential)
    }

    async fn path_exists(&self, path: &str) -> Result<bool, RemoteError> {
        let path = vpath::normalize(path);
        let nodes = self.read_nodes()?;
        Ok(nodes
            .get(&path)
            .is_some_and(|node| node.kind == EntryKind::Directory))
    }

    async fn delete_path(&self, path: &str, credential: &Credential) -> Result<Status, RemoteError> {
        self.user_for(credential)?;
        let path = vpath::normalize(path);
        if path == vpath::ROOT {
            return Ok(Status::failed("cannot remove the root directory"));
        }

        let mut nodes = self.write_nodes()?;
        let Some(node) = nodes.get(&path) else {
            return Err(RemoteError::NotFound(path));
        };
        if node.owner_token.as_ref() != Some(credential) {
            return Ok(Status::failed(format!("permission denied: {}", path)));
        }
        if node.kind == EntryKind::Directory && nodes.keys().any(|k| is_child_of(k, &path)) {
            return Ok(Status::failed(format!("directory not empty: {}", path)));
        }

        nodes.remove(&path);
        self.messages.remove(&path);
        if let Some(parent) = nodes.get_mut(&vpath::parent(&path)) {
            parent.modified_at = Utc::now();
        }
        info!(path = %path, "deleted node");
        Ok(Status::ok())
    }
}

#[async_trait]
impl MessagingService for MemoryBackend {
    async fn list_messages(
        &self,
        room_path: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, RemoteError> {
        let room_path = vpath::normalize(room_path);
        match self.read_nodes()?.get(&room_path) {
            Some(node) if node.kind == EntryKind::Room => {}
            _ => return Err(RemoteError::NotFound(room_path)),
        }

        Ok(self
            .messages
            .get(&room_path)
            .map(|history| {
                let skip = history.len().saturating_sub(limit);
                history.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default())
    }

    async fn append_message(
        &self,
        text: &str,
        room_path: &str,
        credential: &Credential,
    ) -> Result<Status, RemoteError> {
        let author_name = self.user_for(credential)?;
        let room_path = vpath::normalize(room_path);
        {
            let mut nodes = self.write_nodes()?;
            match nodes.get_mut(&room_path) {
                Some(node) if node.kind == EntryKind::Room => node.modified_at = Utc::now(),
                Some(_) => return Ok(Status::failed(format!("{} is not a room", room_path))),
                None => return Err(RemoteError::NotFound(room_path)),
            }
        }

        let mut history = self.messages.entry(room_path).or_default();
        let mut created_at = Utc::now();
        if let Some(last) = history.back() {
            if created_at <= last.created_at {
                created_at = last.created_at + ChronoDuration::milliseconds(1);
            }
        }
        history.push_back(ChatMessage {
            author_name,
            text: text.to_string(),
            created_at,
        });
        while history.len() > ROOM_HISTORY_CAP {
            history.pop_front();
        }
        Ok(Status::ok())
    }
}
