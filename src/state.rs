//! Shared server state

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::remote::{Credential, MemoryBackend, Services};
use crate::session::SessionSettings;
use crate::vpath;

/// State shared by every SSH connection
pub struct SharedState {
    pub config: Config,
    pub settings: SessionSettings,
    pub backend: Arc<MemoryBackend>,
}

impl SharedState {
    /// Build the backend and seed the home directory and rooms
    pub fn new(config: Config) -> Result<Self> {
        let settings = config.session_settings();
        let backend = Arc::new(MemoryBackend::new());
        backend.ensure_directory_all(&settings.home)?;
        for room in &config.seed_rooms {
            backend.seed_room(&vpath::resolve(&settings.home, room))?;
        }
        info!(
            home = %settings.home,
            rooms = config.seed_rooms.len(),
            "backend seeded"
        );
        Ok(Self {
            config,
            settings,
            backend,
        })
    }

    pub fn services(&self) -> Services {
        Services::from_backend(self.backend.clone())
    }

    /// Credential for `user`: the configured token, else a fresh one
    pub fn credential_for(&self, user: &str) -> Credential {
        let credential = match self.config.tokens.get(user) {
            Some(token) => Credential::new(token.clone()),
            None => Credential::new(Uuid::new_v4().to_string()),
        };
        self.backend.register(&credential, user);
        credential
    }
}
