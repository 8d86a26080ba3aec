//! SSH connection handler

use std::sync::{Arc, Mutex};

use anyhow::Result;
use russh::server::{self, Msg, Session};
use russh::{Channel, ChannelId, Pty};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::surface::ChannelSurface;
use crate::ansi::EscapeParser;
use crate::keys::SurfaceEvent;
use crate::session::SessionController;
use crate::state::SharedState;
use crate::surface::Surface;

/// Per-connection SSH handler
pub struct SshHandler {
    pub state: Arc<SharedState>,
    /// SSH user name, set once authenticated
    pub user: Option<String>,
    pub term_size: Arc<Mutex<(u16, u16)>>,
    parser: EscapeParser,
    /// Key stream into the running controller
    events: Option<mpsc::UnboundedSender<SurfaceEvent>>,
}

impl SshHandler {
    pub fn new(state: Arc<SharedState>) -> Self {
        Self {
            state,
            user: None,
            term_size: Arc::new(Mutex::new((80, 24))),
            parser: EscapeParser::new(),
            events: None,
        }
    }

    fn set_size(&self, cols: u32, rows: u32) {
        if let Ok(mut size) = self.term_size.lock() {
            *size = (
                cols.clamp(1, u16::MAX as u32) as u16,
                rows.clamp(1, u16::MAX as u32) as u16,
            );
        }
    }

    fn send_event(&self, event: SurfaceEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

fn reject() -> server::Auth {
    server::Auth::Reject {
        proceed_with_methods: None,
        partial_success: false,
    }
}

impl server::Handler for SshHandler {
    type Error = anyhow::Error;

    async fn auth_publickey_offered(
        &mut self,
        _user: &str,
        _key: &russh::keys::PublicKey,
    ) -> Result<server::Auth, Self::Error> {
        Ok(server::Auth::Accept)
    }

    async fn auth_publickey(
        &mut self,
        user: &str,
        _key: &russh::keys::PublicKey,
    ) -> Result<server::Auth, Self::Error> {
        if user.is_empty() {
            return Ok(reject());
        }
        info!(user, "authenticated");
        self.user = Some(user.to_string());
        Ok(server::Auth::Accept)
    }

    async fn auth_none(&mut self, user: &str) -> Result<server::Auth, Self::Error> {
        if self.state.config.allow_anonymous && !user.is_empty() {
            info!(user, "anonymous login");
            self.user = Some(user.to_string());
            Ok(server::Auth::Accept)
        } else {
            Ok(reject())
        }
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        info!(channel_id = ?channel.id(), "session channel opened");
        Ok(true)
    }

    async fn pty_request(
        &mut self,
        _channel: ChannelId,
        _term: &str,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _modes: &[(Pty, u32)],
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.set_size(col_width, row_height);
        Ok(())
    }

    async fn shell_request(
        &mut self,
        channel: ChannelId,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        let Some(user) = self.user.clone() else {
            warn!("shell requested before authentication");
            return Ok(());
        };
        if self.events.is_some() {
            warn!(user = %user, "second shell on one connection ignored");
            return Ok(());
        }

        let surface = Arc::new(ChannelSurface::spawn(
            session.handle(),
            channel,
            self.term_size.clone(),
        ));
        let controller = SessionController::new(
            user.clone(),
            self.state.credential_for(&user),
            self.state.services(),
            surface.clone(),
            self.state.settings.clone(),
        );

        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        tokio::spawn(async move {
            let final_state = controller.run(rx).await;
            info!(user = %final_state.user_name, path = %final_state.current_path, "session finished");
            surface.close();
        });
        Ok(())
    }

    async fn data(
        &mut self,
        _channel: ChannelId,
        data: &[u8],
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        for key in self.parser.feed_all(data) {
            self.send_event(key.into());
        }
        Ok(())
    }

    async fn window_change_request(
        &mut self,
        _channel: ChannelId,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.set_size(col_width, row_height);
        self.send_event(SurfaceEvent::Resize);
        Ok(())
    }

    async fn channel_eof(
        &mut self,
        _channel: ChannelId,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        // dropping the sender ends the controller's input
        self.events = None;
        Ok(())
    }
}
