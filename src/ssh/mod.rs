//! SSH server hosting one chatsh session per shell channel

mod handler;
mod surface;

use std::net::SocketAddr;
use std::sync::Arc;

use russh::server;
use tracing::info;

use crate::state::SharedState;

pub use handler::SshHandler;
pub use surface::ChannelSurface;

/// SSH server implementation
#[derive(Clone)]
pub struct ChatshServer {
    pub state: Arc<SharedState>,
}

impl ChatshServer {
    pub fn new(state: Arc<SharedState>) -> Self {
        Self { state }
    }
}

impl server::Server for ChatshServer {
    type Handler = SshHandler;

    fn new_client(&mut self, peer_addr: Option<SocketAddr>) -> Self::Handler {
        info!(?peer_addr, "new connection");
        SshHandler::new(self.state.clone())
    }

    fn handle_session_error(&mut self, error: <Self::Handler as server::Handler>::Error) {
        tracing::error!("session error: {:?}", error);
    }
}
