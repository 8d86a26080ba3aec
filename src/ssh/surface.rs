//! Terminal surface over an SSH channel

use std::sync::{Arc, Mutex};

use russh::server::Handle;
use russh::{ChannelId, CryptoVec};
use tokio::sync::mpsc;
use tracing::debug;

use crate::surface::Surface;

enum Outgoing {
    Data(String),
    Close,
}

/// Writes go through a channel to a task that owns the russh handle, so
/// `write` never blocks the caller
pub struct ChannelSurface {
    tx: mpsc::UnboundedSender<Outgoing>,
    size: Arc<Mutex<(u16, u16)>>,
}

impl ChannelSurface {
    /// Spawn the writer task for `channel`
    pub fn spawn(handle: Handle, channel: ChannelId, size: Arc<Mutex<(u16, u16)>>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(writer_task(handle, channel, rx));
        Self { tx, size }
    }
}

impl Surface for ChannelSurface {
    fn write(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        let _ = self.tx.send(Outgoing::Data(text.to_string()));
    }

    fn size(&self) -> (u16, u16) {
        self.size.lock().map(|size| *size).unwrap_or((80, 24))
    }

    fn close(&self) {
        let _ = self.tx.send(Outgoing::Close);
    }
}

async fn writer_task(handle: Handle, channel: ChannelId, mut rx: mpsc::UnboundedReceiver<Outgoing>) {
    while let Some(message) = rx.recv().await {
        match message {
            Outgoing::Data(text) => {
                if handle
                    .data(channel, CryptoVec::from(text.as_bytes()))
                    .await
                    .is_err()
                {
                    debug!(?channel, "channel closed, stopping writer");
                    break;
                }
            }
            Outgoing::Close => {
                let _ = handle.eof(channel).await;
                let _ = handle.close(channel).await;
                break;
            }
        }
    }
}
