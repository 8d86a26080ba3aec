//! Chat mode: one live session bound to a room
//!
//! A [`ChatSession`] owns its buffer and pending input line. While it runs,
//! a spawned poller fetches recent messages on an interval and sends are
//! fired off as independent tasks; both report back over a channel so all
//! buffer mutation happens on the session's own task.

mod buffer;
pub mod render;

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backoff::PollBackoff;
use crate::keys::{Key, KeyEvent, SurfaceEvent};
use crate::remote::{with_timeout, ChatMessage, Credential, RemoteError, Services};
use crate::styles::{self, ctrl};
use crate::surface::SharedSurface;

pub use buffer::{Author, ChatBuffer, ChatEntry};

/// Tunables for a chat session
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub poll_interval: Duration,
    pub poll_backoff_max: Duration,
    /// Messages fetched once on entry
    pub history_limit: usize,
    /// Messages fetched per poll
    pub poll_limit: usize,
    pub buffer_capacity: usize,
    pub request_timeout: Duration,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            poll_backoff_max: Duration::from_secs(30),
            history_limit: 50,
            poll_limit: 10,
            buffer_capacity: 100,
            request_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    Starting,
    Active,
    Exiting,
    Stopped,
}

/// How a chat session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatExit {
    /// The user pressed Ctrl+C
    Interrupted,
    /// The key stream closed underneath the session
    Detached,
}

/// What a key press asks the session loop to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    Ignored,
    Redraw,
    /// Echoed locally; deliver this text
    Send(String),
    Exit,
}

/// Reports from the poller and send tasks
#[derive(Debug)]
enum ChatEvent {
    Polled(Vec<ChatMessage>),
    SendFailed { text: String, reason: String },
}

pub struct ChatSession {
    room: String,
    user: String,
    credential: Credential,
    services: Services,
    surface: SharedSurface,
    settings: ChatSettings,
    phase: ChatPhase,
    buffer: ChatBuffer,
    pending: String,
    /// Newest timestamp seen from the service
    latest_remote: Option<DateTime<Utc>>,
    /// Texts echoed locally that the service has not handed back yet
    pending_echoes: VecDeque<String>,
    liveness: CancellationToken,
}

impl ChatSession {
    pub fn new(
        room: String,
        user: String,
        credential: Credential,
        services: Services,
        surface: SharedSurface,
        settings: ChatSettings,
    ) -> Self {
        let buffer = ChatBuffer::new(settings.buffer_capacity);
        Self {
            room,
            user,
            credential,
            services,
            surface,
            settings,
            phase: ChatPhase::Starting,
            buffer,
            pending: String::new(),
            latest_remote: None,
            pending_echoes: VecDeque::new(),
            liveness: CancellationToken::new(),
        }
    }

    /// Whether a surface of this size can hold the chat layout
    pub fn fits(size: (u16, u16)) -> bool {
        size.1 >= render::MIN_ROWS
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn phase(&self) -> ChatPhase {
        self.phase
    }

    pub fn buffer(&self) -> &ChatBuffer {
        &self.buffer
    }

    pub fn pending_input(&self) -> &str {
        &self.pending
    }

    /// Draw the header and load history; never fails
    pub async fn start(&mut self) {
        self.phase = ChatPhase::Starting;
        let (cols, _) = self.surface.size();
        self.surface.write(&render::header(&self.room, cols));

        let fetch = self
            .services
            .messaging
            .list_messages(&self.room, self.settings.history_limit);
        match with_timeout(self.settings.request_timeout, fetch).await {
            Ok(messages) if messages.is_empty() => {
                self.buffer
                    .push(ChatEntry::system("No previous messages in this room."));
            }
            Ok(messages) => {
                self.latest_remote = messages.iter().map(|m| m.created_at).max();
                for message in messages {
                    self.buffer.push(ChatEntry::remote(message));
                }
            }
            Err(e) => {
                warn!(room = %self.room, error = %e, "history fetch failed");
                self.buffer
                    .push(ChatEntry::system(format!("Error loading past messages: {}", e)));
            }
        }

        self.phase = ChatPhase::Active;
        self.redraw_all();
    }

    pub fn handle_key(&mut self, event: KeyEvent) -> KeyOutcome {
        if self.phase != ChatPhase::Active {
            return KeyOutcome::Ignored;
        }
        if event.is_interrupt() {
            self.phase = ChatPhase::Exiting;
            return KeyOutcome::Exit;
        }
        if let Some(c) = event.printable() {
            self.pending.push(c);
            return KeyOutcome::Redraw;
        }
        match event.key {
            Key::Enter if event.modifiers.is_empty() => self.submit(),
            Key::Backspace => {
                if self.pending.pop().is_some() {
                    KeyOutcome::Redraw
                } else {
                    KeyOutcome::Ignored
                }
            }
            _ => KeyOutcome::Ignored,
        }
    }

    fn submit(&mut self) -> KeyOutcome {
        let text = self.pending.trim().to_string();
        if text.is_empty() {
            return KeyOutcome::Ignored;
        }
        self.pending.clear();
        self.buffer.push(ChatEntry::local(&self.user, text.clone()));
        self.pending_echoes.push_back(text.clone());
        // a poll returns at most poll_limit messages, so older echoes cannot come back
        while self.pending_echoes.len() > self.settings.poll_limit {
            self.pending_echoes.pop_front();
        }
        KeyOutcome::Send(text)
    }

    /// Merge polled messages; returns how many were appended
    pub fn absorb_poll(&mut self, messages: Vec<ChatMessage>) -> usize {
        let mut appended = 0;
        for message in messages {
            if self
                .latest_remote
                .is_some_and(|latest| message.created_at <= latest)
            {
                continue;
            }
            self.latest_remote = Some(message.created_at);

            if message.author_name == self.user {
                if let Some(idx) = self.pending_echoes.iter().position(|t| *t == message.text) {
                    self.pending_echoes.remove(idx);
                    continue;
                }
            }
            self.buffer.push(ChatEntry::remote(message));
            appended += 1;
        }
        appended
    }

    /// Record a failed send. The local echo stays on screen but is no longer
    /// expected back from the service.
    pub fn report_send_failure(&mut self, text: &str, reason: &str) {
        if let Some(idx) = self.pending_echoes.iter().position(|t| t == text) {
            self.pending_echoes.remove(idx);
        }
        self.buffer
            .push(ChatEntry::system(format!("Failed to send message: {}", reason)));
    }

    fn redraw_all(&self) {
        self.surface.write(&render::full(
            &self.room,
            &self.buffer,
            &self.user,
            &self.pending,
            self.surface.size(),
        ));
    }

    fn redraw(&self) {
        let (cols, rows) = self.surface.size();
        let mut out = render::messages(&self.buffer, &self.user, cols, rows);
        out.push_str(&render::input(&self.user, &self.pending, cols, rows));
        self.surface.write(&out);
    }

    /// Run until Ctrl+C or until the key stream closes
    pub async fn run(mut self, mut keys: mpsc::UnboundedReceiver<SurfaceEvent>) -> ChatExit {
        info!(room = %self.room, user = %self.user, "entering chat");
        self.start().await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let poller = tokio::spawn(poll_loop(
            self.services.clone(),
            self.room.clone(),
            self.settings.clone(),
            tx.clone(),
            self.liveness.clone(),
        ));

        let exit = loop {
            tokio::select! {
                event = keys.recv() => match event {
                    None => break ChatExit::Detached,
                    Some(SurfaceEvent::Resize) => self.redraw_all(),
                    Some(SurfaceEvent::Key(key)) => match self.handle_key(key) {
                        KeyOutcome::Exit => break ChatExit::Interrupted,
                        KeyOutcome::Send(text) => {
                            self.redraw();
                            self.spawn_send(text, tx.clone());
                        }
                        KeyOutcome::Redraw => self.redraw(),
                        KeyOutcome::Ignored => {}
                    },
                },
                Some(event) = rx.recv() => match event {
                    ChatEvent::Polled(messages) => {
                        if self.absorb_poll(messages) > 0 {
                            self.redraw();
                        }
                    }
                    ChatEvent::SendFailed { text, reason } => {
                        self.report_send_failure(&text, &reason);
                        self.redraw();
                    }
                },
            }
        };

        self.stop(poller, exit).await;
        exit
    }

    fn spawn_send(&self, text: String, tx: mpsc::UnboundedSender<ChatEvent>) {
        let services = self.services.clone();
        let room = self.room.clone();
        let credential = self.credential.clone();
        let limit = self.settings.request_timeout;
        tokio::spawn(async move {
            let result = with_timeout(
                limit,
                services.messaging.append_message(&text, &room, &credential),
            )
            .await;
            let failure = match result {
                Ok(status) if status.ok => None,
                Ok(status) => Some(status.message),
                Err(e) => Some(e.to_string()),
            };
            if let Some(reason) = failure {
                warn!(room = %room, reason = %reason, "send failed");
                let _ = tx.send(ChatEvent::SendFailed { text, reason });
            }
        });
    }

    async fn stop(&mut self, poller: JoinHandle<()>, exit: ChatExit) {
        self.phase = ChatPhase::Exiting;
        self.liveness.cancel();
        if let Err(e) = poller.await {
            debug!(error = %e, "poller ended abnormally");
        }
        if exit == ChatExit::Interrupted {
            self.surface.write(&format!(
                "{}{}{}",
                ctrl::clear_screen(),
                styles::banner("Exited chat mode"),
                ctrl::CRLF
            ));
        }
        self.phase = ChatPhase::Stopped;
        info!(room = %self.room, ?exit, "left chat");
    }
}

/// Fetch recent messages until cancelled; failures only stretch the delay
async fn poll_loop(
    services: Services,
    room: String,
    settings: ChatSettings,
    tx: mpsc::UnboundedSender<ChatEvent>,
    liveness: CancellationToken,
) {
    let mut backoff = PollBackoff::new(settings.poll_interval, settings.poll_backoff_max);
    let mut delay = settings.poll_interval;
    loop {
        tokio::select! {
            _ = liveness.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
        if liveness.is_cancelled() {
            return;
        }

        let fetch = services.messaging.list_messages(&room, settings.poll_limit);
        let result: Result<Vec<ChatMessage>, RemoteError> =
            with_timeout(settings.request_timeout, fetch).await;
        if liveness.is_cancelled() {
            return;
        }
        delay = match result {
            Ok(messages) => {
                if tx.send(ChatEvent::Polled(messages)).is_err() {
                    return;
                }
                backoff.succeeded()
            }
            Err(e) => {
                let next = backoff.failed();
                debug!(room = %room, error = %e, failures = backoff.failures(), ?next, "poll failed");
                next
            }
        };
    }
}
