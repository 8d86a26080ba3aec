//! Per-terminal session controller
//!
//! Owns the session state and decides where each key goes. In command mode
//! keys feed the line editor and finished lines become command futures; in
//! chat mode every key is forwarded to the running [`ChatSession`] and the
//! command side does nothing until the chat task completes.

use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use crate::chat::{self, ChatExit, ChatSession, ChatSettings};
use crate::commands::{self, CommandContext, CommandOutcome, Effect};
use crate::completion;
use crate::keys::SurfaceEvent;
use crate::line_editor::{EditorAction, LineEditor};
use crate::remote::{Credential, Services};
use crate::styles::{self, ctrl};
use crate::surface::SharedSurface;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Command,
    Chat,
}

/// Navigation and identity of one terminal session
#[derive(Debug, Clone)]
pub struct SessionState {
    pub current_path: String,
    pub user_name: String,
    pub credential: Credential,
    pub mode: Mode,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Starting directory, also what `~` expands to
    pub home: String,
    pub request_timeout: Duration,
    pub chat: ChatSettings,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            home: "/home/chatsh".to_string(),
            request_timeout: Duration::from_secs(10),
            chat: ChatSettings::default(),
        }
    }
}

struct ActiveChat {
    room: String,
    keys: mpsc::UnboundedSender<SurfaceEvent>,
    handle: JoinHandle<ChatExit>,
}

pub struct SessionController {
    state: SessionState,
    settings: SessionSettings,
    services: Services,
    surface: SharedSurface,
    editor: LineEditor,
    /// In-flight command or completion; keys are dropped while set
    pending: Option<BoxFuture<'static, CommandOutcome>>,
    chat: Option<ActiveChat>,
    finished: bool,
}

impl SessionController {
    pub fn new(
        user_name: String,
        credential: Credential,
        services: Services,
        surface: SharedSurface,
        settings: SessionSettings,
    ) -> Self {
        Self {
            state: SessionState {
                current_path: settings.home.clone(),
                user_name,
                credential,
                mode: Mode::Command,
            },
            settings,
            services,
            surface,
            editor: LineEditor::new(),
            pending: None,
            chat: None,
            finished: false,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// A command or completion is still running
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// The session asked to end (exit, quit, Ctrl+D)
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn prompt(&self) -> String {
        format!("{}:{}$", self.state.user_name, self.state.current_path)
    }

    fn write_prompt(&self) {
        self.surface.write(&self.editor.render(&self.prompt()));
    }

    fn write_lines(&self, lines: &[String]) {
        let mut out = String::new();
        for line in lines {
            out.push_str(line);
            out.push_str(ctrl::CRLF);
        }
        self.surface.write(&out);
    }

    fn context(&self) -> CommandContext {
        CommandContext {
            cwd: self.state.current_path.clone(),
            home: self.settings.home.clone(),
            user: self.state.user_name.clone(),
            credential: self.state.credential.clone(),
            services: self.services.clone(),
            request_timeout: self.settings.request_timeout,
            history_limit: self.settings.chat.history_limit,
            cols: self.surface.size().0,
        }
    }

    /// Draw the welcome banner and the first prompt
    pub fn start(&self) {
        let (cols, _) = self.surface.size();
        let mut out = styles::boxed_header("chatsh", cols.min(60));
        out.push_str(ctrl::CRLF);
        out.push_str(&styles::dim(&format!(
            "Logged in as {}. Type 'help' for commands.",
            self.state.user_name
        )));
        out.push_str(ctrl::CRLF);
        self.surface.write(&out);
        self.write_prompt();
    }

    /// Route one surface event to the active mode
    pub fn handle_event(&mut self, event: SurfaceEvent) {
        if self.finished {
            return;
        }
        if self.state.mode == Mode::Chat {
            if let Some(chat) = &self.chat {
                if chat.keys.send(event).is_err() {
                    debug!(room = %chat.room, "chat gone, dropping event");
                }
            }
            return;
        }

        let SurfaceEvent::Key(key) = event else {
            if self.pending.is_none() {
                self.write_prompt();
            }
            return;
        };
        if self.pending.is_some() {
            debug!(?key, "command in flight, dropping key");
            return;
        }

        match self.editor.handle_key(key) {
            EditorAction::None => {}
            EditorAction::Redraw => self.write_prompt(),
            EditorAction::Execute(line) => {
                self.surface.write(ctrl::CRLF);
                if line.trim().is_empty() {
                    self.write_prompt();
                } else {
                    info!(user = %self.state.user_name, line = %line, "command");
                    self.pending = Some(commands::execute(&line, self.context()));
                }
            }
            EditorAction::Tab => {
                self.pending = Some(completion::complete(
                    self.editor.value(),
                    self.editor.cursor(),
                    self.context(),
                ));
            }
            EditorAction::ClearScreen => {
                self.surface.write(&ctrl::clear_screen());
                self.write_prompt();
            }
            EditorAction::Quit => self.finish(),
        }
    }

    fn finish(&mut self) {
        info!(user = %self.state.user_name, "session ending");
        self.finished = true;
        self.surface.close();
    }

    /// Apply what a finished command asked for
    fn apply(&mut self, outcome: CommandOutcome) {
        self.write_lines(&outcome.lines);
        match outcome.effect {
            Effect::None => {}
            Effect::ChangeDirectory(path) => {
                info!(from = %self.state.current_path, to = %path, "cd");
                self.state.current_path = path;
            }
            Effect::EnterChat(room) => self.enter_chat(room),
            Effect::Clear => self.surface.write(&ctrl::clear_screen()),
            Effect::Quit => self.finish(),
            Effect::Complete { start, text } => self.editor.replace_with_completion(start, &text),
        }
        if self.state.mode == Mode::Command && !self.finished {
            self.write_prompt();
        }
    }

    fn enter_chat(&mut self, room: String) {
        self.state.mode = Mode::Chat;
        let size = self.surface.size();
        if !ChatSession::fits(size) {
            warn!(room = %room, rows = size.1, "surface too small for chat");
            self.state.mode = Mode::Command;
            self.write_lines(&[styles::error(&format!(
                "vim: terminal too small for chat mode (need {} rows)",
                chat::render::MIN_ROWS
            ))]);
            return;
        }

        info!(room = %room, user = %self.state.user_name, "mode -> chat");
        let session = ChatSession::new(
            room.clone(),
            self.state.user_name.clone(),
            self.state.credential.clone(),
            self.services.clone(),
            self.surface.clone(),
            self.settings.chat.clone(),
        );
        let (keys, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(session.run(rx));
        self.chat = Some(ActiveChat { room, keys, handle });
    }

    fn finish_chat(&mut self, result: Result<ChatExit, JoinError>) {
        self.chat = None;
        self.state.mode = Mode::Command;
        match result {
            Ok(exit) => info!(?exit, "mode -> command"),
            Err(e) => {
                warn!(error = %e, "chat task failed");
                self.write_lines(&[styles::error(&format!("chat ended unexpectedly: {}", e))]);
            }
        }
        if !self.finished {
            self.write_prompt();
        }
    }

    /// Wait for the in-flight command, if any, and apply it
    pub async fn settle(&mut self) {
        if self.pending.is_some() {
            let outcome = next_outcome(&mut self.pending).await;
            self.apply(outcome);
        }
    }

    /// Wait for the running chat to end and restore command mode
    pub async fn wait_for_chat_exit(&mut self) -> Option<ChatExit> {
        self.chat.as_ref()?;
        let result = chat_exit(&mut self.chat).await;
        let exit = result.as_ref().ok().copied();
        self.finish_chat(result);
        exit
    }

    /// Drive the session until the surface closes or the user quits
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<SurfaceEvent>) -> SessionState {
        self.start();
        while !self.finished {
            tokio::select! {
                biased;
                outcome = next_outcome(&mut self.pending) => self.apply(outcome),
                result = chat_exit(&mut self.chat) => self.finish_chat(result),
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
            }
        }
        self.shutdown().await;
        self.state
    }

    async fn shutdown(&mut self) {
        if self.pending.is_some() {
            debug!("settling in-flight command before shutdown");
            let outcome = next_outcome(&mut self.pending).await;
            self.write_lines(&outcome.lines);
        }
        if let Some(chat) = self.chat.take() {
            let ActiveChat { room, keys, handle } = chat;
            drop(keys);
            match handle.await {
                Ok(exit) => debug!(room = %room, ?exit, "chat stopped"),
                Err(e) => warn!(room = %room, error = %e, "chat task failed"),
            }
            self.state.mode = Mode::Command;
        }
        info!(user = %self.state.user_name, path = %self.state.current_path, "session closed");
    }
}

async fn next_outcome(pending: &mut Option<BoxFuture<'static, CommandOutcome>>) -> CommandOutcome {
    let Some(fut) = pending.as_mut() else {
        return std::future::pending().await;
    };
    let outcome = fut.await;
    *pending = None;
    outcome
}

async fn chat_exit(chat: &mut Option<ActiveChat>) -> Result<ChatExit, JoinError> {
    let Some(active) = chat.as_mut() else {
        return std::future::pending().await;
    };
    let result = (&mut active.handle).await;
    *chat = None;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{Key, KeyEvent};
    use crate::remote::{DirectoryService, MemoryBackend, MessagingService};
    use crate::test_support::{self, GatedDirectory, RecordingSurface};
    use std::sync::Arc;

    fn controller(
        backend: Arc<MemoryBackend>,
        credential: Credential,
        surface: Arc<RecordingSurface>,
    ) -> SessionController {
        let settings = SessionSettings {
            home: "/home".to_string(),
            ..SessionSettings::default()
        };
        SessionController::new(
            "alice".to_string(),
            credential,
            Services::from_backend(backend),
            surface,
            settings,
        )
    }

    fn type_line(ctl: &mut SessionController, line: &str) {
        for c in line.chars() {
            ctl.handle_event(KeyEvent::char(c).into());
        }
        ctl.handle_event(KeyEvent::plain(Key::Enter).into());
    }

    async fn run_line(ctl: &mut SessionController, line: &str) {
        type_line(ctl, line);
        ctl.settle().await;
    }

    #[tokio::test]
    async fn test_start_shows_prompt() {
        let (backend, cred) = test_support::backend_with_dir("alice", "/home");
        let surface = RecordingSurface::new(80, 24);
        let ctl = controller(backend, cred, surface.clone());
        ctl.start();
        assert!(surface.contents().contains("alice:/home$"));
        assert!(surface.contents().contains("chatsh"));
    }

    #[tokio::test]
    async fn test_mkdir_keeps_path() {
        let (backend, cred) = test_support::backend_with_dir("alice", "/home");
        let surface = RecordingSurface::new(80, 24);
        let mut ctl = controller(backend.clone(), cred, surface.clone());

        run_line(&mut ctl, "mkdir projects").await;

        assert!(surface.contents().contains("Directory created: /home/projects"));
        assert_eq!(ctl.state().current_path, "/home");
        assert!(backend.path_exists("/home/projects").await.unwrap());
    }

    #[tokio::test]
    async fn test_cd_round_trip() {
        let (backend, cred) = test_support::backend_with_dir("alice", "/home/projects");
        let surface = RecordingSurface::new(80, 24);
        let mut ctl = controller(backend, cred, surface.clone());

        run_line(&mut ctl, "cd projects").await;
        assert_eq!(ctl.state().current_path, "/home/projects");
        assert!(surface.contents().contains("alice:/home/projects$"));

        run_line(&mut ctl, "cd ..").await;
        assert_eq!(ctl.state().current_path, "/home");

        run_line(&mut ctl, "cd nowhere").await;
        assert_eq!(ctl.state().current_path, "/home");
        assert!(surface.contents().contains("cd: no such directory: nowhere"));
    }

    #[tokio::test]
    async fn test_unknown_command_reprompts() {
        let (backend, cred) = test_support::backend_with_dir("alice", "/home");
        let surface = RecordingSurface::new(80, 24);
        let mut ctl = controller(backend, cred, surface.clone());

        run_line(&mut ctl, "frob").await;
        let out = surface.take();
        assert!(out.contains("command not found: frob"));
        assert!(out.contains("alice:/home$"));
        assert!(!ctl.is_finished());
    }

    #[tokio::test]
    async fn test_keys_dropped_while_command_in_flight() {
        let (backend, cred) = test_support::backend_with_dir("alice", "/home/projects");
        let gated = Arc::new(GatedDirectory::new(backend.clone()));
        let surface = RecordingSurface::new(80, 24);
        let mut ctl = SessionController::new(
            "alice".to_string(),
            cred,
            Services::new(gated.clone(), backend),
            surface,
            SessionSettings {
                home: "/home".to_string(),
                ..SessionSettings::default()
            },
        );

        type_line(&mut ctl, "cd projects");
        assert!(ctl.is_busy());

        type_line(&mut ctl, "cd /");
        assert_eq!(ctl.editor.value(), "");

        gated.release();
        ctl.settle().await;
        assert!(!ctl.is_busy());
        assert_eq!(ctl.state().current_path, "/home/projects");
    }

    #[tokio::test]
    async fn test_vim_and_ctrl_c_round_trip() {
        let (backend, cred) = test_support::backend_with_room("alice", "/home/general").await;
        let surface = RecordingSurface::new(80, 24);
        let mut ctl = controller(backend.clone(), cred, surface.clone());

        run_line(&mut ctl, "vim general").await;
        assert_eq!(ctl.state().mode, Mode::Chat);
        assert_eq!(
            ctl.chat.as_ref().map(|c| c.room.as_str()),
            Some("/home/general")
        );

        // command handling is inert while chatting
        type_line(&mut ctl, "mkdir leaked");
        assert!(!ctl.is_busy());

        ctl.handle_event(KeyEvent::ctrl('c').into());
        assert_eq!(ctl.wait_for_chat_exit().await, Some(ChatExit::Interrupted));

        assert_eq!(ctl.state().mode, Mode::Command);
        assert_eq!(ctl.state().current_path, "/home");
        assert!(!backend.path_exists("/home/leaked").await.unwrap());
        // the send task is independent of the chat task
        tokio::time::sleep(Duration::from_millis(20)).await;
        let sent = backend.list_messages("/home/general", 10).await.unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "mkdir leaked");
        assert!(surface.contents().contains("Exited chat mode"));
    }

    #[tokio::test]
    async fn test_chat_refused_on_tiny_surface() {
        let (backend, cred) = test_support::backend_with_room("alice", "/home/general").await;
        let surface = RecordingSurface::new(80, 4);
        let mut ctl = controller(backend, cred, surface.clone());

        run_line(&mut ctl, "vim general").await;

        assert_eq!(ctl.state().mode, Mode::Command);
        assert!(ctl.chat.is_none());
        assert!(surface.contents().contains("terminal too small"));
    }

    #[tokio::test]
    async fn test_exit_closes_surface() {
        let (backend, cred) = test_support::backend_with_dir("alice", "/home");
        let surface = RecordingSurface::new(80, 24);
        let mut ctl = controller(backend, cred, surface.clone());

        run_line(&mut ctl, "exit").await;
        assert!(ctl.is_finished());
        assert!(surface.is_closed());
    }

    #[tokio::test]
    async fn test_tab_completes_path() {
        let (backend, cred) = test_support::backend_with_dir("alice", "/home/projects");
        let surface = RecordingSurface::new(80, 24);
        let mut ctl = controller(backend, cred, surface);

        for c in "cd pro".chars() {
            ctl.handle_event(KeyEvent::char(c).into());
        }
        ctl.handle_event(KeyEvent::plain(Key::Tab).into());
        ctl.settle().await;
        assert_eq!(ctl.editor.value(), "cd projects/");
    }

    #[tokio::test]
    async fn test_run_returns_state_when_input_ends() {
        let (backend, cred) = test_support::backend_with_room("alice", "/home/general").await;
        let surface = RecordingSurface::new(80, 24);
        let ctl = controller(backend, cred, surface);
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(ctl.run(rx));

        for c in "vim general\r".chars() {
            let event = if c == '\r' {
                KeyEvent::plain(Key::Enter)
            } else {
                KeyEvent::char(c)
            };
            tx.send(event.into()).unwrap();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(tx);

        let state = handle.await.unwrap();
        assert_eq!(state.mode, Mode::Command);
        assert_eq!(state.current_path, "/home");
    }
}
