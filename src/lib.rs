//! chatsh - terminal client for a remote hierarchical chat service
//!
//! The core is [`session::SessionController`]: it owns one terminal
//! surface, switches between command mode and chat mode, and talks to the
//! chat service through the traits in [`remote`]. The binary in `main.rs`
//! hosts controllers behind an SSH server with an in-memory backend.

pub mod ansi;
pub mod backoff;
pub mod chat;
pub mod commands;
pub mod completion;
pub mod config;
pub mod keys;
pub mod line_editor;
pub mod paths;
pub mod remote;
pub mod session;
pub mod ssh;
pub mod state;
pub mod styles;
pub mod surface;
pub mod vpath;

#[cfg(test)]
pub(crate) mod test_support;
