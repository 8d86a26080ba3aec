//! Command-mode dispatch
//!
//! A line is split on whitespace; the first word selects an entry in
//! [`COMMANDS`] and the rest are positional arguments (no quoting). Handlers
//! never touch session state: they get a [`CommandContext`] snapshot and
//! return a [`CommandOutcome`] that the controller applies.

mod handlers;

use std::time::Duration;

use futures::future::{self, BoxFuture, FutureExt};
use tracing::instrument;

use crate::remote::{Credential, Services};

pub(crate) use handlers::resolve_arg;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Pwd,
    Ls,
    Cd,
    Touch,
    Mkdir,
    Rm,
    Cat,
    Echo,
    Grep,
    Vim,
    Whoami,
    Help,
    Clear,
    Exit,
}

/// One row of the dispatch table
#[derive(Debug)]
pub struct CommandSpec {
    pub name: &'static str,
    pub usage: &'static str,
    pub summary: &'static str,
    pub command: Command,
}

/// Static list of commands
pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "pwd",
        usage: "pwd",
        summary: "Print the current directory",
        command: Command::Pwd,
    },
    CommandSpec {
        name: "ls",
        usage: "ls [path]",
        summary: "List rooms and directories",
        command: Command::Ls,
    },
    CommandSpec {
        name: "cd",
        usage: "cd <path>",
        summary: "Change directory",
        command: Command::Cd,
    },
    CommandSpec {
        name: "touch",
        usage: "touch <room>...",
        summary: "Create rooms",
        command: Command::Touch,
    },
    CommandSpec {
        name: "mkdir",
        usage: "mkdir <dir>...",
        summary: "Create directories",
        command: Command::Mkdir,
    },
    CommandSpec {
        name: "rm",
        usage: "rm <path>...",
        summary: "Remove rooms or empty directories you own",
        command: Command::Rm,
    },
    CommandSpec {
        name: "cat",
        usage: "cat <room>...",
        summary: "Print recent messages of a room",
        command: Command::Cat,
    },
    CommandSpec {
        name: "echo",
        usage: "echo <text...> <room>",
        summary: "Post a message to a room without entering it",
        command: Command::Echo,
    },
    CommandSpec {
        name: "grep",
        usage: "grep <pattern...> <room>",
        summary: "Show recent messages containing a pattern",
        command: Command::Grep,
    },
    CommandSpec {
        name: "vim",
        usage: "vim <room>",
        summary: "Enter chat mode in a room",
        command: Command::Vim,
    },
    CommandSpec {
        name: "whoami",
        usage: "whoami",
        summary: "Print your user name",
        command: Command::Whoami,
    },
    CommandSpec {
        name: "help",
        usage: "help",
        summary: "Show this help",
        command: Command::Help,
    },
    CommandSpec {
        name: "clear",
        usage: "clear",
        summary: "Clear the screen",
        command: Command::Clear,
    },
    CommandSpec {
        name: "exit",
        usage: "exit",
        summary: "Disconnect",
        command: Command::Exit,
    },
    CommandSpec {
        name: "quit",
        usage: "quit",
        summary: "Disconnect",
        command: Command::Exit,
    },
];

pub fn lookup(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.name == name)
}

/// Everything a handler may read, cloned from the session
#[derive(Clone)]
pub struct CommandContext {
    pub cwd: String,
    pub home: String,
    pub user: String,
    pub credential: Credential,
    pub services: Services,
    pub request_timeout: Duration,
    /// Messages `cat` prints and `grep` searches per room
    pub history_limit: usize,
    /// Surface width for formatting
    pub cols: u16,
}

/// State change requested by a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    ChangeDirectory(String),
    EnterChat(String),
    Clear,
    Quit,
    /// Replace the chars from `start` to the cursor with `text`
    Complete { start: usize, text: String },
}

/// Lines to print plus an effect to apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub lines: Vec<String>,
    pub effect: Effect,
}

impl CommandOutcome {
    pub fn empty() -> Self {
        Self {
            lines: Vec::new(),
            effect: Effect::None,
        }
    }

    pub fn line(text: impl Into<String>) -> Self {
        Self::lines(vec![text.into()])
    }

    pub fn lines(lines: Vec<String>) -> Self {
        Self {
            lines,
            effect: Effect::None,
        }
    }

    pub fn effect(effect: Effect) -> Self {
        Self {
            lines: Vec::new(),
            effect,
        }
    }
}

impl Default for CommandOutcome {
    fn default() -> Self {
        Self::empty()
    }
}

/// Parse `line` and start the matching handler
pub fn execute(line: &str, ctx: CommandContext) -> BoxFuture<'static, CommandOutcome> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return future::ready(CommandOutcome::empty()).boxed();
    };
    let args: Vec<String> = words.map(str::to_string).collect();

    match lookup(name) {
        Some(spec) => dispatch(spec.command, args, ctx).boxed(),
        None => future::ready(CommandOutcome::line(format!("command not found: {}", name))).boxed(),
    }
}

#[instrument(name = "cmd.dispatch", skip(args, ctx), fields(cwd = %ctx.cwd, argc = args.len()))]
async fn dispatch(command: Command, args: Vec<String>, ctx: CommandContext) -> CommandOutcome {
    match command {
        Command::Pwd => CommandOutcome::line(ctx.cwd.clone()),
        Command::Ls => handlers::ls(&ctx, &args).await,
        Command::Cd => handlers::cd(&ctx, &args).await,
        Command::Touch => handlers::touch(&ctx, &args).await,
        Command::Mkdir => handlers::mkdir(&ctx, &args).await,
        Command::Rm => handlers::rm(&ctx, &args).await,
        Command::Cat => handlers::cat(&ctx, &args).await,
        Command::Echo => handlers::echo(&ctx, &args).await,
        Command::Grep => handlers::grep(&ctx, &args).await,
        Command::Vim => handlers::vim(&ctx, &args).await,
        Command::Whoami => CommandOutcome::line(ctx.user.clone()),
        Command::Help => CommandOutcome::lines(help_lines()),
        Command::Clear => CommandOutcome::effect(Effect::Clear),
        Command::Exit => CommandOutcome {
            lines: vec!["Goodbye!".to_string()],
            effect: Effect::Quit,
        },
    }
}

fn help_lines() -> Vec<String> {
    let mut lines = vec!["Commands:".to_string()];
    lines.extend(
        COMMANDS
            .iter()
            .map(|spec| format!("  {:<25} {}", spec.usage, spec.summary)),
    );
    lines.push(String::new());
    lines.push("Arguments are split on whitespace; quoting is not supported.".to_string());
    lines
}

#[cfg(test)]
mod tests;
