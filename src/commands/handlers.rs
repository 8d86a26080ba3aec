//! Command implementations

use tracing::{debug, info};

use super::{CommandContext, CommandOutcome, Effect};
use crate::chat::{render, ChatEntry};
use crate::remote::{with_timeout, DirectoryEntry, EntryKind, RemoteError, Status};
use crate::styles;
use crate::vpath;

/// Resolve a user-supplied path, expanding a leading `~` to home
pub(crate) fn resolve_arg(ctx: &CommandContext, target: &str) -> String {
    if target == "~" {
        return ctx.home.clone();
    }
    match target.strip_prefix("~/") {
        Some(rest) => vpath::resolve(&ctx.home, rest),
        None => vpath::resolve(&ctx.cwd, target),
    }
}

pub(super) async fn ls(ctx: &CommandContext, args: &[String]) -> CommandOutcome {
    let path = match args.first() {
        Some(target) => resolve_arg(ctx, target),
        None => ctx.cwd.clone(),
    };
    let listing = with_timeout(
        ctx.request_timeout,
        ctx.services.directory.list_entries(&path),
    )
    .await;

    match listing {
        Ok(entries) if entries.is_empty() => CommandOutcome::line(styles::dim("(no entries)")),
        Ok(entries) => CommandOutcome::lines(format_listing(&entries)),
        Err(RemoteError::NotFound(_)) => {
            CommandOutcome::line(styles::error(&format!("ls: no such path: {}", path)))
        }
        Err(e) => CommandOutcome::line(styles::error(&format!("ls: {}", e))),
    }
}

fn format_listing(entries: &[DirectoryEntry]) -> Vec<String> {
    let owner_width = entries
        .iter()
        .map(|e| e.owner_name.chars().count())
        .max()
        .unwrap_or(0);

    entries
        .iter()
        .map(|entry| {
            let modified = entry
                .modified_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".repeat(16));
            let name = format!("{}{}", entry.name, entry.kind.suffix());
            let name = match entry.kind {
                EntryKind::Directory => styles::directory(&name),
                EntryKind::Room => styles::room(&name),
                EntryKind::Unknown => name,
            };
            format!(
                "{}  {:<width$}  {}  {}",
                entry.kind.label(),
                entry.owner_name,
                styles::dim(&modified),
                name,
                width = owner_width
            )
        })
        .collect()
}

pub(super) async fn cd(ctx: &CommandContext, args: &[String]) -> CommandOutcome {
    let Some(target) = args.first() else {
        return CommandOutcome::line(styles::error("cd: missing operand"));
    };
    let path = resolve_arg(ctx, target);

    let exists = with_timeout(
        ctx.request_timeout,
        ctx.services.directory.path_exists(&path),
    )
    .await;
    match exists {
        Ok(true) => {
            debug!(from = %ctx.cwd, to = %path, "changing directory");
            CommandOutcome::effect(Effect::ChangeDirectory(path))
        }
        Ok(false) | Err(RemoteError::NotFound(_)) => {
            CommandOutcome::line(styles::error(&format!("cd: no such directory: {}", target)))
        }
        Err(e) => CommandOutcome::line(styles::error(&format!("cd: {}", e))),
    }
}

pub(super) async fn touch(ctx: &CommandContext, args: &[String]) -> CommandOutcome {
    create_each(ctx, args, "touch", Creating::Room).await
}

pub(super) async fn mkdir(ctx: &CommandContext, args: &[String]) -> CommandOutcome {
    create_each(ctx, args, "mkdir", Creating::Directory).await
}

#[derive(Clone, Copy)]
enum Creating {
    Room,
    Directory,
}

async fn create_each(
    ctx: &CommandContext,
    args: &[String],
    command: &str,
    what: Creating,
) -> CommandOutcome {
    if args.is_empty() {
        return CommandOutcome::line(styles::error(&format!("{}: missing operand", command)));
    }

    let mut lines = Vec::with_capacity(args.len());
    for name in args {
        let path = resolve_arg(ctx, name);
        let directory = &ctx.services.directory;
        let result = match what {
            Creating::Room => {
                with_timeout(
                    ctx.request_timeout,
                    directory.create_room(&path, &ctx.credential),
                )
                .await
            }
            Creating::Directory => {
                with_timeout(
                    ctx.request_timeout,
                    directory.create_directory(&path, &ctx.credential),
                )
                .await
            }
        };
        lines.push(match (result, what) {
            (Ok(status), Creating::Room) if status.ok => {
                info!(path = %path, user = %ctx.user, "room created");
                format!("Room created: {}", path)
            }
            (Ok(status), Creating::Directory) if status.ok => {
                info!(path = %path, user = %ctx.user, "directory created");
                format!("Directory created: {}", path)
            }
            (result, _) => failure_line(command, name, result),
        });
    }
    CommandOutcome::lines(lines)
}

fn failure_line(command: &str, name: &str, result: Result<Status, RemoteError>) -> String {
    let reason = match result {
        Ok(status) if status.message.is_empty() => "request failed".to_string(),
        Ok(status) => status.message,
        Err(e) => e.to_string(),
    };
    styles::error(&format!("{}: {}: {}", command, name, reason))
}

pub(super) async fn rm(ctx: &CommandContext, args: &[String]) -> CommandOutcome {
    if args.is_empty() {
        return CommandOutcome::line(styles::error("rm: missing operand"));
    }

    let mut lines = Vec::with_capacity(args.len());
    for name in args {
        let path = resolve_arg(ctx, name);
        if path == ctx.cwd || ctx.cwd.starts_with(&format!("{}/", path)) {
            lines.push(styles::error(&format!(
                "rm: {}: cannot remove the current directory",
                name
            )));
            continue;
        }
        let result = with_timeout(
            ctx.request_timeout,
            ctx.services.directory.delete_path(&path, &ctx.credential),
        )
        .await;
        lines.push(match result {
            Ok(status) if status.ok => {
                info!(path = %path, user = %ctx.user, "removed");
                format!("Removed: {}", path)
            }
            result => failure_line("rm", name, result),
        });
    }
    CommandOutcome::lines(lines)
}

pub(super) async fn cat(ctx: &CommandContext, args: &[String]) -> CommandOutcome {
    if args.is_empty() {
        return CommandOutcome::line(styles::error("cat: missing operand"));
    }

    let mut lines = Vec::new();
    for name in args {
        let path = resolve_arg(ctx, name);
        let result = with_timeout(
            ctx.request_timeout,
            ctx.services.messaging.list_messages(&path, ctx.history_limit),
        )
        .await;
        match result {
            Ok(messages) if messages.is_empty() => {
                lines.push(styles::dim("No previous messages in this room."));
            }
            Ok(messages) => lines.extend(messages.into_iter().map(|message| {
                render::message_line(&ChatEntry::remote(message), &ctx.user, ctx.cols as usize)
            })),
            Err(RemoteError::NotFound(_)) => {
                lines.push(styles::error(&format!("cat: {}: no such room", name)));
            }
            Err(e) => lines.push(styles::error(&format!("cat: {}: {}", name, e))),
        }
    }
    CommandOutcome::lines(lines)
}

/// Split `<words...> <room>`: everything before the last argument is one text
fn text_and_room(args: &[String]) -> Option<(String, &String)> {
    let (room, words) = args.split_last()?;
    (!words.is_empty()).then(|| (words.join(" "), room))
}

pub(super) async fn echo(ctx: &CommandContext, args: &[String]) -> CommandOutcome {
    let Some((text, name)) = text_and_room(args) else {
        return CommandOutcome::line(styles::error("echo: missing operand"));
    };
    let path = resolve_arg(ctx, name);

    let result = with_timeout(
        ctx.request_timeout,
        ctx.services
            .messaging
            .append_message(&text, &path, &ctx.credential),
    )
    .await;
    match result {
        Ok(status) if status.ok => {
            info!(room = %path, user = %ctx.user, "message posted");
            CommandOutcome::line(format!("Text written to {}", path))
        }
        result => CommandOutcome::line(failure_line("echo", name, result)),
    }
}

pub(super) async fn grep(ctx: &CommandContext, args: &[String]) -> CommandOutcome {
    let Some((pattern, name)) = text_and_room(args) else {
        return CommandOutcome::line(styles::error("grep: missing operand"));
    };
    let path = resolve_arg(ctx, name);

    let result = with_timeout(
        ctx.request_timeout,
        ctx.services.messaging.list_messages(&path, ctx.history_limit),
    )
    .await;
    let messages = match result {
        Ok(messages) => messages,
        Err(RemoteError::NotFound(_)) => {
            return CommandOutcome::line(styles::error(&format!("grep: {}: no such room", name)))
        }
        Err(e) => return CommandOutcome::line(styles::error(&format!("grep: {}: {}", name, e))),
    };

    let needle = pattern.to_lowercase();
    let lines: Vec<String> = messages
        .into_iter()
        .filter(|message| message.text.to_lowercase().contains(&needle))
        .map(|message| {
            render::message_line(&ChatEntry::remote(message), &ctx.user, ctx.cols as usize)
        })
        .collect();
    debug!(room = %path, pattern = %pattern, matches = lines.len(), "grep");
    CommandOutcome::lines(lines)
}

pub(super) async fn vim(ctx: &CommandContext, args: &[String]) -> CommandOutcome {
    let Some(name) = args.first() else {
        return CommandOutcome::line(styles::error("vim: missing operand"));
    };
    let path = resolve_arg(ctx, name);
    let Some(leaf) = vpath::file_name(&path) else {
        return CommandOutcome::line(styles::error(&format!("vim: {}: is a directory", name)));
    };

    let parent = vpath::parent(&path);
    let listing = with_timeout(
        ctx.request_timeout,
        ctx.services.directory.list_entries(&parent),
    )
    .await;
    let entries = match listing {
        Ok(entries) => entries,
        Err(RemoteError::NotFound(_)) => {
            return CommandOutcome::line(styles::error(&format!("vim: {}: no such room", name)))
        }
        Err(e) => return CommandOutcome::line(styles::error(&format!("vim: {}", e))),
    };

    match entries.iter().find(|e| e.name == leaf).map(|e| e.kind) {
        Some(EntryKind::Room) => CommandOutcome::effect(Effect::EnterChat(path)),
        Some(EntryKind::Directory) => {
            CommandOutcome::line(styles::error(&format!("vim: {}: is a directory", name)))
        }
        Some(EntryKind::Unknown) => {
            CommandOutcome::line(styles::error(&format!("vim: {}: not a room", name)))
        }
        None => CommandOutcome::line(styles::error(&format!("vim: {}: no such room", name))),
    }
}
