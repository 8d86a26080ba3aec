//! Tab completion for the command line
//!
//! The first word completes against the command table. Later words complete
//! as virtual paths by listing the directory typed so far; `cd` only offers
//! directories. A single match is inserted, several matches are listed and
//! their common prefix inserted.

use futures::future::{self, BoxFuture, FutureExt};

use crate::commands::{self, CommandContext, CommandOutcome, Effect, COMMANDS};
use crate::remote::{with_timeout, EntryKind};
use crate::styles;

/// The word under the cursor: its start (in chars) and its text
fn current_word(before_cursor: &str) -> (usize, &str) {
    let start_byte = before_cursor
        .rfind(char::is_whitespace)
        .map(|i| i + before_cursor[i..].chars().next().map_or(1, char::len_utf8))
        .unwrap_or(0);
    let word = &before_cursor[start_byte..];
    (before_cursor[..start_byte].chars().count(), word)
}

/// Complete the word ending at `cursor` (a char index into `line`)
pub fn complete(line: &str, cursor: usize, ctx: CommandContext) -> BoxFuture<'static, CommandOutcome> {
    let before_cursor: String = line.chars().take(cursor).collect();
    let (start, word) = current_word(&before_cursor);
    let word = word.to_string();

    let first_word = before_cursor.split_whitespace().next();
    let completing_command = before_cursor.trim_start().len() == word.len();
    if completing_command {
        let names: Vec<String> = COMMANDS
            .iter()
            .map(|spec| spec.name)
            .filter(|name| name.starts_with(word.as_str()))
            .map(|name| format!("{} ", name))
            .collect();
        return future::ready(outcome(start, &word, names)).boxed();
    }

    let directories_only = first_word == Some("cd");
    async move { complete_path(start, word, directories_only, ctx).await }.boxed()
}

async fn complete_path(
    start: usize,
    word: String,
    directories_only: bool,
    ctx: CommandContext,
) -> CommandOutcome {
    let (dir_part, prefix) = match word.rfind('/') {
        Some(idx) => word.split_at(idx + 1),
        None => ("", word.as_str()),
    };
    let dir = if dir_part.is_empty() {
        ctx.cwd.clone()
    } else {
        commands::resolve_arg(&ctx, dir_part)
    };

    let listing = with_timeout(ctx.request_timeout, ctx.services.directory.list_entries(&dir)).await;
    let Ok(entries) = listing else {
        return CommandOutcome::empty();
    };

    let candidates: Vec<String> = entries
        .iter()
        .filter(|e| e.name.starts_with(prefix))
        .filter(|e| !directories_only || e.kind == EntryKind::Directory)
        .map(|e| match e.kind {
            EntryKind::Directory => format!("{}{}/", dir_part, e.name),
            _ => format!("{}{} ", dir_part, e.name),
        })
        .collect();
    outcome(start, &word, candidates)
}

fn outcome(start: usize, word: &str, mut candidates: Vec<String>) -> CommandOutcome {
    match candidates.len() {
        0 => CommandOutcome::empty(),
        1 => {
            let text = candidates.remove(0);
            CommandOutcome::effect(Effect::Complete { start, text })
        }
        _ => {
            let common = common_prefix(&candidates);
            let listing = candidates
                .iter()
                .map(|c| c.trim_end())
                .collect::<Vec<_>>()
                .join("  ");
            let effect = if common.chars().count() > word.chars().count() {
                Effect::Complete {
                    start,
                    text: common,
                }
            } else {
                Effect::None
            };
            // leading blank line moves output below the input line
            CommandOutcome {
                lines: vec![String::new(), styles::dim(&listing)],
                effect,
            }
        }
    }
}

fn common_prefix(candidates: &[String]) -> String {
    let Some(first) = candidates.first() else {
        return String::new();
    };
    let mut len = first.len();
    for other in &candidates[1..] {
        len = first
            .char_indices()
            .zip(other.chars())
            .take_while(|((_, a), b)| a == b)
            .map(|((i, a), _)| i + a.len_utf8())
            .last()
            .unwrap_or(0)
            .min(len);
    }
    first[..len].to_string()
}
