use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::remote::{Credential, DirectoryService, MemoryBackend, MessagingService, Services};
use crate::test_support::{self, FlakyDirectory};

fn context(backend: Arc<MemoryBackend>, credential: Credential, cwd: &str) -> CommandContext {
    CommandContext {
        cwd: cwd.to_string(),
        home: "/home".to_string(),
        user: "alice".to_string(),
        credential,
        services: Services::from_backend(backend),
        request_timeout: Duration::from_secs(10),
        history_limit: 50,
        cols: 80,
    }
}

async fn run(line: &str, ctx: &CommandContext) -> CommandOutcome {
    execute(line, ctx.clone()).await
}

#[test]
fn test_every_command_has_unique_name() {
    for (i, spec) in COMMANDS.iter().enumerate() {
        assert!(
            COMMANDS[i + 1..].iter().all(|other| other.name != spec.name),
            "duplicate {}",
            spec.name
        );
        assert!(lookup(spec.name).is_some());
    }
}

#[tokio::test]
async fn test_unknown_command() {
    let (backend, cred) = test_support::backend_with_dir("alice", "/home");
    let ctx = context(backend, cred, "/home");
    let outcome = run("frobnicate now", &ctx).await;
    assert_eq!(outcome.lines, vec!["command not found: frobnicate".to_string()]);
    assert_eq!(outcome.effect, Effect::None);
}

#[tokio::test]
async fn test_blank_line_does_nothing() {
    let (backend, cred) = test_support::backend_with_dir("alice", "/home");
    let ctx = context(backend, cred, "/home");
    assert_eq!(run("   ", &ctx).await, CommandOutcome::empty());
}

#[tokio::test]
async fn test_pwd_and_whoami() {
    let (backend, cred) = test_support::backend_with_dir("alice", "/home");
    let ctx = context(backend, cred, "/home");
    assert_eq!(run("pwd", &ctx).await.lines, vec!["/home".to_string()]);
    assert_eq!(run("whoami", &ctx).await.lines, vec!["alice".to_string()]);
}

#[tokio::test]
async fn test_mkdir_confirms_without_moving() {
    let (backend, cred) = test_support::backend_with_dir("alice", "/home");
    let ctx = context(backend.clone(), cred, "/home");

    let outcome = run("mkdir projects", &ctx).await;

    assert_eq!(
        outcome.lines,
        vec!["Directory created: /home/projects".to_string()]
    );
    assert_eq!(outcome.effect, Effect::None);
    assert!(backend.path_exists("/home/projects").await.unwrap());
}

#[tokio::test]
async fn test_touch_multiple_and_duplicate() {
    let (backend, cred) = test_support::backend_with_dir("alice", "/home");
    let ctx = context(backend, cred, "/home");

    let outcome = run("touch general random", &ctx).await;
    assert_eq!(
        outcome.lines,
        vec![
            "Room created: /home/general".to_string(),
            "Room created: /home/random".to_string()
        ]
    );

    let dup = run("touch general", &ctx).await;
    assert_eq!(dup.lines.len(), 1);
    assert!(dup.lines[0].contains("touch: general:"));
    assert!(dup.lines[0].contains("already exists"));
}

#[tokio::test]
async fn test_missing_operands() {
    let (backend, cred) = test_support::backend_with_dir("alice", "/home");
    let ctx = context(backend, cred, "/home");
    for (line, expected) in [
        ("cd", "cd: missing operand"),
        ("touch", "touch: missing operand"),
        ("mkdir", "mkdir: missing operand"),
        ("vim", "vim: missing operand"),
        ("rm", "rm: missing operand"),
        ("echo", "echo: missing operand"),
        ("echo general", "echo: missing operand"),
        ("grep", "grep: missing operand"),
    ] {
        let outcome = run(line, &ctx).await;
        assert!(outcome.lines[0].contains(expected), "{}", line);
        assert_eq!(outcome.effect, Effect::None);
    }
}

#[tokio::test]
async fn test_cd_parent_and_child() {
    let (backend, cred) = test_support::backend_with_dir("alice", "/home/projects");
    let ctx = context(backend, cred, "/home/projects");

    let up = run("cd ..", &ctx).await;
    assert_eq!(up.effect, Effect::ChangeDirectory("/home".to_string()));
    assert!(up.lines.is_empty());

    let ctx = CommandContext {
        cwd: "/home".to_string(),
        ..ctx
    };
    let down = run("cd projects", &ctx).await;
    assert_eq!(down.effect, Effect::ChangeDirectory("/home/projects".to_string()));

    let home = run("cd ~", &ctx).await;
    assert_eq!(home.effect, Effect::ChangeDirectory("/home".to_string()));
}

#[tokio::test]
async fn test_cd_errors_are_distinct() {
    let (backend, cred) = test_support::backend_with_dir("alice", "/home");
    backend.create_room("/home/general", &cred).await.unwrap();

    let flaky = Arc::new(FlakyDirectory::new(backend.clone()));
    let mut ctx = context(backend, cred, "/home");
    ctx.services.directory = flaky.clone();

    let missing = run("cd nowhere", &ctx).await;
    assert!(missing.lines[0].contains("cd: no such directory: nowhere"));

    let room = run("cd general", &ctx).await;
    assert!(room.lines[0].contains("cd: no such directory: general"));

    flaky.fail(true);
    let down = run("cd anywhere", &ctx).await;
    assert!(down.lines[0].contains("cd: service unavailable"));
    assert_eq!(down.effect, Effect::None);
}

#[tokio::test]
async fn test_ls_lists_with_suffixes() {
    let (backend, cred) = test_support::backend_with_dir("alice", "/home");
    let ctx = context(backend, cred, "/home");

    let empty = run("ls", &ctx).await;
    assert!(empty.lines[0].contains("(no entries)"));

    run("mkdir projects", &ctx).await;
    run("touch general", &ctx).await;
    let outcome = run("ls", &ctx).await;
    assert_eq!(outcome.lines.len(), 2);
    assert!(outcome.lines[0].starts_with("ROOM"));
    assert!(outcome.lines[0].contains("general#"));
    assert!(outcome.lines[1].starts_with("DIR"));
    assert!(outcome.lines[1].contains("projects/"));
    assert!(outcome.lines[1].contains("alice"));

    let by_path = run("ls /", &ctx).await;
    assert!(by_path.lines[0].contains("home/"));
}

#[tokio::test]
async fn test_ls_service_error() {
    let (backend, cred) = test_support::backend_with_dir("alice", "/home");
    let flaky = Arc::new(FlakyDirectory::new(backend.clone()));
    flaky.fail(true);
    let mut ctx = context(backend, cred, "/home");
    ctx.services.directory = flaky;

    let outcome = run("ls", &ctx).await;
    assert!(outcome.lines[0].contains("ls: service unavailable"));
}

#[tokio::test]
async fn test_vim_enters_existing_room_only() {
    let (backend, cred) = test_support::backend_with_dir("alice", "/home/projects");
    backend.create_room("/home/general", &cred).await.unwrap();
    let ctx = context(backend, cred, "/home");

    let ok = run("vim general", &ctx).await;
    assert_eq!(ok.effect, Effect::EnterChat("/home/general".to_string()));

    let dir = run("vim projects", &ctx).await;
    assert!(dir.lines[0].contains("is a directory"));
    assert_eq!(dir.effect, Effect::None);

    let missing = run("vim nope", &ctx).await;
    assert!(missing.lines[0].contains("no such room"));

    let bad_parent = run("vim /missing/room", &ctx).await;
    assert!(bad_parent.lines[0].contains("no such room"));
}

#[tokio::test]
async fn test_rm_checks_ownership() {
    let (backend, alice) = test_support::backend_with_dir("alice", "/home");
    let bob = Credential::new("bob-token");
    backend.register(&bob, "bob");
    backend.create_room("/home/bobs", &bob).await.unwrap();
    backend.create_room("/home/mine", &alice).await.unwrap();
    let ctx = context(backend.clone(), alice, "/home");

    let outcome = run("rm bobs mine", &ctx).await;
    assert!(outcome.lines[0].contains("rm: bobs: permission denied"));
    assert_eq!(outcome.lines[1], "Removed: /home/mine");

    let cwd = run("rm .", &ctx).await;
    assert!(cwd.lines[0].contains("cannot remove the current directory"));
}

#[tokio::test]
async fn test_cat_prints_messages() {
    let (backend, cred) = test_support::backend_with_room("alice", "/home/general").await;
    let ctx = context(backend.clone(), cred.clone(), "/home");

    let empty = run("cat general", &ctx).await;
    assert!(empty.lines[0].contains("No previous messages"));

    backend
        .append_message("hello world", "/home/general", &cred)
        .await
        .unwrap();
    let outcome = run("cat general", &ctx).await;
    assert_eq!(outcome.lines.len(), 1);
    assert!(outcome.lines[0].contains("hello world"));

    let missing = run("cat nope", &ctx).await;
    assert!(missing.lines[0].contains("cat: nope: no such room"));
}

#[tokio::test]
async fn test_echo_posts_without_entering_chat() {
    let (backend, cred) = test_support::backend_with_room("alice", "/home/general").await;
    let ctx = context(backend.clone(), cred, "/home");

    let outcome = run("echo deploy is done general", &ctx).await;
    assert_eq!(outcome.lines, vec!["Text written to /home/general".to_string()]);
    assert_eq!(outcome.effect, Effect::None);

    let messages = backend.list_messages("/home/general", 10).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].text, "deploy is done");
    assert_eq!(messages[0].author_name, "alice");

    let missing = run("echo hi nope", &ctx).await;
    assert!(missing.lines[0].contains("echo: nope:"));
    let dir = run("echo hi .", &ctx).await;
    assert!(dir.lines[0].contains("not a room"));
}

#[tokio::test]
async fn test_grep_filters_recent_messages() {
    let (backend, cred) = test_support::backend_with_room("alice", "/home/general").await;
    let ctx = context(backend.clone(), cred.clone(), "/home");
    for text in ["Build is RED", "lunch?", "build is green again"] {
        backend.append_message(text, "/home/general", &cred).await.unwrap();
    }

    let outcome = run("grep build general", &ctx).await;
    assert_eq!(outcome.lines.len(), 2);
    assert!(outcome.lines[0].contains("Build is RED"));
    assert!(outcome.lines[1].contains("build is green again"));

    let phrase = run("grep is green general", &ctx).await;
    assert_eq!(phrase.lines.len(), 1);

    assert_eq!(run("grep dinner general", &ctx).await, CommandOutcome::empty());

    let missing = run("grep build nope", &ctx).await;
    assert!(missing.lines[0].contains("grep: nope: no such room"));
}

#[tokio::test]
async fn test_help_clear_exit() {
    let (backend, cred) = test_support::backend_with_dir("alice", "/home");
    let ctx = context(backend, cred, "/home");

    let help = run("help", &ctx).await;
    assert!(help.lines.iter().any(|l| l.contains("vim <room>")));

    assert_eq!(run("clear", &ctx).await.effect, Effect::Clear);
    assert_eq!(run("exit", &ctx).await.effect, Effect::Quit);
    assert_eq!(run("quit", &ctx).await.effect, Effect::Quit);
}

#[tokio::test(start_paused = true)]
async fn test_requests_time_out() {
    let (backend, cred) = test_support::backend_with_dir("alice", "/home");
    let gated = Arc::new(test_support::GatedDirectory::new(backend.clone()));
    let mut ctx = context(backend, cred, "/home");
    ctx.services.directory = gated;
    ctx.request_timeout = Duration::from_millis(200);

    let outcome = run("cd /home", &ctx).await;
    assert!(outcome.lines[0].contains("cd: request timed out after 200ms"));
}
