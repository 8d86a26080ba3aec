//! Where chatsh keeps its files
//!
//! XDG base directories, each overridable by an explicit env var:
//!
//! | file | override | default |
//! |------|----------|---------|
//! | config | `CHATSH_CONFIG` | `$XDG_CONFIG_HOME/chatsh/chatsh.toml` |
//! | SSH host key | `CHATSH_HOST_KEY` | `$XDG_DATA_HOME/chatsh/host_key` |
//!
//! Without the XDG vars the usual `~/.config` and `~/.local/share` apply.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

const APP_DIR: &str = "chatsh";

/// `$<xdg_var>/chatsh`, else `$HOME/<home_fallback>/chatsh`, else `.`
fn xdg_dir(xdg_var: &str, home_fallback: &str) -> PathBuf {
    if let Some(base) = env::var_os(xdg_var).filter(|v| !v.is_empty()) {
        return PathBuf::from(base).join(APP_DIR);
    }
    match env::var_os("HOME") {
        Some(home) => Path::new(&home).join(home_fallback).join(APP_DIR),
        None => PathBuf::from("."),
    }
}

/// An explicit file override, else `default`
fn overridable(var: &str, default: impl FnOnce() -> PathBuf) -> PathBuf {
    env::var_os(var).map(PathBuf::from).unwrap_or_else(default)
}

pub fn data_dir() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", ".local/share")
}

pub fn config_dir() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config")
}

pub fn config_path() -> PathBuf {
    overridable("CHATSH_CONFIG", || config_dir().join("chatsh.toml"))
}

pub fn host_key_path() -> PathBuf {
    overridable("CHATSH_HOST_KEY", || data_dir().join("host_key"))
}

/// Create the directory a generated host key will be written to
pub fn ensure_key_dir() -> Result<()> {
    let key_path = host_key_path();
    let Some(dir) = key_path.parent().filter(|d| !d.as_os_str().is_empty()) else {
        return Ok(());
    };
    if !dir.exists() {
        debug!(dir = %dir.display(), "creating key directory");
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create key directory: {}", dir.display()))?;
    }
    Ok(())
}

pub fn log_paths() {
    info!(config = %config_path().display(), host_key = %host_key_path().display(), "paths");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // env is process-global
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const VARS: [&str; 5] = [
        "CHATSH_CONFIG",
        "CHATSH_HOST_KEY",
        "XDG_DATA_HOME",
        "XDG_CONFIG_HOME",
        "HOME",
    ];

    /// Run `f` with exactly `vars` set among the path-related env vars
    fn with_env(vars: &[(&str, &str)], f: impl FnOnce()) {
        let _lock = ENV_LOCK.lock().unwrap();
        let saved: Vec<_> = VARS.iter().map(|v| (*v, env::var_os(v))).collect();
        for var in VARS {
            env::remove_var(var);
        }
        for (var, value) in vars {
            env::set_var(var, value);
        }
        f();
        for (var, value) in saved {
            match value {
                Some(value) => env::set_var(var, value),
                None => env::remove_var(var),
            }
        }
    }

    #[test]
    fn test_explicit_overrides_win() {
        with_env(
            &[
                ("CHATSH_CONFIG", "/etc/chatsh.toml"),
                ("CHATSH_HOST_KEY", "/var/lib/chatsh/key"),
                ("XDG_CONFIG_HOME", "/xdg/config"),
            ],
            || {
                assert_eq!(config_path(), PathBuf::from("/etc/chatsh.toml"));
                assert_eq!(host_key_path(), PathBuf::from("/var/lib/chatsh/key"));
            },
        );
    }

    #[test]
    fn test_xdg_dirs() {
        with_env(
            &[("XDG_DATA_HOME", "/xdg/data"), ("XDG_CONFIG_HOME", "/xdg/config")],
            || {
                assert_eq!(host_key_path(), PathBuf::from("/xdg/data/chatsh/host_key"));
                assert_eq!(config_path(), PathBuf::from("/xdg/config/chatsh/chatsh.toml"));
            },
        );
    }

    #[test]
    fn test_home_fallback() {
        with_env(&[("HOME", "/home/erin"), ("XDG_DATA_HOME", "")], || {
            assert_eq!(config_dir(), PathBuf::from("/home/erin/.config/chatsh"));
            assert_eq!(data_dir(), PathBuf::from("/home/erin/.local/share/chatsh"));
        });
    }
}
