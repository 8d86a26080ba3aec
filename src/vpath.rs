//! Virtual path resolution
//!
//! Paths in the chat hierarchy are absolute, `/`-separated strings. These
//! helpers never touch the network; handlers reject empty targets before
//! calling [`resolve`].

/// Path separator and root
pub const ROOT: &str = "/";

/// Resolve `target` against `current`.
///
/// Absolute targets replace `current`; anything else is joined onto it.
/// The result is normalized: repeated separators collapse, `.` segments
/// vanish and `..` pops one segment (never above root).
pub fn resolve(current: &str, target: &str) -> String {
    if target.starts_with('/') {
        normalize(target)
    } else {
        normalize(&format!("{}/{}", current, target))
    }
}

/// Normalize an absolute path
pub fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        ROOT.to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Parent directory of a normalized path (`/` is its own parent)
pub fn parent(path: &str) -> String {
    resolve(path, "..")
}

/// Last segment of a normalized path, None for root
pub fn file_name(path: &str) -> Option<&str> {
    path.rsplit('/').next().filter(|s| !s.is_empty())
}

/// Join a child name onto a directory without a doubled separator at root
pub fn join(dir: &str, name: &str) -> String {
    if dir == ROOT {
        format!("/{}", name)
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), name)
    }
}
