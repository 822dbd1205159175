//! Slash-separated path helpers.
//!
//! Vault-relative paths and link targets are handled as `/`-joined strings
//! so that output is identical across platforms.

use std::path::{Component, Path};

/// Render a relative path with `/` separators
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Join a folder and a relative path, either of which may be empty
pub fn join(folder: &str, rest: &str) -> String {
    match (folder.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (false, true) => folder.to_string(),
        (false, false) => format!("{}/{}", folder, rest),
    }
}

/// Resolve `.` and `..` segments and collapse repeated separators.
///
/// Returns `None` when the path climbs above its root.
pub fn lexical_resolve(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

/// Relative link from a file in `from_dir` to the root-relative `to`
pub fn relative_link(from_dir: &str, to: &str) -> String {
    let from: Vec<&str> = from_dir.split('/').filter(|s| !s.is_empty()).collect();
    let target: Vec<&str> = to.split('/').filter(|s| !s.is_empty()).collect();

    let common = from
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut out: Vec<&str> = std::iter::repeat("..").take(from.len() - common).collect();
    out.extend(&target[common..]);
    out.join("/")
}
