//! Lexical path normalization.

use std::path::PathBuf;

/// Returns the shortest path equivalent to `path` by purely lexical
/// processing: repeated separators and `.` elements are dropped, and `..`
/// consumes the preceding element. `..` at the root stays at the root.
/// An empty result becomes `.`.
#[must_use]
pub fn clean_path(path: &str) -> PathBuf {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|p| *p != "..") {
                    let _ = parts.pop();
                } else if !rooted {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if rooted {
        PathBuf::from(format!("/{joined}"))
    } else if joined.is_empty() {
        PathBuf::from(".")
    } else {
        PathBuf::from(joined)
    }
}
