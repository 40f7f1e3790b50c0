//! Storage key helpers shared by every root.

use crate::error::{StorageError, StorageResult};
use std::path::{Component, Path};

/// Normalize a client-supplied relative path into a storage key.
///
/// Backslashes become `/`, leading separators and empty or `.` segments are dropped.
/// Any `..` segment is rejected. An empty result is returned as an empty string and
/// denotes the root itself.
pub fn normalize_key(raw: &str) -> StorageResult<String> {
    let replaced = raw.replace('\\', "/");
    let mut segments = Vec::new();
    for segment in replaced.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(StorageError::InvalidKey(format!(
                    "Path traversal is not allowed: {}",
                    raw
                )))
            }
            s => segments.push(s),
        }
    }
    Ok(segments.join("/"))
}

/// Convert a path relative to a root into a posix-style key.
pub fn to_key(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Join a URL prefix and a key with exactly one `/` between them.
pub fn join_url(base_url: &str, key: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        key.trim_start_matches('/')
    )
}

/// Split a key into (parent directory key, file name). The parent is empty for top-level keys.
pub fn split_key(key: &str) -> (&str, &str) {
    match key.rfind('/') {
        Some(idx) => (&key[..idx], &key[idx + 1..]),
        None => ("", key),
    }
}

/// Join a directory key and a file name.
pub fn child_key(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}
