//! Hashing and path helpers shared across vaultgraph crates.

use sha2::{Digest, Sha256};
use std::path::{Component, Path};

/// Length of the hex prefix used for stable identifiers
pub const ID_LEN: usize = 16;

/// Full SHA-256 hex digest of `text`
pub fn content_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}

/// Stable identifier: first [`ID_LEN`] hex chars of the SHA-256 of `text`
pub fn stable_id(text: &str) -> String {
    let mut hash = content_hash(text);
    hash.truncate(ID_LEN);
    hash
}

/// Render a relative path with `/` separators regardless of platform
pub fn to_slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Lexically normalize a `/`-separated path, folding `.` and `..` segments.
///
/// Returns `None` when `..` would climb above the root.
pub fn normalize_slash_path(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

/// Strip a trailing `.{extension}` (case-insensitive) from `path`
pub fn strip_extension<'a>(path: &'a str, extension: &str) -> &'a str {
    let suffix_len = extension.len() + 1;
    if path.len() > suffix_len && path.is_char_boundary(path.len() - suffix_len) {
        let (stem, suffix) = path.split_at(path.len() - suffix_len);
        if suffix.starts_with('.') && suffix[1..].eq_ignore_ascii_case(extension) {
            return stem;
        }
    }
    path
}
