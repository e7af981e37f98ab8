//! Compiler identification from the `.comment` section.
//!
//! Toolchains drop NUL-terminated identification strings into
//! `.comment`. Strings starting with `$` are RCS-style version markers,
//! not toolchain identities, so detection skips them. This is advisory
//! metadata: an absent or empty section yields `"Unknown"`, never a
//! parse failure.

use serde::Serialize;

/// Identity reported when no usable comment string exists.
pub const UNKNOWN_COMPILER: &str = "Unknown";

const VERSION_MARKER_SIGIL: char = '$';

/// Detected toolchain identity plus the raw comment strings behind it.
#[derive(Debug, Clone, Serialize)]
pub struct CompilerInfo {
    pub detected: String,
    pub comments: Vec<String>,
}

impl CompilerInfo {
    pub fn unknown() -> CompilerInfo {
        CompilerInfo {
            detected: UNKNOWN_COMPILER.to_string(),
            comments: Vec::new(),
        }
    }
}

/// Splits the section bytes on NUL terminators and applies the
/// detection heuristic: first string without the version-marker sigil,
/// falling back to the first string, falling back to `"Unknown"`.
pub fn parse_comments(bytes: &[u8]) -> CompilerInfo {
    let comments: Vec<String> = bytes
        .split(|&b| b == 0)
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect();

    let detected = comments
        .iter()
        .find(|comment| !comment.starts_with(VERSION_MARKER_SIGIL))
        .or_else(|| comments.first())
        .cloned()
        .unwrap_or_else(|| UNKNOWN_COMPILER.to_string());

    CompilerInfo { detected, comments }
}
