//! Validation for file names decoded from the entry table
//!
//! Names are written to `outpath/<name>` by the extractor, so a name must
//! stay a single path component: no separators, no NUL, not `.` or `..`.

use crate::error::{GogglesError, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Width of the on-disk filename field
pub const FILENAME_LEN: usize = 64;

/// Characters that would let a name escape the output directory
const DISALLOWED: &str = r"[/\\\x00]";

fn disallowed() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(DISALLOWED).expect("static pattern compiles"))
}

/// Strip the trailing NUL/space padding from a raw filename field
pub fn trim_padding(raw: &[u8]) -> &[u8] {
    let end = raw
        .iter()
        .rposition(|&b| b != 0 && b != b' ')
        .map_or(0, |i| i + 1);
    &raw[..end]
}

/// Decode and validate a filename field
///
/// # Errors
///
/// Returns `InvalidName` if the trimmed name is empty, not UTF-8, contains a
/// path separator or NUL, or is a dot entry.
pub fn decode_filename(file_index: u32, raw: &[u8; FILENAME_LEN]) -> Result<String> {
    let invalid = |reason: String| GogglesError::InvalidName { file_index, reason };

    let trimmed = trim_padding(raw);
    if trimmed.is_empty() {
        return Err(invalid("name is empty".to_string()));
    }

    let name = std::str::from_utf8(trimmed)
        .map_err(|e| invalid(format!("name is not valid UTF-8: {}", e)))?;

    if let Some(m) = disallowed().find(name) {
        return Err(invalid(format!(
            "name '{}' contains disallowed character {:?}",
            name.escape_debug(),
            m.as_str()
        )));
    }

    if name == "." || name == ".." {
        return Err(invalid(format!("name '{}' is a dot entry", name)));
    }

    Ok(name.to_string())
}

/// Pad a name into a filename field
///
/// Names longer than the field are truncated.
pub fn encode_filename(name: &str) -> [u8; FILENAME_LEN] {
    let mut field = [0u8; FILENAME_LEN];
    let len = name.len().min(FILENAME_LEN);
    field[..len].copy_from_slice(&name.as_bytes()[..len]);
    field
}
