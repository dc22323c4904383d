use crate::core::header::{Layer, Magic};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GogglesError {
    #[error("Truncated input at offset {offset}: needed {needed} bytes, {available} available")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Header mismatch in {layer}: expected {expected}, found {found}")]
    HeaderMismatch {
        layer: Layer,
        expected: Magic,
        found: Magic,
    },

    #[error("Offset {offset} is out of range for a {len}-byte container")]
    OutOfRange { offset: u64, len: usize },

    #[error("Invalid file name in entry {file_index}: {reason}")]
    InvalidName { file_index: u32, reason: String },

    #[error("Entry {file_index} references missing offset slot {slot}")]
    DanglingOffset { file_index: u32, slot: u32 },

    #[error("Duplicate file name '{name}' in entry {file_index}")]
    DuplicateName { file_index: u32, name: String },

    #[error("Entry {file_index} is a parent of {children} entries but declares {declared}")]
    ChildCountMismatch {
        file_index: u32,
        declared: u64,
        children: usize,
    },

    #[error("No save file matches '{0}'")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GogglesError {
    /// Whether the error only invalidates a single file-table entry
    pub fn is_per_entry(&self) -> bool {
        matches!(
            self,
            GogglesError::InvalidName { .. }
                | GogglesError::DanglingOffset { .. }
                | GogglesError::DuplicateName { .. }
                | GogglesError::ChildCountMismatch { .. }
        )
    }

    /// The header layer that failed, if any
    pub fn layer(&self) -> Option<Layer> {
        match self {
            GogglesError::HeaderMismatch { layer, .. } => Some(*layer),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, GogglesError>;
