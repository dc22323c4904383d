//! Decode policy configuration
//!
//! Options can come from a TOML file:
//!
//! ```toml
//! duplex_copy = "secondary"
//! strict_names = true
//! ```
//!
//! Missing keys fall back to the defaults (primary copy, lenient names).

use crate::error::Result;
use crate::header::DuplexCopy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Policy inputs for building a file index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecodeOptions {
    /// Duplex copy whose file table is read
    pub duplex_copy: DuplexCopy,

    /// Fail the whole decode on the first unusable entry instead of skipping it
    pub strict_names: bool,
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duplex_copy(mut self, copy: DuplexCopy) -> Self {
        self.duplex_copy = copy;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_names = strict;
        self
    }

    /// Parse options from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load options from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
