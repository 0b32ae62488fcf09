//! Discovery options

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Size of one device driver header; the default guess for where the hard
/// disk header sits when the floppy driver ends the chain
pub const DEFAULT_FALLBACK_OFFSET: u16 = 18;
pub const DEFAULT_MAX_CHAIN_LEN: usize = 64;

/// Tunables for the driver chain walk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryOptions {
    /// Bytes past the floppy header to try when the chain ends early
    pub fallback_offset: u16,
    /// Whether the early-termination fallback may be used at all
    pub allow_fallback: bool,
    /// Headers visited before the chain is considered corrupt
    pub max_chain_len: usize,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            fallback_offset: DEFAULT_FALLBACK_OFFSET,
            allow_fallback: true,
            max_chain_len: DEFAULT_MAX_CHAIN_LEN,
        }
    }
}

impl DiscoveryOptions {
    /// Reads options from a JSON file; missing fields keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)?;
        let options: Self = serde_json::from_str(&text)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.max_chain_len > 0,
            "max_chain_len must allow at least the NUL device header"
        );
        Ok(())
    }

    pub fn with_fallback_offset(mut self, offset: u16) -> Self {
        self.fallback_offset = offset;
        self
    }

    /// Refuses to guess the hard disk header position
    pub fn strict(mut self) -> Self {
        self.allow_fallback = false;
        self
    }

    pub fn with_max_chain_len(mut self, len: usize) -> Self {
        self.max_chain_len = len;
        self
    }
}
