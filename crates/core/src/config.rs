//! Capacity and encoding configuration.
//!
//! The defaults describe a 240-byte tag area split into fifteen 16-byte
//! blocks, with `|` separating field values.

use crate::error::{Error, Result};
use serde::Deserialize;

/// Default bytes per block.
pub const DEFAULT_BLOCK_SIZE: usize = 16;

/// Default total payload budget across all blocks.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 240;

/// Default field delimiter.
pub const DEFAULT_DELIMITER: u8 = b'|';

/// How `encode` cuts a payload that exceeds the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Truncation {
    /// Cut at exactly `max_payload_bytes`, even inside a multi-byte character.
    #[default]
    Byte,
    /// Back off to the last complete UTF-8 character.
    CharBoundary,
}

/// What the writer does with blocks past the end of the current record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResiduePolicy {
    /// Leave them untouched. Residue from an older, longer record stays readable.
    Preserve,
    /// Write one zero block after the data when the data ends on a block boundary.
    #[default]
    Terminate,
    /// Zero every unused block up to `max_block_count`.
    Scrub,
}

/// Complete tag layout configuration.
///
/// When deserialized without `max_block_count`, the count is derived from
/// `block_size` and `max_payload_bytes` as in [`TagConfig::with_capacity`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "TagTable")]
pub struct TagConfig {
    /// Bytes per block
    pub block_size: usize,

    /// Total bytes storable across all blocks
    pub max_payload_bytes: usize,

    /// Number of addressable blocks (0..max_block_count)
    pub max_block_count: usize,

    /// Byte separating consecutive field values
    pub delimiter: u8,

    /// Truncation mode for oversized records
    pub truncation: Truncation,

    /// Handling of blocks beyond the record's end
    pub residue: ResiduePolicy,
}

impl TagConfig {
    /// Build a config for the given block size and budget, deriving the block count.
    pub fn with_capacity(block_size: usize, max_payload_bytes: usize) -> Self {
        Self {
            block_size,
            max_payload_bytes,
            max_block_count: block_count_for(max_payload_bytes, block_size),
            ..Self::default()
        }
    }

    /// Check that the layout can be addressed with one-byte indices and lengths.
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 || self.block_size > u8::MAX as usize {
            return Err(Error::Config(format!(
                "block_size must be in 1..=255, got {}",
                self.block_size
            )));
        }
        if self.max_block_count > u8::MAX as usize + 1 {
            return Err(Error::Config(format!(
                "max_block_count must be at most 256, got {}",
                self.max_block_count
            )));
        }
        if self.max_block_count * self.block_size < self.max_payload_bytes {
            return Err(Error::Config(format!(
                "{} blocks of {} bytes cannot hold {} bytes",
                self.max_block_count, self.block_size, self.max_payload_bytes
            )));
        }
        if self.delimiter == 0 {
            return Err(Error::Config(
                "delimiter 0x00 is reserved as the end-of-data marker".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            max_block_count: block_count_for(DEFAULT_MAX_PAYLOAD_BYTES, DEFAULT_BLOCK_SIZE),
            delimiter: DEFAULT_DELIMITER,
            truncation: Truncation::default(),
            residue: ResiduePolicy::default(),
        }
    }
}

/// `[tag]` table as written; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TagTable {
    block_size: Option<usize>,
    max_payload_bytes: Option<usize>,
    max_block_count: Option<usize>,
    delimiter: Option<u8>,
    truncation: Truncation,
    residue: ResiduePolicy,
}

impl From<TagTable> for TagConfig {
    fn from(table: TagTable) -> Self {
        let block_size = table.block_size.unwrap_or(DEFAULT_BLOCK_SIZE);
        let max_payload_bytes = table.max_payload_bytes.unwrap_or(DEFAULT_MAX_PAYLOAD_BYTES);
        Self {
            block_size,
            max_payload_bytes,
            max_block_count: table
                .max_block_count
                .unwrap_or_else(|| block_count_for(max_payload_bytes, block_size)),
            delimiter: table.delimiter.unwrap_or(DEFAULT_DELIMITER),
            truncation: table.truncation,
            residue: table.residue,
        }
    }
}

/// `ceil(bytes / block_size)`; zero when `block_size` is zero.
pub fn block_count_for(bytes: usize, block_size: usize) -> usize {
    if block_size == 0 {
        return 0;
    }
    bytes.div_ceil(block_size)
}
