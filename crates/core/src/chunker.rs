//! Block partitioning.
//!
//! A payload is split into fixed-size blocks addressed from 0 with no gaps:
//!
//! ```text
//! payload:  | b0 ............ | b1 ............ | b2 ..     |
//! blocks:   [0: 16 bytes    ] [1: 16 bytes    ] [2: 16 bytes, zero padded]
//! ```
//!
//! The last block is padded with 0x00. Joining blocks concatenates them in
//! the order given; deciding which blocks to fetch is the reader's job.

use crate::error::{Error, Result};

/// Padding byte for the final block.
pub const PAD_BYTE: u8 = 0x00;

/// One addressed block of exactly `block_size` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Block address (0-based)
    pub index: usize,

    /// Block contents
    pub bytes: Vec<u8>,
}

impl Block {
    /// Create a new block.
    pub fn new(index: usize, bytes: Vec<u8>) -> Self {
        Self { index, bytes }
    }

    /// An all-zero block.
    pub fn zeroed(index: usize, block_size: usize) -> Self {
        Self {
            index,
            bytes: vec![PAD_BYTE; block_size],
        }
    }
}

/// Split a payload into `ceil(len / block_size)` zero-padded blocks.
///
/// # Errors
/// Returns `Error::Config` if `block_size` is zero.
pub fn split(payload: &[u8], block_size: usize) -> Result<Vec<Block>> {
    if block_size == 0 {
        return Err(Error::Config("block_size must be non-zero".to_string()));
    }

    let blocks = payload
        .chunks(block_size)
        .enumerate()
        .map(|(index, chunk)| {
            let mut bytes = Vec::with_capacity(block_size);
            bytes.extend_from_slice(chunk);
            bytes.resize(block_size, PAD_BYTE);
            Block::new(index, bytes)
        })
        .collect();

    Ok(blocks)
}

/// Concatenate block contents in the order received.
pub fn join<B: AsRef<[u8]>>(blocks: &[B]) -> Vec<u8> {
    let total_size: usize = blocks.iter().map(|b| b.as_ref().len()).sum();
    let mut payload = Vec::with_capacity(total_size);

    for block in blocks {
        payload.extend_from_slice(block.as_ref());
    }

    payload
}
