//! Block command frames and status words.
//!
//! Blocks are written and read with short command frames addressed to the
//! reader itself (class 0xFF):
//!
//! ```text
//! write:  | FF | D6 | 00 | index | Lc | data (Lc bytes) |
//! read:   | FF | B0 | 00 | index | Le |
//! ```
//!
//! A response is the returned data followed by a two-byte status word:
//!
//! ```text
//! | data (0..n bytes) | SW1 | SW2 |
//! ```
//!
//! `SW1 == 0x90` means the command completed. Anything else is a block-level
//! failure. The adapter makes exactly one exchange per call and keeps no
//! state between calls.

use crate::chunker::Block;
use crate::config::TagConfig;
use crate::error::{BlockError, Result, TransportError};
use crate::transport::Transport;
use std::fmt;

/// Class byte for reader-level commands.
pub const CLASS: u8 = 0xFF;

/// UPDATE BINARY: write one block.
pub const INS_WRITE: u8 = 0xD6;

/// READ BINARY: read one block.
pub const INS_READ: u8 = 0xB0;

/// Largest payload a single-byte Lc can describe.
pub const MAX_DATA_LEN: usize = u8::MAX as usize;

/// Two-byte response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusWord {
    pub sw1: u8,
    pub sw2: u8,
}

impl StatusWord {
    /// Command completed.
    pub const SUCCESS: Self = Self::new(0x90, 0x00);
    /// Memory failure (write did not take).
    pub const MEMORY_FAILURE: Self = Self::new(0x65, 0x81);
    /// Addressed block does not exist.
    pub const NOT_FOUND: Self = Self::new(0x6A, 0x82);
    /// Command not allowed in the current state.
    pub const NOT_ALLOWED: Self = Self::new(0x69, 0x86);

    pub const fn new(sw1: u8, sw2: u8) -> Self {
        Self { sw1, sw2 }
    }

    /// Success is decided by SW1 alone.
    pub fn is_success(&self) -> bool {
        self.sw1 == 0x90
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}", self.sw1, self.sw2)
    }
}

/// A command frame sent to the tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub class: u8,
    pub instruction: u8,
    pub p1: u8,
    pub p2: u8,

    /// Command payload (written block contents)
    pub data: Vec<u8>,

    /// Number of response bytes requested
    pub expected_len: Option<u8>,
}

impl Command {
    /// Frame writing `data` to block `index`.
    ///
    /// # Errors
    /// `BlockError::ChunkTooLarge` if `data` is longer than `MAX_DATA_LEN`.
    pub fn write_block(index: u8, data: &[u8]) -> std::result::Result<Self, BlockError> {
        check_data_len(data.len())?;
        Ok(Self {
            class: CLASS,
            instruction: INS_WRITE,
            p1: 0x00,
            p2: index,
            data: data.to_vec(),
            expected_len: None,
        })
    }

    /// Frame reading `block_size` bytes from block `index`.
    pub fn read_block(index: u8, block_size: u8) -> Self {
        Self {
            class: CLASS,
            instruction: INS_READ,
            p1: 0x00,
            p2: index,
            data: Vec::new(),
            expected_len: Some(block_size),
        }
    }

    /// Block address carried in P2.
    pub fn block_index(&self) -> u8 {
        self.p2
    }

    /// Serialize to wire bytes.
    ///
    /// # Errors
    /// `BlockError::ChunkTooLarge` if `data` does not fit the one-byte Lc.
    pub fn to_bytes(&self) -> std::result::Result<Vec<u8>, BlockError> {
        let mut bytes = Vec::with_capacity(5 + self.data.len() + 1);

        bytes.extend_from_slice(&[self.class, self.instruction, self.p1, self.p2]);
        if !self.data.is_empty() {
            bytes.push(check_data_len(self.data.len())?);
            bytes.extend_from_slice(&self.data);
        }
        if let Some(le) = self.expected_len {
            bytes.push(le);
        }

        Ok(bytes)
    }
}

fn check_data_len(len: usize) -> std::result::Result<u8, BlockError> {
    u8::try_from(len).map_err(|_| BlockError::ChunkTooLarge {
        len,
        block_size: MAX_DATA_LEN,
    })
}

/// A response from the tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub data: Vec<u8>,
    pub status: StatusWord,
}

impl Response {
    pub fn new(data: Vec<u8>, status: StatusWord) -> Self {
        Self { data, status }
    }

    /// Response with no data and the given status.
    pub fn status_only(status: StatusWord) -> Self {
        Self::new(Vec::new(), status)
    }

    /// Parse raw response bytes: data followed by SW1 SW2.
    ///
    /// # Errors
    /// `TransportError::MalformedResponse` if fewer than two bytes are given.
    pub fn from_bytes(raw: &[u8]) -> std::result::Result<Self, TransportError> {
        if raw.len() < 2 {
            return Err(TransportError::MalformedResponse { length: raw.len() });
        }

        let (data, sw) = raw.split_at(raw.len() - 2);
        Ok(Self {
            data: data.to_vec(),
            status: StatusWord::new(sw[0], sw[1]),
        })
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Single-exchange block commands over a transport.
pub struct BlockAdapter<'t, T: Transport + ?Sized> {
    transport: &'t mut T,
    block_size: usize,
    max_block_count: usize,
}

impl<'t, T: Transport + ?Sized> BlockAdapter<'t, T> {
    /// Create an adapter for the given layout.
    ///
    /// `config` is expected to have passed `TagConfig::validate`.
    pub fn new(transport: &'t mut T, config: &TagConfig) -> Self {
        Self {
            transport,
            block_size: config.block_size,
            max_block_count: config.max_block_count,
        }
    }

    /// Write one block.
    ///
    /// # Errors
    /// - `BlockError::IndexOutOfRange` / `ChunkTooLarge` before any exchange
    /// - `Error::Transport` if the exchange itself fails
    /// - `BlockError::WriteFailed` on a non-success status
    pub fn write_block(&mut self, block: &Block) -> Result<StatusWord> {
        let index = self.address(block.index)?;
        if block.bytes.len() > self.block_size {
            return Err(BlockError::ChunkTooLarge {
                len: block.bytes.len(),
                block_size: self.block_size,
            }
            .into());
        }

        let response = self
            .transport
            .transmit(&Command::write_block(index, &block.bytes)?)?;
        tracing::debug!(block = index, status = %response.status, "write block");

        if !response.is_success() {
            return Err(BlockError::WriteFailed {
                index,
                status: response.status,
            }
            .into());
        }
        Ok(response.status)
    }

    /// Read one block, returning exactly `block_size` bytes.
    ///
    /// Short responses are zero-extended and long ones cut.
    ///
    /// # Errors
    /// - `BlockError::IndexOutOfRange` before any exchange
    /// - `Error::Transport` if the exchange itself fails
    /// - `BlockError::ReadFailed` on a non-success status
    pub fn read_block(&mut self, index: usize) -> Result<Vec<u8>> {
        let index = self.address(index)?;

        let response = self
            .transport
            .transmit(&Command::read_block(index, self.block_size as u8))?;
        tracing::debug!(block = index, status = %response.status, "read block");

        if !response.is_success() {
            return Err(BlockError::ReadFailed {
                index,
                status: response.status,
            }
            .into());
        }

        let mut data = response.data;
        data.resize(self.block_size, 0x00);
        Ok(data)
    }

    fn address(&self, index: usize) -> Result<u8> {
        if index >= self.max_block_count || index > u8::MAX as usize {
            return Err(BlockError::IndexOutOfRange {
                index,
                max: self.max_block_count,
            }
            .into());
        }
        Ok(index as u8)
    }
}
