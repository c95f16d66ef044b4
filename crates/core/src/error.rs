//! Error types for tag block storage.
//!
//! All operations return structured errors rather than panicking. Each
//! orchestration step reports the failing block index so callers can decide
//! how to present it.

use crate::apdu::StatusWord;
use thiserror::Error;

/// Top-level error type for all operations in the system.
///
/// Each variant corresponds to a specific failure domain:
/// - Transport: no reader, or an exchange could not be carried out
/// - Block: a block-level command was refused by the tag
/// - Codec: a record cannot be encoded unambiguously
/// - Config: capacity settings are inconsistent
#[derive(Debug, Error)]
pub enum Error {
    /// Transport could not be connected or an exchange failed at the link level
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Block command returned a non-success status
    #[error("block error: {0}")]
    Block(#[from] BlockError),

    /// Record encoding was rejected
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Transport-level errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No connection could be established (no reader, or reader in use)
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    /// The exchange could not be completed
    #[error("link failure: {0}")]
    Link(String),

    /// Raw response too short to carry a status word
    #[error("malformed response: {length} bytes, need at least 2")]
    MalformedResponse { length: usize },

    /// `transmit` called outside of a session
    #[error("transport not connected")]
    NotConnected,
}

/// Block-level errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlockError {
    /// A write exchange returned a non-success status
    #[error("write failed at block {index} (status {status})")]
    WriteFailed { index: u8, status: StatusWord },

    /// A read exchange returned a non-success status
    #[error("read failed at block {index} (status {status})")]
    ReadFailed { index: u8, status: StatusWord },

    /// Block index beyond the configured block count
    #[error("block index {index} out of range (max {max})")]
    IndexOutOfRange { index: usize, max: usize },

    /// Chunk does not fit in one block
    #[error("chunk of {len} bytes exceeds block size {block_size}")]
    ChunkTooLarge { len: usize, block_size: usize },
}

/// Record codec errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Field value contains the delimiter byte
    #[error("field {field:?} contains the delimiter")]
    DelimiterInValue { field: String },

    /// Field value contains 0x00, the end-of-data marker
    #[error("field {field:?} contains a NUL byte")]
    ReservedByte { field: String },

    /// Names and values differ in length
    #[error("field count mismatch: {names} names, {values} values")]
    FieldCountMismatch { names: usize, values: usize },

    /// A required field is empty
    #[error("required field {field:?} is empty")]
    MissingField { field: String },
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;
