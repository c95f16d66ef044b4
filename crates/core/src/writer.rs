//! Record writer.
//!
//! Encodes a record, splits it into blocks and writes them in increasing
//! block order, one exchange per block:
//!
//! ```text
//! Idle -> Encoding -> Writing(0) -> ... -> Writing(n-1) -> Done
//!            |             \                    \
//!            v              `-> Failed(i) <------'
//!         Rejected
//! ```
//!
//! `Rejected` means the call failed before any block was sent: bad layout,
//! unencodable record or no reader.
//!
//! # Durability
//!
//! Writes are not transactional. When block `i` fails, blocks `0..i` have
//! already been written and stay written; the tag then holds a mix of the
//! new record and whatever was there before. No rollback is attempted.

use crate::apdu::BlockAdapter;
use crate::chunker::{self, Block};
use crate::codec;
use crate::config::{ResiduePolicy, TagConfig};
use crate::error::{Error, Result};
use crate::metrics::Metrics;
use crate::record::Record;
use crate::transport::{Session, Transport};

/// Writer progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteState {
    Idle,
    Encoding,
    /// Writing the block at this index
    Writing(usize),
    Done,
    /// Stopped at the block at this index
    Failed(usize),
    /// Stopped before the first exchange
    Rejected,
}

/// What a successful write did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Data blocks written (`ceil(payload / block_size)`)
    pub blocks_written: usize,

    /// Zero blocks written after the data (terminator or scrub)
    pub blocks_cleared: usize,

    /// Payload bytes stored
    pub payload_len: usize,

    /// Whether the record was cut to fit
    pub truncated: bool,
}

/// Writes records to a tag.
#[derive(Debug)]
pub struct TagWriter {
    config: TagConfig,
    state: WriteState,
    metrics: Metrics,
}

impl TagWriter {
    pub fn new(config: TagConfig) -> Self {
        Self {
            config,
            state: WriteState::Idle,
            metrics: Metrics::new(),
        }
    }

    /// State reached by the most recent `write`.
    pub fn state(&self) -> WriteState {
        self.state
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn config(&self) -> &TagConfig {
        &self.config
    }

    /// Write a record, stopping at the first block that fails.
    ///
    /// The transport is connected for the duration of the call and released
    /// on every exit path.
    ///
    /// # Errors
    /// - `Error::Config` / `Error::Codec` before anything is sent
    /// - `TransportError::Unavailable` if the reader cannot be connected
    ///
    /// These three leave the writer in `WriteState::Rejected`.
    /// - `BlockError::WriteFailed` naming the first failing block
    pub fn write<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        record: &Record,
    ) -> Result<WriteOutcome> {
        self.state = WriteState::Encoding;
        let (encoded, blocks) = match self.prepare(record) {
            Ok(prepared) => prepared,
            Err(err) => return Err(self.reject(err)),
        };
        let clear = self.blocks_to_clear(encoded.bytes.len(), blocks.len());

        let mut session = match Session::open(transport) {
            Ok(session) => session,
            Err(err) => return Err(self.reject(err.into())),
        };
        let mut adapter = BlockAdapter::new(&mut *session, &self.config);

        for block in &blocks {
            self.write_one(&mut adapter, block)?;
            self.metrics.blocks_written += 1;
        }
        for index in clear.clone() {
            self.write_one(&mut adapter, &Block::zeroed(index, self.config.block_size))?;
            self.metrics.blocks_cleared += 1;
        }

        self.state = WriteState::Done;
        self.metrics.complete();
        tracing::info!(
            blocks = blocks.len(),
            cleared = clear.len(),
            bytes = encoded.bytes.len(),
            truncated = encoded.truncated,
            "record written"
        );

        Ok(WriteOutcome {
            blocks_written: blocks.len(),
            blocks_cleared: clear.len(),
            payload_len: encoded.bytes.len(),
            truncated: encoded.truncated,
        })
    }

    fn prepare(&mut self, record: &Record) -> Result<(codec::Encoded, Vec<Block>)> {
        self.config.validate()?;

        let encoded = codec::encode(record, &self.config)?;
        let blocks = chunker::split(&encoded.bytes, self.config.block_size)?;
        self.metrics.bytes_encoded += encoded.bytes.len() as u64;
        if encoded.truncated {
            self.metrics.truncations += 1;
        }
        Ok((encoded, blocks))
    }

    fn reject(&mut self, err: Error) -> Error {
        self.state = WriteState::Rejected;
        self.metrics.complete();
        tracing::warn!(error = %err, "write rejected");
        err
    }

    fn write_one<T: Transport + ?Sized>(
        &mut self,
        adapter: &mut BlockAdapter<'_, T>,
        block: &Block,
    ) -> Result<()> {
        self.state = WriteState::Writing(block.index);
        self.metrics.exchanges += 1;

        if let Err(err) = adapter.write_block(block) {
            self.state = WriteState::Failed(block.index);
            self.metrics.write_failures += 1;
            self.metrics.complete();
            tracing::warn!(block = block.index, error = %err, "write aborted");
            return Err(err);
        }
        Ok(())
    }

    /// Indices of zero blocks to write after `data_blocks` data blocks.
    fn blocks_to_clear(&self, payload_len: usize, data_blocks: usize) -> std::ops::Range<usize> {
        let max = self.config.max_block_count;
        match self.config.residue {
            ResiduePolicy::Preserve => data_blocks..data_blocks,
            // A partial last block is already terminated by its padding
            ResiduePolicy::Terminate
                if payload_len % self.config.block_size == 0 && data_blocks < max =>
            {
                data_blocks..data_blocks + 1
            }
            ResiduePolicy::Terminate => data_blocks..data_blocks,
            ResiduePolicy::Scrub => data_blocks..max.max(data_blocks),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apdu::StatusWord;
    use crate::error::{BlockError, CodecError, Error, TransportError};
    use crate::sim::{SimConfig, SimulatedTag};

    fn record(values: &[&str]) -> Record {
        let names: Vec<String> = (0..values.len()).map(|i| format!("f{i}")).collect();
        Record::from_parts(&names, values).unwrap()
    }

    fn tag_for(config: &TagConfig) -> SimulatedTag {
        SimulatedTag::new(SimConfig::from_tag(config))
    }

    #[test]
    fn test_write_single_block() {
        let config = TagConfig::default();
        let mut tag = tag_for(&config);
        let mut writer = TagWriter::new(config);

        let outcome = writer.write(&mut tag, &record(&["Dr. A", "Bob"])).unwrap();

        assert_eq!(outcome.blocks_written, 1);
        assert_eq!(outcome.blocks_cleared, 0);
        assert_eq!(outcome.payload_len, 9);
        assert_eq!(tag.write_log(), vec![0]);
        assert_eq!(writer.state(), WriteState::Done);
        assert_eq!(&tag.block(0).unwrap()[..9], b"Dr. A|Bob");
    }

    #[test]
    fn test_write_stops_at_failed_block() {
        let config = TagConfig::default();
        let mut tag = SimulatedTag::new(SimConfig {
            fail_write_at: Some(2),
            ..SimConfig::from_tag(&config)
        });
        let mut writer = TagWriter::new(config);

        let err = writer.write(&mut tag, &record(&["x".repeat(60).as_str()])).unwrap_err();

        assert!(matches!(
            err,
            Error::Block(BlockError::WriteFailed { index: 2, status }) if status == StatusWord::MEMORY_FAILURE
        ));
        assert_eq!(tag.write_log(), vec![0, 1, 2]);
        assert_eq!(writer.state(), WriteState::Failed(2));
        assert_eq!(writer.metrics().write_failures, 1);
        // No rollback
        assert_eq!(tag.block(1).unwrap(), &[b'x'; 16][..]);
        assert!(!tag.is_connected());
    }

    #[test]
    fn test_terminator_after_exact_boundary() {
        let config = TagConfig::default();
        let mut tag = tag_for(&config);
        tag.load(&[b'z'; 240]);
        let mut writer = TagWriter::new(config);

        let outcome = writer.write(&mut tag, &record(&["a".repeat(32).as_str()])).unwrap();

        assert_eq!(outcome.blocks_written, 2);
        assert_eq!(outcome.blocks_cleared, 1);
        assert_eq!(tag.write_log(), vec![0, 1, 2]);
        assert_eq!(tag.block(2).unwrap(), &[0u8; 16][..]);
        assert_eq!(tag.block(3).unwrap(), &[b'z'; 16][..]);
    }

    #[test]
    fn test_no_terminator_when_full() {
        let config = TagConfig::default();
        let mut tag = tag_for(&config);
        let mut writer = TagWriter::new(config);

        let outcome = writer.write(&mut tag, &record(&["a".repeat(240).as_str()])).unwrap();

        assert_eq!(outcome.blocks_written, 15);
        assert_eq!(outcome.blocks_cleared, 0);
    }

    #[test]
    fn test_preserve_leaves_residue() {
        let config = TagConfig {
            residue: ResiduePolicy::Preserve,
            ..TagConfig::default()
        };
        let mut tag = tag_for(&config);
        tag.load(&[b'z'; 240]);
        let mut writer = TagWriter::new(config);

        writer.write(&mut tag, &record(&["a".repeat(16).as_str()])).unwrap();

        assert_eq!(tag.write_log(), vec![0]);
        assert_eq!(tag.block(1).unwrap(), &[b'z'; 16][..]);
    }

    #[test]
    fn test_scrub_clears_all_unused_blocks() {
        let config = TagConfig {
            residue: ResiduePolicy::Scrub,
            ..TagConfig::default()
        };
        let mut tag = tag_for(&config);
        tag.load(&[b'z'; 240]);
        let mut writer = TagWriter::new(config);

        let outcome = writer.write(&mut tag, &record(&["short"])).unwrap();

        assert_eq!(outcome.blocks_written, 1);
        assert_eq!(outcome.blocks_cleared, 14);
        assert_eq!(tag.write_log(), (0..15).collect::<Vec<u8>>());
        assert!(tag.memory()[5..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_truncation_reported() {
        let config = TagConfig::default();
        let mut tag = tag_for(&config);
        let mut writer = TagWriter::new(config);

        let outcome = writer.write(&mut tag, &record(&["a".repeat(300).as_str()])).unwrap();

        assert!(outcome.truncated);
        assert_eq!(outcome.payload_len, 240);
        assert_eq!(writer.metrics().truncations, 1);
    }

    #[test]
    fn test_codec_error_sends_nothing() {
        let config = TagConfig::default();
        let mut tag = tag_for(&config);
        let mut writer = TagWriter::new(config);

        let err = writer.write(&mut tag, &record(&["a|b"])).unwrap_err();

        assert!(matches!(err, Error::Codec(CodecError::DelimiterInValue { .. })));
        assert_eq!(writer.state(), WriteState::Rejected);
        assert_eq!(tag.connects(), 0);
        assert!(tag.exchanges().is_empty());
    }

    #[test]
    fn test_invalid_layout_rejected() {
        let config = TagConfig {
            block_size: 0,
            ..TagConfig::default()
        };
        let mut tag = SimulatedTag::new(SimConfig::default());
        let mut writer = TagWriter::new(config);

        let err = writer.write(&mut tag, &record(&["a"])).unwrap_err();

        assert!(matches!(err, Error::Config(_)));
        assert_eq!(writer.state(), WriteState::Rejected);
        assert!(tag.exchanges().is_empty());
    }

    #[test]
    fn test_unavailable_transport() {
        let mut tag = SimulatedTag::new(SimConfig {
            unavailable: true,
            ..SimConfig::default()
        });
        let mut writer = TagWriter::new(TagConfig::default());

        let err = writer.write(&mut tag, &record(&["a"])).unwrap_err();
        assert!(matches!(err, Error::Transport(TransportError::Unavailable(_))));
        assert_eq!(writer.state(), WriteState::Rejected);
    }

    #[test]
    fn test_link_failure_releases_transport() {
        let config = TagConfig::default();
        let mut tag = SimulatedTag::new(SimConfig {
            fail_link_at: Some(1),
            ..SimConfig::from_tag(&config)
        });
        let mut writer = TagWriter::new(config);

        let err = writer.write(&mut tag, &record(&["a".repeat(40).as_str()])).unwrap_err();

        assert!(matches!(err, Error::Transport(TransportError::Link(_))));
        assert_eq!(writer.state(), WriteState::Failed(1));
        assert_eq!(tag.disconnects(), 1);
    }
}
