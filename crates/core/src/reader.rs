//! Record reader.
//!
//! Reads blocks `0..max_block_count` in order and decodes what it got:
//!
//! ```text
//! Idle -> Reading(0) -> ... -> Reading(max-1) -> Done
//!              \                    \
//!               `-> StoppedEarly(i) <'
//! ```
//!
//! An unsuccessful status at block `i` ends the read: blocks `0..i` are
//! decoded and the failure itself is not reported. A tag with fewer blocks
//! than configured, and a genuine fault, look the same from here.

use crate::apdu::BlockAdapter;
use crate::codec;
use crate::config::TagConfig;
use crate::error::{BlockError, Error, Result};
use crate::metrics::Metrics;
use crate::record::Record;
use crate::transport::{Session, Transport};

/// Reader progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    Idle,
    /// Reading the block at this index
    Reading(usize),
    Done,
    /// The block at this index was unreadable
    StoppedEarly(usize),
}

/// Reads records from a tag.
#[derive(Debug)]
pub struct TagReader {
    config: TagConfig,
    state: ReadState,
    metrics: Metrics,
}

impl TagReader {
    pub fn new(config: TagConfig) -> Self {
        Self {
            config,
            state: ReadState::Idle,
            metrics: Metrics::new(),
        }
    }

    /// State reached by the most recent read.
    pub fn state(&self) -> ReadState {
        self.state
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Read a record with the given field order.
    ///
    /// Never fails on tag contents: blank or garbage tags decode to empty or
    /// garbage fields.
    ///
    /// # Errors
    /// - `Error::Config` for an invalid layout
    /// - `Error::Transport` if the reader is unavailable or an exchange breaks
    pub fn read<T, N>(&mut self, transport: &mut T, names: &[N]) -> Result<Record>
    where
        T: Transport + ?Sized,
        N: AsRef<str>,
    {
        let payload = self.read_payload(transport)?;
        let record = codec::decode(&payload, names, self.config.delimiter);
        self.metrics.bytes_decoded += payload.len() as u64;
        Ok(record)
    }

    /// Read raw block contents up to the first unreadable block.
    ///
    /// Each successful block contributes exactly `block_size` bytes,
    /// padding included.
    pub fn read_payload<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<Vec<u8>> {
        self.state = ReadState::Idle;
        self.config.validate()?;

        let mut payload =
            Vec::with_capacity(self.config.block_size * self.config.max_block_count);

        {
            let mut session = Session::open(transport)?;
            let mut adapter = BlockAdapter::new(&mut *session, &self.config);

            for index in 0..self.config.max_block_count {
                self.state = ReadState::Reading(index);
                self.metrics.exchanges += 1;

                match adapter.read_block(index) {
                    Ok(data) => {
                        payload.extend_from_slice(&data);
                        self.metrics.blocks_read += 1;
                    }
                    Err(Error::Block(BlockError::ReadFailed { status, .. })) => {
                        self.state = ReadState::StoppedEarly(index);
                        self.metrics.early_stops += 1;
                        tracing::warn!(block = index, %status, "read stopped early");
                        break;
                    }
                    Err(err) => {
                        tracing::warn!(block = index, error = %err, "read aborted");
                        return Err(err);
                    }
                }
            }
        }

        if !matches!(self.state, ReadState::StoppedEarly(_)) {
            self.state = ReadState::Done;
        }
        self.metrics.complete();
        tracing::info!(
            blocks = payload.len() / self.config.block_size,
            bytes = payload.len(),
            "payload read"
        );

        Ok(payload)
    }
}
