//! tagblock-core: record storage on block-addressed contactless tags
//!
//! This library stores an ordered record of text fields on a tag and reads
//! it back:
//! - Joins field values with a delimiter into a capacity-bounded payload
//! - Splits the payload into fixed-size, sequentially addressed blocks
//! - Writes and reads blocks with one command/response exchange each
//! - Reassembles blocks and splits the payload back into fields
//!
//! # Architecture
//!
//! - `codec`: record <-> delimited payload
//! - `chunker`: payload <-> blocks
//! - `apdu`: command frames, status words, single-exchange block adapter
//! - `transport`: the reader seam and scoped sessions
//! - `writer` / `reader`: orchestration with early stop
//! - `sim`: in-memory tag with seeded fault injection
//! - `metrics`: exchange and block counters
//!
//! # Design Principles
//!
//! - **No panics**: All errors are structured and recoverable
//! - **Scoped transport**: Every operation releases the reader before returning
//! - **Non-transactional writes**: A failed block leaves earlier blocks written
//! - **Lossy reads**: Tag contents never make a read fail

pub mod apdu;
pub mod chunker;
pub mod codec;
pub mod config;
pub mod error;
pub mod metrics;
pub mod reader;
pub mod record;
pub mod sim;
pub mod transport;
pub mod writer;

// Re-export commonly used types
pub use config::{ResiduePolicy, TagConfig, Truncation};
pub use error::{Error, Result};
pub use reader::TagReader;
pub use record::{Record, PATIENT_FIELDS};
pub use transport::Transport;
pub use writer::{TagWriter, WriteOutcome};

/// Write `values` under `names` (same order) to the tag behind `transport`.
///
/// # Errors
/// See [`TagWriter::write`].
pub fn write_record<T, N, V>(
    transport: &mut T,
    names: &[N],
    values: &[V],
    config: &TagConfig,
) -> Result<WriteOutcome>
where
    T: Transport + ?Sized,
    N: AsRef<str>,
    V: AsRef<str>,
{
    let record = Record::from_parts(names, values)?;
    TagWriter::new(config.clone()).write(transport, &record)
}

/// Read a record with fields `names` from the tag behind `transport`.
///
/// # Errors
/// See [`TagReader::read`].
pub fn read_record<T, N>(transport: &mut T, names: &[N], config: &TagConfig) -> Result<Record>
where
    T: Transport + ?Sized,
    N: AsRef<str>,
{
    TagReader::new(config.clone()).read(transport, names)
}
