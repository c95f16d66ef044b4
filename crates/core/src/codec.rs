//! Record encoding and decoding.
//!
//! A record is stored as its values joined by a single delimiter byte:
//!
//! ```text
//! Dr. A|Bob|555-0100|...
//! ```
//!
//! Field names are not stored. The payload is capped at `max_payload_bytes`
//! and everything after the first 0x00 byte is treated as padding.
//!
//! # Lossy decode
//!
//! Decoding never fails. Invalid UTF-8 is replaced with U+FFFD, missing
//! trailing fields become empty strings and extra parts are dropped. A field
//! that was cut off by truncation cannot be told apart from one that was
//! legitimately empty.

use crate::config::{TagConfig, Truncation};
use crate::error::{CodecError, Result};
use crate::record::Record;

/// Byte marking the end of stored data.
pub const END_OF_DATA: u8 = 0x00;

/// Result of encoding a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    /// Payload bytes, at most `max_payload_bytes` long
    pub bytes: Vec<u8>,

    /// Whether the joined values exceeded the budget
    pub truncated: bool,
}

/// Encode a record's values into a delimited payload.
///
/// # Errors
/// - `CodecError::DelimiterInValue` if a value contains the delimiter
/// - `CodecError::ReservedByte` if a value contains 0x00
pub fn encode(record: &Record, config: &TagConfig) -> Result<Encoded> {
    let mut bytes = Vec::with_capacity(config.max_payload_bytes);

    for (i, (name, value)) in record.iter().enumerate() {
        let raw = value.as_bytes();
        if raw.contains(&config.delimiter) {
            return Err(CodecError::DelimiterInValue {
                field: name.to_string(),
            }
            .into());
        }
        if raw.contains(&END_OF_DATA) {
            return Err(CodecError::ReservedByte {
                field: name.to_string(),
            }
            .into());
        }

        if i > 0 {
            bytes.push(config.delimiter);
        }
        bytes.extend_from_slice(raw);
    }

    let truncated = bytes.len() > config.max_payload_bytes;
    if truncated {
        let cut = match config.truncation {
            Truncation::Byte => config.max_payload_bytes,
            Truncation::CharBoundary => char_boundary_at_or_before(&bytes, config.max_payload_bytes),
        };
        bytes.truncate(cut);
        tracing::warn!(
            max_payload_bytes = config.max_payload_bytes,
            kept = cut,
            "record exceeds capacity, truncating"
        );
    }

    Ok(Encoded { bytes, truncated })
}

/// Decode a payload into a record with exactly `names.len()` fields.
pub fn decode<N: AsRef<str>>(bytes: &[u8], names: &[N], delimiter: u8) -> Record {
    let end = bytes
        .iter()
        .position(|&b| b == END_OF_DATA)
        .unwrap_or(bytes.len());
    let data = &bytes[..end];

    let mut parts = data.split(|&b| b == delimiter);
    let mut record = Record::new();

    for name in names {
        let value = parts
            .next()
            .map(|part| String::from_utf8_lossy(part).into_owned())
            .unwrap_or_default();
        record.push(name.as_ref(), value);
    }

    record
}

/// Largest index `<= limit` that does not split a UTF-8 sequence.
fn char_boundary_at_or_before(bytes: &[u8], limit: usize) -> usize {
    let mut cut = limit.min(bytes.len());
    // Continuation bytes are 0b10xx_xxxx
    while cut > 0 && cut < bytes.len() && (bytes[cut] & 0xC0) == 0x80 {
        cut -= 1;
    }
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn record(pairs: &[(&str, &str)]) -> Record {
        let mut r = Record::new();
        for (n, v) in pairs {
            r.push(*n, *v);
        }
        r
    }

    #[test]
    fn test_encode_joins_without_trailing_delimiter() {
        let r = record(&[("Doctor", "Dr. A"), ("Patient", "Bob")]);
        let encoded = encode(&r, &TagConfig::default()).unwrap();
        assert_eq!(encoded.bytes, b"Dr. A|Bob");
        assert!(!encoded.truncated);
    }

    #[test]
    fn test_encode_truncates_at_byte_level() {
        let config = TagConfig::with_capacity(4, 8);
        let r = record(&[("a", "abcdef"), ("b", "ghij")]);
        let encoded = encode(&r, &config).unwrap();
        assert_eq!(encoded.bytes, b"abcdef|g");
        assert!(encoded.truncated);
    }

    #[test]
    fn test_byte_truncation_may_split_character() {
        let config = TagConfig::with_capacity(4, 4);
        // "aéé" = 61 C3 A9 C3 A9
        let r = record(&[("a", "aéé")]);
        let encoded = encode(&r, &config).unwrap();
        assert_eq!(encoded.bytes, vec![0x61, 0xC3, 0xA9, 0xC3]);
    }

    #[test]
    fn test_char_boundary_truncation() {
        let config = TagConfig {
            truncation: Truncation::CharBoundary,
            ..TagConfig::with_capacity(4, 4)
        };
        let r = record(&[("a", "aéé")]);
        let encoded = encode(&r, &config).unwrap();
        assert_eq!(encoded.bytes, "aé".as_bytes());
        assert!(encoded.truncated);
    }

    #[test]
    fn test_encode_rejects_delimiter_in_value() {
        let r = record(&[("Address", "1 Main St | Apt 2")]);
        let result = encode(&r, &TagConfig::default());
        assert!(matches!(
            result,
            Err(Error::Codec(CodecError::DelimiterInValue { ref field })) if field == "Address"
        ));
    }

    #[test]
    fn test_encode_rejects_nul() {
        let r = record(&[("Phone", "555\u{0}")]);
        assert!(matches!(
            encode(&r, &TagConfig::default()),
            Err(Error::Codec(CodecError::ReservedByte { .. }))
        ));
    }

    #[test]
    fn test_decode_pads_missing_fields() {
        let r = decode(b"one|two", &["a", "b", "c"], b'|');
        assert_eq!(r, record(&[("a", "one"), ("b", "two"), ("c", "")]));
    }

    #[test]
    fn test_decode_drops_extra_parts() {
        let r = decode(b"one|two|three", &["a"], b'|');
        assert_eq!(r, record(&[("a", "one")]));
    }

    #[test]
    fn test_decode_stops_at_padding() {
        let mut bytes = b"Dr. A|Bob".to_vec();
        bytes.resize(16, 0);
        let r = decode(&bytes, &["Doctor", "Patient"], b'|');
        assert_eq!(r, record(&[("Doctor", "Dr. A"), ("Patient", "Bob")]));
    }

    #[test]
    fn test_decode_replaces_invalid_utf8() {
        let r = decode(&[0x61, 0xC3], &["a"], b'|');
        assert_eq!(r.get("a"), Some("a\u{FFFD}"));
    }

    #[test]
    fn test_decode_empty_input() {
        let r = decode(&[], &["a", "b"], b'|');
        assert_eq!(r, record(&[("a", ""), ("b", "")]));
    }
}
