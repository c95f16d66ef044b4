//! Metrics collection and reporting for tag operations.
//!
//! Tracks how many exchanges a write or read took, how many blocks moved,
//! and how often writes failed or reads stopped early.
//!
//! # Thread Safety
//!
//! The `Metrics` struct is NOT thread-safe. Tag sessions are serialized, so
//! a single instance is updated by one orchestration at a time.

use std::time::{Duration, Instant};

/// Counters for tag writes and reads.
#[derive(Debug, Clone)]
pub struct Metrics {
    // === Timing ===
    /// When collection started
    pub start_time: Instant,

    /// When collection ended (set on completion)
    pub end_time: Option<Instant>,

    // === Exchanges ===
    /// Command/response exchanges issued
    pub exchanges: u64,

    // === Writing ===
    /// Bytes produced by the codec
    pub bytes_encoded: u64,

    /// Data blocks written successfully
    pub blocks_written: u64,

    /// Terminator or scrub blocks written successfully
    pub blocks_cleared: u64,

    /// Writes aborted by a failing block
    pub write_failures: u64,

    /// Records cut to fit the capacity
    pub truncations: u64,

    // === Reading ===
    /// Blocks read successfully
    pub blocks_read: u64,

    /// Bytes handed to the decoder
    pub bytes_decoded: u64,

    /// Reads ended by an unsuccessful block before the last block
    pub early_stops: u64,
}

impl Metrics {
    /// Create new metrics with start time set to now.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            end_time: None,
            exchanges: 0,
            bytes_encoded: 0,
            blocks_written: 0,
            blocks_cleared: 0,
            write_failures: 0,
            truncations: 0,
            blocks_read: 0,
            bytes_decoded: 0,
            early_stops: 0,
        }
    }

    /// Mark collection as complete.
    pub fn complete(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Get total duration (or current elapsed if not complete).
    pub fn duration(&self) -> Duration {
        match self.end_time {
            Some(end) => end.duration_since(self.start_time),
            None => self.start_time.elapsed(),
        }
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n=== Tag Summary ===");
        println!("Duration: {} ms", self.duration().as_millis());
        println!("Exchanges: {}", self.exchanges);
        println!();

        println!("=== Write ===");
        println!("Encoded bytes: {}", self.bytes_encoded);
        println!("Data blocks written: {}", self.blocks_written);
        println!("Blocks cleared: {}", self.blocks_cleared);
        println!("Truncations: {}", self.truncations);
        println!("Write failures: {}", self.write_failures);
        println!();

        println!("=== Read ===");
        println!("Blocks read: {}", self.blocks_read);
        println!("Decoded bytes: {}", self.bytes_decoded);
        println!("Early stops: {}", self.early_stops);
        println!();
    }

    /// Export metrics as a simple text format (for parsing/testing).
    pub fn export_text(&self) -> String {
        format!(
            "duration_ms={}\n\
             exchanges={}\n\
             bytes_encoded={}\n\
             blocks_written={}\n\
             blocks_cleared={}\n\
             truncations={}\n\
             write_failures={}\n\
             blocks_read={}\n\
             bytes_decoded={}\n\
             early_stops={}\n",
            self.duration().as_millis(),
            self.exchanges,
            self.bytes_encoded,
            self.blocks_written,
            self.blocks_cleared,
            self.truncations,
            self.write_failures,
            self.blocks_read,
            self.bytes_decoded,
            self.early_stops,
        )
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
