//! Simulated tag with deterministic fault injection.
//!
//! `SimulatedTag` implements [`Transport`] over an in-memory block store so
//! the writer and reader can be exercised without hardware.
//!
//! # Simulated Effects
//!
//! - **Missing blocks**: addresses past `block_count` answer `6A82`
//! - **Write faults**: a fixed block, or a random fraction of writes, answer `6581`
//! - **Read faults**: a fixed block answers `6986`
//! - **Link faults**: a given exchange fails before any status is returned
//! - **No reader**: `connect` fails
//!
//! # Determinism
//!
//! Random write faults come from a seeded ChaCha8 RNG. Given the same seed
//! and the same command sequence, outcomes are identical.

use crate::apdu::{Command, Response, StatusWord, INS_READ, INS_WRITE};
use crate::config::TagConfig;
use crate::error::TransportError;
use crate::transport::Transport;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Wrong length (data longer than a block).
const WRONG_LENGTH: StatusWord = StatusWord::new(0x67, 0x00);

/// Instruction not supported.
const INS_NOT_SUPPORTED: StatusWord = StatusWord::new(0x6D, 0x00);

/// Configuration for the simulated tag.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Bytes per block
    pub block_size: usize,

    /// Number of physical blocks on the tag
    pub block_count: usize,

    /// Block whose writes always fail
    pub fail_write_at: Option<usize>,

    /// Block whose reads always fail
    pub fail_read_at: Option<usize>,

    /// Zero-based exchange number that fails at the link level
    pub fail_link_at: Option<usize>,

    /// Probability [0.0, 1.0] that any write fails
    pub write_failure_rate: f64,

    /// Whether `connect` fails (no reader present)
    pub unavailable: bool,

    /// Random seed for determinism
    pub seed: u64,
}

impl SimConfig {
    /// A fault-free tag matching the given layout.
    pub fn from_tag(config: &TagConfig) -> Self {
        Self {
            block_size: config.block_size,
            block_count: config.max_block_count,
            ..Self::default()
        }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        let tag = TagConfig::default();
        Self {
            block_size: tag.block_size,
            block_count: tag.max_block_count,
            fail_write_at: None,
            fail_read_at: None,
            fail_link_at: None,
            write_failure_rate: 0.0,
            unavailable: false,
            seed: 0,
        }
    }
}

/// In-memory tag reachable through a simulated reader.
///
/// # Thread Safety
/// Not thread-safe; one session at a time, like a physical reader.
pub struct SimulatedTag {
    config: SimConfig,
    rng: ChaCha8Rng,
    memory: Vec<u8>,
    connected: bool,

    // Statistics
    connects: u64,
    disconnects: u64,
    exchanges: Vec<Command>,
}

impl SimulatedTag {
    /// Create a blank (all-zero) tag.
    pub fn new(config: SimConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let memory = vec![0u8; config.block_size * config.block_count];

        Self {
            config,
            rng,
            memory,
            connected: false,
            connects: 0,
            disconnects: 0,
            exchanges: Vec::new(),
        }
    }

    /// Overwrite raw tag memory starting at block 0, as if written earlier.
    pub fn load(&mut self, bytes: &[u8]) {
        let len = bytes.len().min(self.memory.len());
        self.memory[..len].copy_from_slice(&bytes[..len]);
    }

    /// Raw contents of all blocks.
    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    /// Contents of one block, if it exists.
    pub fn block(&self, index: usize) -> Option<&[u8]> {
        let start = index * self.config.block_size;
        self.memory.get(start..start + self.config.block_size)
    }

    /// Every command received, in order.
    pub fn exchanges(&self) -> &[Command] {
        &self.exchanges
    }

    /// Block indices of received write commands, in order.
    pub fn write_log(&self) -> Vec<u8> {
        self.log_for(INS_WRITE)
    }

    /// Block indices of received read commands, in order.
    pub fn read_log(&self) -> Vec<u8> {
        self.log_for(INS_READ)
    }

    pub fn connects(&self) -> u64 {
        self.connects
    }

    pub fn disconnects(&self) -> u64 {
        self.disconnects
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    fn log_for(&self, instruction: u8) -> Vec<u8> {
        self.exchanges
            .iter()
            .filter(|c| c.instruction == instruction)
            .map(Command::block_index)
            .collect()
    }

    fn write(&mut self, index: usize, data: &[u8]) -> StatusWord {
        if index >= self.config.block_count {
            return StatusWord::NOT_FOUND;
        }
        if data.len() > self.config.block_size {
            return WRONG_LENGTH;
        }
        if self.config.fail_write_at == Some(index) {
            return StatusWord::MEMORY_FAILURE;
        }
        if self.config.write_failure_rate > 0.0 {
            let roll: f64 = self.rng.gen();
            if roll < self.config.write_failure_rate {
                return StatusWord::MEMORY_FAILURE;
            }
        }

        let start = index * self.config.block_size;
        self.memory[start..start + data.len()].copy_from_slice(data);
        StatusWord::SUCCESS
    }

    fn read(&self, index: usize, expected_len: Option<u8>) -> Response {
        if self.config.fail_read_at == Some(index) {
            return Response::status_only(StatusWord::NOT_ALLOWED);
        }
        let Some(block) = self.block(index) else {
            return Response::status_only(StatusWord::NOT_FOUND);
        };

        let len = expected_len
            .map(|le| le as usize)
            .unwrap_or(block.len())
            .min(block.len());
        Response::new(block[..len].to_vec(), StatusWord::SUCCESS)
    }
}

impl Transport for SimulatedTag {
    fn connect(&mut self) -> Result<(), TransportError> {
        if self.config.unavailable {
            return Err(TransportError::Unavailable(
                "no reader detected".to_string(),
            ));
        }
        if self.connected {
            return Err(TransportError::Unavailable("reader in use".to_string()));
        }
        self.connected = true;
        self.connects += 1;
        Ok(())
    }

    fn transmit(&mut self, command: &Command) -> Result<Response, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }

        let exchange = self.exchanges.len();
        self.exchanges.push(command.clone());

        if self.config.fail_link_at == Some(exchange) {
            return Err(TransportError::Link(format!(
                "exchange {exchange} lost"
            )));
        }

        let index = command.block_index() as usize;
        let response = match command.instruction {
            INS_WRITE => Response::status_only(self.write(index, &command.data)),
            INS_READ => self.read(index, command.expected_len),
            _ => Response::status_only(INS_NOT_SUPPORTED),
        };
        Ok(response)
    }

    fn disconnect(&mut self) {
        if self.connected {
            self.connected = false;
            self.disconnects += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected(config: SimConfig) -> SimulatedTag {
        let mut tag = SimulatedTag::new(config);
        tag.connect().unwrap();
        tag
    }

    #[test]
    fn test_blank_tag_reads_zeros() {
        let mut tag = connected(SimConfig::default());
        let response = tag.transmit(&Command::read_block(4, 16)).unwrap();

        assert!(response.is_success());
        assert_eq!(response.data, vec![0u8; 16]);
    }

    #[test]
    fn test_write_then_read() {
        let mut tag = connected(SimConfig::default());
        let response = tag.transmit(&Command::write_block(2, b"hello").unwrap()).unwrap();
        assert!(response.is_success());

        let response = tag.transmit(&Command::read_block(2, 16)).unwrap();
        assert_eq!(&response.data[..5], b"hello");
        assert_eq!(tag.write_log(), vec![2]);
        assert_eq!(tag.read_log(), vec![2]);
    }

    #[test]
    fn test_read_past_end() {
        let mut tag = connected(SimConfig {
            block_count: 2,
            ..SimConfig::default()
        });
        let response = tag.transmit(&Command::read_block(2, 16)).unwrap();
        assert_eq!(response.status, StatusWord::NOT_FOUND);
    }

    #[test]
    fn test_injected_write_fault() {
        let mut tag = connected(SimConfig {
            fail_write_at: Some(1),
            ..SimConfig::default()
        });
        let response = tag.transmit(&Command::write_block(1, b"x").unwrap()).unwrap();
        assert_eq!(response.status, StatusWord::MEMORY_FAILURE);
        assert_eq!(tag.block(1), Some(&[0u8; 16][..]));
    }

    #[test]
    fn test_link_fault() {
        let mut tag = connected(SimConfig {
            fail_link_at: Some(1),
            ..SimConfig::default()
        });
        assert!(tag.transmit(&Command::read_block(0, 16)).is_ok());
        assert!(matches!(
            tag.transmit(&Command::read_block(1, 16)),
            Err(TransportError::Link(_))
        ));
    }

    #[test]
    fn test_random_write_faults_deterministic() {
        let run = |seed| {
            let mut tag = connected(SimConfig {
                write_failure_rate: 0.5,
                seed,
                ..SimConfig::default()
            });
            (0..15u8)
                .map(|i| tag.transmit(&Command::write_block(i, b"a").unwrap()).unwrap().status)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(7), run(7));
    }

    #[test]
    fn test_double_connect_rejected() {
        let mut tag = connected(SimConfig::default());
        assert!(matches!(tag.connect(), Err(TransportError::Unavailable(_))));
    }
}
