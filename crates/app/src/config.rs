//! Configuration for the tagblock demo.
//!
//! Settings come from an optional TOML file and are then overridden by
//! command-line flags. With no arguments the tool writes a generated patient
//! record to a blank simulated tag and reads it back.
//!
//! ```toml
//! [tag]
//! block_size = 16
//! max_payload_bytes = 240
//! max_block_count = 15
//! residue = "terminate"
//!
//! [sim]
//! fail_write_at = 3
//! write_failure_rate = 0.0
//! ```

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tagblock_core::sim::SimConfig;
use tagblock_core::{ResiduePolicy, TagConfig, Truncation};

#[derive(Parser, Debug, Default)]
#[clap(name = "tagblock", about = "Write and read a patient record on a simulated tag")]
pub struct Cli {
    /// TOML file with [tag] and [sim] tables
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Field values in form order (Doctor, Patient Name, ...); generated when absent
    #[clap(long = "value")]
    pub values: Vec<String>,

    /// Random seed for sample data and simulated faults
    #[clap(long)]
    pub seed: Option<u64>,

    /// Bytes per block
    #[clap(long)]
    pub block_size: Option<usize>,

    /// Total payload budget in bytes
    #[clap(long)]
    pub max_payload: Option<usize>,

    /// Handling of blocks past the end of the record
    #[clap(long, value_enum)]
    pub residue: Option<ResidueArg>,

    /// Truncate on character boundaries instead of raw bytes
    #[clap(long)]
    pub char_boundary: bool,

    /// Make writes to this block fail
    #[clap(long)]
    pub fail_write_at: Option<usize>,

    /// Make reads of this block fail
    #[clap(long)]
    pub fail_read_at: Option<usize>,

    /// Probability that any write fails
    #[clap(long)]
    pub write_failure_rate: Option<f64>,

    /// Simulate a missing reader
    #[clap(long)]
    pub no_reader: bool,

    /// Print resolved configuration
    #[clap(long)]
    pub print_config: bool,

    /// Don't print metrics summary
    #[clap(long)]
    pub no_metrics: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResidueArg {
    Preserve,
    Terminate,
    Scrub,
}

impl From<ResidueArg> for ResiduePolicy {
    fn from(arg: ResidueArg) -> Self {
        match arg {
            ResidueArg::Preserve => ResiduePolicy::Preserve,
            ResidueArg::Terminate => ResiduePolicy::Terminate,
            ResidueArg::Scrub => ResiduePolicy::Scrub,
        }
    }
}

/// Contents of the TOML config file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    tag: Option<TagConfig>,
    sim: SimSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SimSection {
    fail_write_at: Option<usize>,
    fail_read_at: Option<usize>,
    write_failure_rate: Option<f64>,
    seed: Option<u64>,
}

/// Complete configuration for a run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Tag layout
    pub tag: TagConfig,

    /// Simulated reader behavior
    pub sim: SimConfig,

    /// Explicit field values (None = generate sample)
    pub values: Option<Vec<String>>,

    /// Seed used for sample data
    pub seed: u64,

    pub print_config: bool,
    pub print_metrics: bool,
}

impl Config {
    /// Resolve configuration from parsed flags and the optional config file.
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => load_file(path)?,
            None => FileConfig::default(),
        };

        let mut tag = file.tag.unwrap_or_default();
        if cli.block_size.is_some() || cli.max_payload.is_some() {
            let derived = TagConfig::with_capacity(
                cli.block_size.unwrap_or(tag.block_size),
                cli.max_payload.unwrap_or(tag.max_payload_bytes),
            );
            tag.block_size = derived.block_size;
            tag.max_payload_bytes = derived.max_payload_bytes;
            tag.max_block_count = derived.max_block_count;
        }
        if let Some(residue) = cli.residue {
            tag.residue = residue.into();
        }
        if cli.char_boundary {
            tag.truncation = Truncation::CharBoundary;
        }
        tag.validate().context("invalid tag configuration")?;

        let seed = cli.seed.or(file.sim.seed).unwrap_or_else(time_seed);

        let sim = SimConfig {
            fail_write_at: cli.fail_write_at.or(file.sim.fail_write_at),
            fail_read_at: cli.fail_read_at.or(file.sim.fail_read_at),
            write_failure_rate: cli
                .write_failure_rate
                .or(file.sim.write_failure_rate)
                .unwrap_or(0.0),
            unavailable: cli.no_reader,
            seed,
            ..SimConfig::from_tag(&tag)
        };

        let values = if cli.values.is_empty() {
            None
        } else {
            Some(cli.values)
        };

        Ok(Self {
            tag,
            sim,
            values,
            seed,
            print_config: cli.print_config,
            print_metrics: !cli.no_metrics,
        })
    }

    /// Print the configuration in human-readable form.
    pub fn print(&self) {
        println!("=== Configuration ===");
        println!("Seed: {}", self.seed);
        println!(
            "Values: {}",
            if self.values.is_some() { "from flags" } else { "(generate sample)" }
        );
        println!();
        println!("=== Tag Layout ===");
        println!("Block size: {} bytes", self.tag.block_size);
        println!("Max payload: {} bytes", self.tag.max_payload_bytes);
        println!("Max blocks: {}", self.tag.max_block_count);
        println!("Delimiter: {:?}", self.tag.delimiter as char);
        println!("Truncation: {:?}", self.tag.truncation);
        println!("Residue: {:?}", self.tag.residue);
        println!();
        println!("=== Simulated Reader ===");
        println!("Write fault at block: {:?}", self.sim.fail_write_at);
        println!("Read fault at block: {:?}", self.sim.fail_read_at);
        println!("Write failure rate: {:.2}%", self.sim.write_failure_rate * 100.0);
        println!("Reader present: {}", !self.sim.unavailable);
        println!();
    }
}

fn load_file(path: &Path) -> Result<FileConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let file = toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    Ok(file)
}

fn time_seed() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
