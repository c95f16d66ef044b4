//! tagblock: write a patient record to a simulated tag and read it back.

mod config;
mod sample;

use anyhow::Result;
use clap::Parser;
use config::{Cli, Config};
use tagblock_core::metrics::Metrics;
use tagblock_core::sim::SimulatedTag;
use tagblock_core::{Record, TagReader, TagWriter, PATIENT_FIELDS};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_tracing();

    let config = Config::from_cli(Cli::parse())?;
    if config.print_config {
        config.print();
    }
    tracing::info!(seed = config.seed, residue = ?config.tag.residue, "starting");

    let values = config
        .values
        .clone()
        .unwrap_or_else(|| sample::generate_sample_values(config.seed));
    let record = Record::from_parts(&PATIENT_FIELDS[..values.len().min(PATIENT_FIELDS.len())], &values)?;
    record.require_non_empty(&["Doctor", "Patient Name"])?;

    let mut tag = SimulatedTag::new(config.sim.clone());
    let mut writer = TagWriter::new(config.tag.clone());
    let mut reader = TagReader::new(config.tag.clone());

    match writer.write(&mut tag, &record) {
        Ok(outcome) => {
            println!(
                "✓ Wrote {} bytes in {} blocks ({} cleared){}",
                outcome.payload_len,
                outcome.blocks_written,
                outcome.blocks_cleared,
                if outcome.truncated { ", truncated" } else { "" }
            );
        }
        Err(err) => {
            println!("✗ Write failed: {err}");
            println!("  Blocks written before the failure stay on the tag.");
        }
    }

    let names: Vec<&str> = record.names().collect();
    let read_back = reader.read(&mut tag, &names)?;

    println!("\n=== Read Back ({:?}) ===", reader.state());
    for (name, value) in read_back.iter() {
        let marker = if record.get(name) == Some(value) { " " } else { "≠" };
        println!("{marker} {name}: {value}");
    }

    if read_back == record {
        println!("\n✓ Record verified");
    } else {
        println!("\n✗ Record differs from what was written");
    }

    if config.print_metrics {
        combined_metrics(writer.metrics(), reader.metrics()).print_summary();
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn combined_metrics(write: &Metrics, read: &Metrics) -> Metrics {
    let mut metrics = write.clone();
    metrics.exchanges += read.exchanges;
    metrics.blocks_read = read.blocks_read;
    metrics.bytes_decoded = read.bytes_decoded;
    metrics.early_stops = read.early_stops;
    metrics.end_time = read.end_time.or(write.end_time);
    metrics
}
