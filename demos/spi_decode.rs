// SPI decoding example
//
// This example decodes SPI transactions from four exported digital channel
// files (clock, enable, data-out, data-in) and prints each transaction with
// its byte payloads and timing.

use clap::Parser;
use saleae_rs::{DigitalFile, SpiAnalyzer};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "spi_decode")]
#[command(version = "1.0")]
#[command(about = "Decode SPI transactions from exported digital channels")]
#[command(
    long_about = "Decode SPI byte transactions from four Saleae binary channel exports. \
Mode 0, MSB first, 8 bits per transfer, enable active low."
)]
struct Args {
    /// Clock channel export
    clock: PathBuf,

    /// Enable (chip select) channel export
    enable: PathBuf,

    /// Data-out (MOSI) channel export
    sdo: PathBuf,

    /// Data-in (MISO) channel export
    sdi: PathBuf,

    /// Maximum number of transactions to print
    #[arg(short, long, help = "Stop printing after this many transactions")]
    limit: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long, help = "Show debug information and detailed logs")]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }

    let clock = DigitalFile::open(&args.clock)?;
    let enable = DigitalFile::open(&args.enable)?;
    let sdo = DigitalFile::open(&args.sdo)?;
    let sdi = DigitalFile::open(&args.sdi)?;

    let transactions = SpiAnalyzer.scan(&clock, &enable, &sdo, &sdi)?;

    println!("SPI Transaction Decoder");
    println!("=======================");
    println!("Decoded {} transactions\n", transactions.len());

    let limit = args.limit.unwrap_or(usize::MAX);
    println!("{:>4}  {:>12}  {:>12}  {:>5}  sdo / sdi", "#", "start [s]", "end [s]", "bytes");
    for (i, tx) in transactions.iter().take(limit).enumerate() {
        println!(
            "{:>4}  {:>12.6}  {:>12.6}  {:>5}  {} / {}",
            i,
            tx.start_time(),
            tx.end_time(),
            tx.len(),
            hex_bytes(&tx.sdo),
            hex_bytes(&tx.sdi),
        );
    }
    if transactions.len() > limit {
        println!("... {} more not shown", transactions.len() - limit);
    }

    Ok(())
}

fn hex_bytes(bytes: &[u8]) -> String {
    let hex: Vec<String> = bytes.iter().map(|b| format!("{b:02x}")).collect();
    hex.join(" ")
}
