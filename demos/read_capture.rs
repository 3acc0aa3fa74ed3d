// Capture inspection example
//
// This example opens a Saleae Logic 2 .sal capture and prints a summary of
// the capture start time and every contained channel.

use clap::Parser;
use saleae_rs::Capture;
use std::path::PathBuf;
use std::time::SystemTime;

#[derive(Parser)]
#[command(name = "read_capture")]
#[command(version = "1.0")]
#[command(about = "Summarize a Saleae Logic 2 .sal capture")]
struct Args {
    /// Path to the .sal capture file
    capture: PathBuf,

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

    println!("Saleae Capture Summary");
    println!("======================");
    println!("File: {}", args.capture.display());

    let capture = Capture::open(&args.capture)?;

    match capture.capture_start.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(start) => println!(
            "Capture started at unix time {}.{:03}",
            start.as_secs(),
            start.subsec_millis()
        ),
        Err(_) => println!("Capture start predates the unix epoch"),
    }
    println!();

    println!("Digital channels: {}", capture.digital.len());
    for (i, channel) in capture.digital.iter().enumerate() {
        println!(
            "  [{}] {} transitions over [{:.6}s, {:.6}s], starts {}",
            i,
            channel.data.len(),
            channel.header.begin,
            channel.header.end,
            if channel.initial_level() { "high" } else { "low" },
        );
    }

    println!("Analog channels: {}", capture.analog.len());
    for (i, channel) in capture.analog.iter().enumerate() {
        println!(
            "  [{}] {} samples at {} S/s (downsample {})",
            i,
            channel.data.len(),
            channel.header.sample_rate,
            channel.header.downsample,
        );
    }

    Ok(())
}
