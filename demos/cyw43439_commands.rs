// CYW43439 gSPI command interpretation example
//
// This example decodes SPI transactions from a capture of a CYW43439 WiFi
// chip's gSPI bus and interprets the first word of each transaction as a
// register-access command. Consecutive identical commands are coalesced
// into a single report line.

use clap::Parser;
use saleae_rs::{DigitalFile, SpiAnalyzer, SpiTransaction};
use std::fmt;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cyw43439_commands")]
#[command(version = "1.0")]
#[command(about = "Interpret decoded SPI traffic as CYW43439 gSPI commands")]
struct Args {
    /// Clock channel export
    clock: PathBuf,

    /// Enable (chip select) channel export
    enable: PathBuf,

    /// Data-out (MOSI) channel export
    sdo: PathBuf,

    /// Data-in (MISO) channel export
    sdi: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, help = "Show debug information and detailed logs")]
    verbose: bool,
}

/// gSPI access function encoded in bits 29:28 of a command word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Function {
    /// All SPI-specific registers.
    Bus,
    /// Registers and memories belonging to other blocks in the chip.
    Backplane,
    /// DMA channel 1. WLAN packets up to 2048 bytes.
    Wlan,
    /// DMA channel 2 (optional).
    Dma2,
}

impl Function {
    fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0b00 => Function::Bus,
            0b01 => Function::Backplane,
            0b10 => Function::Wlan,
            _ => Function::Dma2,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Function::Bus => "bus",
            Function::Backplane => "backplane",
            Function::Wlan => "wlan",
            Function::Dma2 => "dma2",
        }
    }
}

/// One 32-bit little-endian gSPI register-access command word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cyw43439Cmd {
    write: bool,
    autoinc: bool,
    function: Function,
    addr: u32,
    size: u32,
}

impl fmt::Display for Cyw43439Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "addr={:#7x}  fn={:>9}  sz={:4} write={:5} autoinc={:5}",
            self.addr,
            self.function.as_str(),
            self.size,
            self.write,
            self.autoinc,
        )
    }
}

/// Split a transaction's data-out bytes into the command word and payload.
/// Backplane reads carry 4 padding bytes before the payload.
fn command_from_bytes(b: &[u8]) -> Option<(Cyw43439Cmd, &[u8])> {
    let word = u32::from_le_bytes(b.get(..4)?.try_into().ok()?);
    let cmd = Cyw43439Cmd {
        write: word & (1 << 31) != 0,
        autoinc: word & (1 << 30) != 0,
        function: Function::from_bits(word >> 28),
        addr: (word >> 11) & 0x1ffff,
        size: word & ((1 << 11) - 1),
    };
    let data = if cmd.function == Function::Backplane && !cmd.write && b.len() > 8 {
        &b[8..]
    } else {
        &b[4..]
    };
    Some((cmd, data))
}

fn report(transactions: &[SpiTransaction]) {
    let mut i = 0;
    while i < transactions.len() {
        let Some((cmd, data)) = command_from_bytes(&transactions[i].sdo) else {
            eprintln!(
                "transaction {} too short for a gSPI command ({} bytes)",
                i,
                transactions[i].sdo.len()
            );
            i += 1;
            continue;
        };
        let mut count = 1;
        while let Some(next) = transactions.get(i + count) {
            match command_from_bytes(&next.sdo) {
                Some((next_cmd, next_data)) if next_cmd == cmd && next_data == data => count += 1,
                _ => break,
            }
        }
        println!("cmd×{count:2} {cmd} data=0x{}", hex_bytes(data));
        i += count;
    }
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
    println!("CYW43439 gSPI Command Report");
    println!("============================");
    println!("Decoded {} transactions\n", transactions.len());

    report(&transactions);
    Ok(())
}

fn hex_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
