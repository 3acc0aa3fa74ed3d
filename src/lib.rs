//! # saleae-rs
//!
//! A Rust library for reading Saleae Logic 2 captures and decoding SPI
//! transactions from the recorded digital channels.
//!
//! The version 0 binary export format (one file per channel) and the `.sal`
//! capture container (zip with `meta.json`) are both supported. The SPI
//! analyzer reconstructs byte-level transactions from clock, enable,
//! data-out and data-in lines: mode 0, MSB first, 8 bits per transfer,
//! enable active low.
//!
//! ## Features
//!
//! - **Binary exports**: Read and write digital and analog channel files
//! - **Capture containers**: Open `.sal` archives with their metadata
//! - **SPI decoding**: Transaction records with per-byte sampling intervals
//! - **Type safety**: Strong typing and error handling throughout
//!
//! ## Examples
//!
//! ### Decoding SPI traffic from exported channels
//!
//! ```rust,no_run
//! use saleae_rs::{DigitalFile, SpiAnalyzer};
//!
//! let clock = DigitalFile::open("digital_spiclk.bin")?;
//! let enable = DigitalFile::open("digital_spics.bin")?;
//! let sdo = DigitalFile::open("digital_spisdo.bin")?;
//! let sdi = DigitalFile::open("digital_spisdi.bin")?;
//!
//! let transactions = SpiAnalyzer.scan(&clock, &enable, &sdo, &sdi)?;
//! for tx in &transactions {
//!     println!(
//!         "{} bytes starting at {:.6}s: {:02x?}",
//!         tx.len(),
//!         tx.start_time(),
//!         tx.sdo
//!     );
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Decoding synthetic lines
//!
//! ```rust
//! use saleae_rs::{DigitalFile, SpiAnalyzer};
//!
//! // Clock rising at t = 1..=8, enable asserted throughout, data-out
//! // high for the first four bits.
//! let clock = DigitalFile::new(
//!     false,
//!     vec![1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 4.5, 5.0, 5.5, 6.0, 6.5, 7.0, 7.5, 8.0, 8.5],
//! );
//! let enable = DigitalFile::new(false, vec![]);
//! let sdo = DigitalFile::new(true, vec![4.6]);
//! let sdi = DigitalFile::new(false, vec![]);
//!
//! let transactions = SpiAnalyzer.scan(&clock, &enable, &sdo, &sdi)?;
//! assert_eq!(transactions.len(), 1);
//! assert_eq!(transactions[0].sdo, vec![0xF0]);
//! # Ok::<(), saleae_rs::ScanError>(())
//! ```
//!
//! ### Opening a `.sal` capture
//!
//! ```rust,no_run
//! use saleae_rs::Capture;
//!
//! let capture = Capture::open("session.sal")?;
//! println!(
//!     "{} digital and {} analog channels",
//!     capture.digital.len(),
//!     capture.analog.len()
//! );
//! # Ok::<(), saleae_rs::CaptureError>(())
//! ```

pub mod analyzers;
pub mod binary_file;
pub mod capture;

// Re-export the main types for convenience
pub use binary_file::{
    AnalogFile, AnalogHeader, BinaryFileError, DigitalFile, DigitalHeader, FileType,
};

pub use capture::{Capture, CaptureError};

pub use analyzers::spi::{ByteInterval, Line, ScanError, SpiAnalyzer, SpiTransaction};
