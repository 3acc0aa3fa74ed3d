//! Protocol decoders that turn captured digital channels into
//! transaction-level records.

pub mod spi;

pub use spi::{ByteInterval, Line, ScanError, SpiAnalyzer, SpiTransaction};
