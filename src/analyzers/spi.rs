//! SPI transaction decoder for digital capture channels.
//!
//! Reconstructs byte-level SPI traffic from four digital lines: clock,
//! enable (chip select), data-out and data-in. Bits are sampled on rising
//! clock edges while the enable line is low, packed MSB first into 8-bit
//! symbols, and grouped into one [`SpiTransaction`] per enable window.

use std::fmt;
use std::mem;

use crate::binary_file::DigitalFile;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("{line} transition {index} is out of order or not finite")]
    UnorderedTransitions { line: Line, index: usize },
}

/// The digital lines a scan consumes, used to attribute input errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    Clock,
    Enable,
    Sdo,
    Sdi,
}

impl Line {
    pub fn as_str(&self) -> &'static str {
        match self {
            Line::Clock => "clock",
            Line::Enable => "enable",
            Line::Sdo => "sdo",
            Line::Sdi => "sdi",
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sampling-edge span of one decoded byte, in capture seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ByteInterval {
    /// Rising clock edge that sampled the byte's first bit.
    pub start: f64,
    /// Rising clock edge that sampled the byte's eighth bit.
    pub end: f64,
}

/// One SPI transaction: the bytes shifted in each direction while the
/// enable line stayed asserted, with the sampling span of every byte.
///
/// `sdo`, `sdi` and `byte_intervals` always have the same length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpiTransaction {
    /// Data-out bytes, a.k.a. MOSI.
    pub sdo: Vec<u8>,
    /// Data-in bytes, a.k.a. MISO.
    pub sdi: Vec<u8>,
    /// Sampling span of each byte, aligned with `sdo` and `sdi`.
    pub byte_intervals: Vec<ByteInterval>,
}

impl SpiTransaction {
    /// Number of bytes shifted in each direction.
    pub fn len(&self) -> usize {
        self.sdo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sdo.is_empty()
    }

    /// Sampling time of the first bit, NaN for an empty transaction.
    pub fn start_time(&self) -> f64 {
        self.byte_intervals.first().map_or(f64::NAN, |iv| iv.start)
    }

    /// Sampling time of the last complete bit, NaN for an empty transaction.
    pub fn end_time(&self) -> f64 {
        self.byte_intervals.last().map_or(f64::NAN, |iv| iv.end)
    }
}

/// Walks one digital line in step with the clock scan: holds the current
/// level and consumes transitions lazily as their timestamps come due.
struct LineCursor<'a> {
    line: Line,
    level: bool,
    transitions: &'a [f64],
    next: usize,
}

impl<'a> LineCursor<'a> {
    fn new(line: Line, file: &'a DigitalFile) -> Self {
        Self {
            line,
            level: file.initial_level(),
            transitions: &file.data,
            next: 0,
        }
    }

    /// Consume the next transition if it is due at or before `t` and return
    /// the new level, or `None` once the line is settled up to `t`.
    fn step(&mut self, t: f64) -> Result<Option<bool>, ScanError> {
        let Some(&ts) = self.transitions.get(self.next) else {
            return Ok(None);
        };
        if ts > t {
            return Ok(None);
        }
        let ordered = ts.is_finite() && (self.next == 0 || ts > self.transitions[self.next - 1]);
        if !ordered {
            return Err(ScanError::UnorderedTransitions {
                line: self.line,
                index: self.next,
            });
        }
        self.next += 1;
        self.level = !self.level;
        Ok(Some(self.level))
    }

    /// Level of the line at `t`, consuming every transition up to and
    /// including `t`.
    fn level_at(&mut self, t: f64) -> Result<bool, ScanError> {
        while self.step(t)?.is_some() {}
        Ok(self.level)
    }
}

/// Decoder for SPI traffic on four digital capture channels.
///
/// Only mode 0 is supported: bits are sampled on the rising clock edge,
/// shifted MSB first, 8 bits per transfer, enable line active low. Bits
/// left over when a transaction seals with a partial byte in flight are
/// dropped without a report, so a trailing partial symbol is invisible in
/// the output.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpiAnalyzer;

impl SpiAnalyzer {
    /// Scan the four lines and return every decoded transaction in
    /// time order.
    ///
    /// An enable transition landing exactly on a rising clock edge takes
    /// effect before the bit sample, so a deassertion at the edge excludes
    /// that edge's bit and an assertion at the edge includes it.
    pub fn scan(
        &self,
        clock: &DigitalFile,
        enable: &DigitalFile,
        sdo: &DigitalFile,
        sdi: &DigitalFile,
    ) -> Result<Vec<SpiTransaction>, ScanError> {
        let mut enable_cursor = LineCursor::new(Line::Enable, enable);
        let mut sdo_cursor = LineCursor::new(Line::Sdo, sdo);
        let mut sdi_cursor = LineCursor::new(Line::Sdi, sdi);

        let mut transactions = Vec::new();
        let mut current = SpiTransaction::default();
        let mut sdo_byte = 0u8;
        let mut sdi_byte = 0u8;
        let mut bit_idx = 0u8;
        let mut byte_start = 0.0_f64;

        // Rising edges sit at odd indices when the clock starts high, even
        // indices when it starts low.
        let mut edge_idx = usize::from(clock.initial_level());
        let mut last_edge = f64::NEG_INFINITY;
        while let Some(&t) = clock.data.get(edge_idx) {
            if !t.is_finite() || t <= last_edge {
                return Err(ScanError::UnorderedTransitions {
                    line: Line::Clock,
                    index: edge_idx,
                });
            }
            last_edge = t;
            edge_idx += 2;

            // Apply every enable flip due by this edge. A flip to the
            // deasserted level seals the transaction in flight, dropping
            // any partial byte.
            while let Some(level) = enable_cursor.step(t)? {
                let deasserted = level;
                if deasserted && !current.is_empty() {
                    log::trace!(
                        "sealed transaction with {} bytes at t={t}",
                        current.len()
                    );
                    transactions.push(mem::take(&mut current));
                    sdo_byte = 0;
                    sdi_byte = 0;
                    bit_idx = 0;
                }
            }
            if enable_cursor.level {
                continue;
            }

            let sdo_level = sdo_cursor.level_at(t)?;
            let sdi_level = sdi_cursor.level_at(t)?;

            if bit_idx == 0 {
                byte_start = t;
            }
            sdo_byte |= u8::from(sdo_level) << (7 - bit_idx);
            sdi_byte |= u8::from(sdi_level) << (7 - bit_idx);
            bit_idx += 1;
            if bit_idx == 8 {
                current.sdo.push(sdo_byte);
                current.sdi.push(sdi_byte);
                current.byte_intervals.push(ByteInterval {
                    start: byte_start,
                    end: t,
                });
                sdo_byte = 0;
                sdi_byte = 0;
                bit_idx = 0;
            }
        }
        // Capture ended with the enable window still open.
        if !current.is_empty() {
            transactions.push(current);
        }
        log::debug!("SPI scan decoded {} transactions", transactions.len());
        Ok(transactions)
    }
}
