//! Saleae Logic 2 `.sal` capture containers.
//!
//! A `.sal` file is a zip archive holding a `meta.json` description of the
//! capture and one binary export per channel. Only the metadata fields this
//! crate consumes are deserialized; everything else in `meta.json` is
//! ignored, so newer Logic 2 metadata versions keep loading.

use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use std::time::{Duration, SystemTime};

use zip::ZipArchive;

use crate::binary_file::{AnalogFile, BinaryFileError, DigitalFile};

const METADATA_NAME: &str = "meta.json";

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("malformed meta.json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no meta.json in capture")]
    MissingMetadata,

    #[error("capture member {name:?} not found")]
    MissingMember { name: String },

    #[error("unknown binary data type {kind:?}")]
    UnknownBinaryType { kind: String },

    #[error("reading capture member {name:?}: {source}")]
    BinaryFile {
        name: String,
        source: BinaryFileError,
    },
}

/// A loaded Logic 2 capture: start-of-capture wall time plus every digital
/// and analog channel, each kept in `meta.json` order.
#[derive(Debug, Clone)]
pub struct Capture {
    pub capture_start: SystemTime,
    pub digital: Vec<DigitalFile>,
    pub analog: Vec<AnalogFile>,
}

impl Capture {
    /// Open a `.sal` capture from a file on disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CaptureError> {
        Self::read(File::open(path)?)
    }

    /// Read a `.sal` capture from `reader`.
    pub fn read<R: Read + Seek>(reader: R) -> Result<Self, CaptureError> {
        let mut archive = ZipArchive::new(reader)?;
        let metadata = read_metadata(&mut archive)?;
        log::debug!(
            "capture metadata version {}, {} channel files",
            metadata.version,
            metadata.bin_data.len()
        );

        let mut capture = Self {
            capture_start: start_time(&metadata.data.capture_start_time),
            digital: Vec::new(),
            analog: Vec::new(),
        };
        for entry in &metadata.bin_data {
            // Logic 2 stores member paths with a leading "./".
            let name = entry.file.trim_start_matches(['.', '/']);
            match entry.kind.as_str() {
                "Digital" => {
                    let mut member = Cursor::new(read_member(&mut archive, name)?);
                    capture
                        .digital
                        .push(DigitalFile::read(&mut member).map_err(|source| {
                            CaptureError::BinaryFile {
                                name: name.to_string(),
                                source,
                            }
                        })?);
                }
                "Analog" => {
                    let mut member = Cursor::new(read_member(&mut archive, name)?);
                    capture
                        .analog
                        .push(AnalogFile::read(&mut member).map_err(|source| {
                            CaptureError::BinaryFile {
                                name: name.to_string(),
                                source,
                            }
                        })?);
                }
                _ => {
                    return Err(CaptureError::UnknownBinaryType {
                        kind: entry.kind.clone(),
                    })
                }
            }
        }
        log::debug!(
            "loaded capture with {} digital and {} analog channels",
            capture.digital.len(),
            capture.analog.len()
        );
        Ok(capture)
    }
}

fn read_metadata<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Metadata, CaptureError> {
    let meta_file = match archive.by_name(METADATA_NAME) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Err(CaptureError::MissingMetadata),
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_reader(meta_file)?)
}

fn read_member<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Vec<u8>, CaptureError> {
    let mut member = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(CaptureError::MissingMember {
                name: name.to_string(),
            })
        }
        Err(e) => return Err(e.into()),
    };
    let mut buf = Vec::new();
    member.read_to_end(&mut buf)?;
    Ok(buf)
}

fn start_time(ts: &CaptureStartTime) -> SystemTime {
    let nanos = ts
        .unix_time_milliseconds
        .saturating_mul(1_000_000)
        .saturating_add((ts.fractional_milliseconds * 1e6) as i64);
    if nanos >= 0 {
        SystemTime::UNIX_EPOCH + Duration::from_nanos(nanos as u64)
    } else {
        SystemTime::UNIX_EPOCH - Duration::from_nanos(nanos.unsigned_abs())
    }
}

/// Subset of `meta.json` this crate consumes.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Metadata {
    version: i64,
    data: MetadataData,
    bin_data: Vec<BinDataEntry>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct MetadataData {
    capture_start_time: CaptureStartTime,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CaptureStartTime {
    unix_time_milliseconds: i64,
    fractional_milliseconds: f64,
}

#[derive(Debug, serde::Deserialize)]
struct BinDataEntry {
    #[serde(rename = "type")]
    kind: String,
    file: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    fn build_capture_zip(meta: &str, members: &[(&str, Vec<u8>)]) -> Cursor<Vec<u8>> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        if !meta.is_empty() {
            zip.start_file(METADATA_NAME, SimpleFileOptions::default())
                .unwrap();
            zip.write_all(meta.as_bytes()).unwrap();
        }
        for (name, bytes) in members {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(bytes).unwrap();
        }
        zip.finish().unwrap()
    }

    fn encode_digital(file: &DigitalFile) -> Vec<u8> {
        let mut buf = Vec::new();
        file.write_to(&mut buf).unwrap();
        buf
    }

    fn encode_analog(file: &AnalogFile) -> Vec<u8> {
        let mut buf = Vec::new();
        file.write_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_reads_capture() {
        let clock = DigitalFile::new(false, vec![1.0, 1.5, 2.0, 2.5]);
        let voltage = AnalogFile::new(0.0, 5_000_000, 1, vec![0.0, 1.65, 3.3]);
        let meta = r#"{
            "version": 15,
            "data": {
                "captureStartTime": {
                    "unixTimeMilliseconds": 1700000000000,
                    "fractionalMilliseconds": 0.25
                }
            },
            "binData": [
                {"type": "Digital", "index": 0, "file": "./digital-0.bin"},
                {"type": "Analog", "index": 1, "file": "analog-1.bin"}
            ]
        }"#;
        let archive = build_capture_zip(
            meta,
            &[
                ("digital-0.bin", encode_digital(&clock)),
                ("analog-1.bin", encode_analog(&voltage)),
            ],
        );

        let capture = Capture::read(archive).unwrap();
        assert_eq!(capture.digital.len(), 1);
        assert_eq!(capture.analog.len(), 1);
        assert_eq!(capture.digital[0], clock);
        assert_eq!(capture.analog[0], voltage);

        let expected =
            SystemTime::UNIX_EPOCH + Duration::from_nanos(1_700_000_000_000 * 1_000_000 + 250_000);
        assert_eq!(capture.capture_start, expected);
    }

    #[test]
    fn test_capture_channels_feed_the_spi_analyzer() {
        use crate::analyzers::spi::SpiAnalyzer;

        // Clock rising at t = 1..=8, enable window [0.5, 9.0], data-out
        // encoding 0x3C and data-in encoding 0x81 MSB first.
        let mut clock_transitions = Vec::new();
        for t in 1..=8 {
            clock_transitions.push(f64::from(t));
            clock_transitions.push(f64::from(t) + 0.25);
        }
        let clock = DigitalFile::new(false, clock_transitions);
        let enable = DigitalFile::new(true, vec![0.5, 9.0]);
        let sdo = DigitalFile::new(false, vec![2.5, 6.5]);
        let sdi = DigitalFile::new(true, vec![1.5, 7.5]);

        let meta = r#"{
            "version": 15,
            "data": {"captureStartTime": {"unixTimeMilliseconds": 0, "fractionalMilliseconds": 0.0}},
            "binData": [
                {"type": "Digital", "index": 0, "file": "./digital-0.bin"},
                {"type": "Digital", "index": 1, "file": "./digital-1.bin"},
                {"type": "Digital", "index": 2, "file": "./digital-2.bin"},
                {"type": "Digital", "index": 3, "file": "./digital-3.bin"}
            ]
        }"#;
        let archive = build_capture_zip(
            meta,
            &[
                ("digital-0.bin", encode_digital(&clock)),
                ("digital-1.bin", encode_digital(&enable)),
                ("digital-2.bin", encode_digital(&sdo)),
                ("digital-3.bin", encode_digital(&sdi)),
            ],
        );

        let capture = Capture::read(archive).unwrap();
        assert_eq!(capture.digital.len(), 4);

        let txs = SpiAnalyzer
            .scan(
                &capture.digital[0],
                &capture.digital[1],
                &capture.digital[2],
                &capture.digital[3],
            )
            .unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].sdo, vec![0x3C]);
        assert_eq!(txs[0].sdi, vec![0x81]);
        assert_eq!(txs[0].start_time(), 1.0);
        assert_eq!(txs[0].end_time(), 8.0);
    }

    #[test]
    fn test_missing_metadata() {
        let clock = DigitalFile::new(false, vec![1.0]);
        let archive = build_capture_zip("", &[("digital-0.bin", encode_digital(&clock))]);

        let err = Capture::read(archive).unwrap_err();
        assert!(matches!(err, CaptureError::MissingMetadata));
    }

    #[test]
    fn test_unknown_binary_type() {
        let meta = r#"{
            "version": 15,
            "data": {"captureStartTime": {"unixTimeMilliseconds": 0, "fractionalMilliseconds": 0.0}},
            "binData": [{"type": "Fancy", "index": 0, "file": "fancy-0.bin"}]
        }"#;
        let archive = build_capture_zip(meta, &[]);

        let err = Capture::read(archive).unwrap_err();
        match err {
            CaptureError::UnknownBinaryType { kind } => assert_eq!(kind, "Fancy"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_member() {
        let meta = r#"{
            "version": 15,
            "data": {"captureStartTime": {"unixTimeMilliseconds": 0, "fractionalMilliseconds": 0.0}},
            "binData": [{"type": "Digital", "index": 0, "file": "./digital-0.bin"}]
        }"#;
        let archive = build_capture_zip(meta, &[]);

        let err = Capture::read(archive).unwrap_err();
        match err {
            CaptureError::MissingMember { name } => assert_eq!(name, "digital-0.bin"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_wraps_member_read_errors() {
        let meta = r#"{
            "version": 15,
            "data": {"captureStartTime": {"unixTimeMilliseconds": 0, "fractionalMilliseconds": 0.0}},
            "binData": [{"type": "Digital", "index": 0, "file": "digital-0.bin"}]
        }"#;
        let archive = build_capture_zip(meta, &[("digital-0.bin", b"not a saleae file".to_vec())]);

        let err = Capture::read(archive).unwrap_err();
        match err {
            CaptureError::BinaryFile { name, source } => {
                assert_eq!(name, "digital-0.bin");
                assert!(matches!(source, BinaryFileError::BadMagic));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
