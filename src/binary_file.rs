//! Version 0 Saleae Logic 2 binary export files.
//!
//! Logic 2 exports each captured channel as a standalone binary file with an
//! 8-byte `<SALEAE>` magic, a little-endian header and a packed `f64`
//! payload. Digital channels store transition timestamps in seconds, analog
//! channels store voltage samples.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

const MAGIC: [u8; 8] = *b"<SALEAE>";
const SUPPORTED_VERSION: i32 = 0;

#[derive(Debug, thiserror::Error)]
pub enum BinaryFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a Saleae binary file, bad magic")]
    BadMagic,

    #[error("unsupported file version {got}, expected 0")]
    UnsupportedVersion { got: i32 },

    #[error("unknown file type tag {got}, expected 0 (digital) or 1 (analog)")]
    UnknownFileType { got: i32 },

    #[error("file type mismatch: expected {expected} data, got {got}")]
    FileTypeMismatch { expected: FileType, got: FileType },
}

/// Kind of channel data a binary export holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Digital,
    Analog,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Digital => "digital",
            FileType::Analog => "analog",
        }
    }

    fn tag(self) -> i32 {
        match self {
            FileType::Digital => 0,
            FileType::Analog => 1,
        }
    }

    fn from_tag(tag: i32) -> Result<Self, BinaryFileError> {
        match tag {
            0 => Ok(FileType::Digital),
            1 => Ok(FileType::Analog),
            got => Err(BinaryFileError::UnknownFileType { got }),
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common 16-byte header shared by digital and analog exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileHeader {
    version: i32,
    file_type: FileType,
}

impl FileHeader {
    fn read<R: Read>(r: &mut R) -> Result<Self, BinaryFileError> {
        let mut magic = [0u8; 8];
        r.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(BinaryFileError::BadMagic);
        }
        let version = r.read_i32::<LittleEndian>()?;
        let tag = r.read_i32::<LittleEndian>()?;
        if version != SUPPORTED_VERSION {
            return Err(BinaryFileError::UnsupportedVersion { got: version });
        }
        let file_type = FileType::from_tag(tag)?;
        Ok(Self { version, file_type })
    }

    fn expect(self, expected: FileType) -> Result<Self, BinaryFileError> {
        if self.file_type == expected {
            Ok(self)
        } else {
            Err(BinaryFileError::FileTypeMismatch {
                expected,
                got: self.file_type,
            })
        }
    }

    fn write<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_all(&MAGIC)?;
        w.write_i32::<LittleEndian>(self.version)?;
        w.write_i32::<LittleEndian>(self.file_type.tag())?;
        Ok(())
    }
}

/// Header of a digital channel export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DigitalHeader {
    /// Non-zero when the line starts high.
    pub initial_state: u32,
    /// Capture window start in seconds.
    pub begin: f64,
    /// Capture window end in seconds.
    pub end: f64,
    pub num_transitions: u64,
}

impl DigitalHeader {
    /// Level of the line before its first transition.
    pub fn initial_level(&self) -> bool {
        self.initial_state != 0
    }
}

/// A version 0 Saleae digital binary export.
///
/// `data` holds the timestamps (seconds) at which the line changed level,
/// strictly increasing. The line level at any time follows from
/// [`DigitalHeader::initial_level`] and the number of transitions at or
/// before that time.
#[derive(Debug, Clone, PartialEq)]
pub struct DigitalFile {
    pub header: DigitalHeader,
    pub data: Vec<f64>,
}

impl DigitalFile {
    /// Build an in-memory digital channel from a level and its transition
    /// times. The capture window is taken to span the transitions.
    pub fn new(initial_level: bool, transitions: Vec<f64>) -> Self {
        let header = DigitalHeader {
            initial_state: u32::from(initial_level),
            begin: transitions.first().copied().unwrap_or(0.0),
            end: transitions.last().copied().unwrap_or(0.0),
            num_transitions: transitions.len() as u64,
        };
        Self {
            header,
            data: transitions,
        }
    }

    /// Read a digital export from a file on disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, BinaryFileError> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::read(&mut reader)
    }

    /// Read a digital export from `r`.
    pub fn read<R: Read>(r: &mut R) -> Result<Self, BinaryFileError> {
        FileHeader::read(r)?.expect(FileType::Digital)?;
        let header = DigitalHeader {
            initial_state: r.read_u32::<LittleEndian>()?,
            begin: r.read_f64::<LittleEndian>()?,
            end: r.read_f64::<LittleEndian>()?,
            num_transitions: r.read_u64::<LittleEndian>()?,
        };
        let mut data = vec![0.0f64; header.num_transitions as usize];
        r.read_f64_into::<LittleEndian>(&mut data)?;
        log::debug!(
            "read digital export: {} transitions over [{}, {}]",
            data.len(),
            header.begin,
            header.end
        );
        Ok(Self { header, data })
    }

    /// Write the export to `w` in the version 0 layout. The stored
    /// transition count always tracks the payload length.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), BinaryFileError> {
        let info = FileHeader {
            version: SUPPORTED_VERSION,
            file_type: FileType::Digital,
        };
        info.write(w)?;
        w.write_u32::<LittleEndian>(self.header.initial_state)?;
        w.write_f64::<LittleEndian>(self.header.begin)?;
        w.write_f64::<LittleEndian>(self.header.end)?;
        w.write_u64::<LittleEndian>(self.data.len() as u64)?;
        for &t in &self.data {
            w.write_f64::<LittleEndian>(t)?;
        }
        Ok(())
    }

    /// Level of the line before its first transition.
    pub fn initial_level(&self) -> bool {
        self.header.initial_level()
    }
}

/// Header of an analog channel export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalogHeader {
    /// Capture window start in seconds.
    pub begin: f64,
    /// Device sample rate in samples per second.
    pub sample_rate: u64,
    /// Downsampling factor applied before export.
    pub downsample: u64,
    pub num_samples: u64,
}

/// A version 0 Saleae analog binary export. `data` holds voltage readings.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalogFile {
    pub header: AnalogHeader,
    pub data: Vec<f64>,
}

impl AnalogFile {
    /// Build an in-memory analog channel from its header fields and samples.
    pub fn new(begin: f64, sample_rate: u64, downsample: u64, samples: Vec<f64>) -> Self {
        let header = AnalogHeader {
            begin,
            sample_rate,
            downsample,
            num_samples: samples.len() as u64,
        };
        Self {
            header,
            data: samples,
        }
    }

    /// Read an analog export from a file on disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, BinaryFileError> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::read(&mut reader)
    }

    /// Read an analog export from `r`.
    pub fn read<R: Read>(r: &mut R) -> Result<Self, BinaryFileError> {
        FileHeader::read(r)?.expect(FileType::Analog)?;
        let header = AnalogHeader {
            begin: r.read_f64::<LittleEndian>()?,
            sample_rate: r.read_u64::<LittleEndian>()?,
            downsample: r.read_u64::<LittleEndian>()?,
            num_samples: r.read_u64::<LittleEndian>()?,
        };
        let mut data = vec![0.0f64; header.num_samples as usize];
        r.read_f64_into::<LittleEndian>(&mut data)?;
        log::debug!(
            "read analog export: {} samples at {} S/s",
            data.len(),
            header.sample_rate
        );
        Ok(Self { header, data })
    }

    /// Write the export to `w` in the version 0 layout. The stored sample
    /// count always tracks the payload length.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), BinaryFileError> {
        let info = FileHeader {
            version: SUPPORTED_VERSION,
            file_type: FileType::Analog,
        };
        info.write(w)?;
        w.write_f64::<LittleEndian>(self.header.begin)?;
        w.write_u64::<LittleEndian>(self.header.sample_rate)?;
        w.write_u64::<LittleEndian>(self.header.downsample)?;
        w.write_u64::<LittleEndian>(self.data.len() as u64)?;
        for &v in &self.data {
            w.write_f64::<LittleEndian>(v)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_digital_round_trip() {
        let file = DigitalFile::new(true, vec![0.5, 1.0, 2.25, 9.0]);
        let mut buf = Vec::new();
        file.write_to(&mut buf).unwrap();

        let read_back = DigitalFile::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(read_back, file);
        assert!(read_back.initial_level());
        assert_eq!(read_back.header.begin, 0.5);
        assert_eq!(read_back.header.end, 9.0);
        assert_eq!(read_back.header.num_transitions, 4);
    }

    #[test]
    fn test_digital_round_trip_empty() {
        let file = DigitalFile::new(false, Vec::new());
        let mut buf = Vec::new();
        file.write_to(&mut buf).unwrap();

        let read_back = DigitalFile::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(read_back, file);
        assert!(!read_back.initial_level());
        assert!(read_back.data.is_empty());
    }

    #[test]
    fn test_analog_round_trip() {
        let file = AnalogFile::new(0.0, 10_000_000, 1, vec![0.1, 3.3, 3.28, 0.05]);
        let mut buf = Vec::new();
        file.write_to(&mut buf).unwrap();

        let read_back = AnalogFile::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(read_back, file);
        assert_eq!(read_back.header.sample_rate, 10_000_000);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut buf = Vec::new();
        DigitalFile::new(false, vec![1.0]).write_to(&mut buf).unwrap();
        buf[0] = b'?';

        let err = DigitalFile::read(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, BinaryFileError::BadMagic));
    }

    #[test]
    fn test_rejects_unsupported_version() {
        let mut buf = Vec::new();
        DigitalFile::new(false, vec![1.0]).write_to(&mut buf).unwrap();
        // Version field sits right after the 8-byte magic.
        buf[8] = 3;

        let err = DigitalFile::read(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(
            err,
            BinaryFileError::UnsupportedVersion { got: 3 }
        ));
    }

    #[test]
    fn test_rejects_unknown_type_tag() {
        let mut buf = Vec::new();
        DigitalFile::new(false, vec![1.0]).write_to(&mut buf).unwrap();
        // Type tag sits after magic and version.
        buf[12] = 7;

        let err = DigitalFile::read(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, BinaryFileError::UnknownFileType { got: 7 }));
    }

    #[test]
    fn test_rejects_type_mismatch() {
        let mut buf = Vec::new();
        DigitalFile::new(true, vec![1.0, 2.0]).write_to(&mut buf).unwrap();

        let err = AnalogFile::read(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(
            err,
            BinaryFileError::FileTypeMismatch {
                expected: FileType::Analog,
                got: FileType::Digital,
            }
        ));
    }

    #[test]
    fn test_rejects_truncated_payload() {
        let mut buf = Vec::new();
        DigitalFile::new(false, vec![1.0, 2.0, 3.0]).write_to(&mut buf).unwrap();
        buf.truncate(buf.len() - 4);

        let err = DigitalFile::read(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, BinaryFileError::Io(_)));
    }
}
