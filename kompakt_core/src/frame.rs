//! Binary framing shared by both codecs.
//!
//! Every single-file container and every archive starts with the same 8-byte
//! header:
//!
//! ```text
//! 0x00  4   magic (codec- and file/archive-specific)
//! 0x04  1   version (u8) = 1
//! 0x05  3   reserved (written as 0, not checked on read)
//! ```
//!
//! A single-file container continues with the codec body. An archive continues
//! with `entry_count: u32` and that many records of
//! `path_len: u32 · path (UTF-8, '/'-separated) · codec body`.
//!
//! All integers are little-endian. Fields carry no tags, so they must be read
//! in exactly the order they were written.

use crate::error::{Error, Result};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};

/// Four ASCII bytes identifying a container variant.
pub type Magic = [u8; 4];

/// Current container format version.
pub const VERSION: u8 = 1;

/// Size of the container header in bytes.
pub const HEADER_SIZE: usize = 8;

/// The fixed header at the start of every container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Container magic.
    pub magic: Magic,
    /// Container format version.
    pub version: u8,
}

impl FrameHeader {
    /// Create a header for the current version.
    pub fn new(magic: Magic) -> Self {
        Self {
            magic,
            version: VERSION,
        }
    }

    /// Encode the header to an 8-byte array.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.magic);
        buf[4] = self.version;
        // 5..8 reserved, left zero
        buf
    }

    /// Decode a header and check it against the expected magic and version.
    pub fn decode(buf: &[u8], expected: &Magic) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::format(format!(
                "Header too short: {} bytes (expected {})",
                buf.len(),
                HEADER_SIZE
            )));
        }

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&buf[0..4]);
        if &magic != expected {
            return Err(Error::format(format!(
                "Invalid magic: expected {}, got {}",
                magic_str(expected),
                magic_str(&magic)
            )));
        }

        let version = buf[4];
        if version != VERSION {
            return Err(Error::format(format!(
                "Unsupported version: {} (expected {})",
                version, VERSION
            )));
        }

        Ok(Self { magic, version })
    }
}

/// Printable form of a magic for error messages.
pub fn magic_str(magic: &Magic) -> String {
    magic.escape_ascii().to_string()
}

/// Write a container header.
pub fn write_header<W: Write>(writer: &mut W, magic: &Magic) -> Result<()> {
    writer.write_all(&FrameHeader::new(*magic).encode())?;
    Ok(())
}

/// Read a container header, failing on a short read, wrong magic or version.
pub fn read_header<R: Read>(reader: &mut R, expected: &Magic) -> Result<FrameHeader> {
    let mut buf = [0u8; HEADER_SIZE];
    read_exact(reader, &mut buf, "header")?;
    FrameHeader::decode(&buf, expected)
}

/// Read the first four bytes of a file.
pub fn read_magic(path: &Path) -> Result<Magic> {
    let mut file = fs::File::open(path)?;
    let mut magic = [0u8; 4];
    read_exact(&mut file, &mut magic, "magic").map_err(|err| match err {
        Error::Format { .. } => Error::format(format!(
            "Unable to read magic header from {}",
            path.display()
        )),
        other => other,
    })?;
    Ok(magic)
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8], field: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|err| short_read(err, field))
}

fn short_read(err: io::Error, field: &str) -> Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        Error::format(format!("Truncated {}", field))
    } else {
        Error::Io { source: err }
    }
}

/// Read a `u8` field.
pub fn read_u8<R: Read>(reader: &mut R, field: &str) -> Result<u8> {
    let mut buf = [0u8; 1];
    read_exact(reader, &mut buf, field)?;
    Ok(buf[0])
}

/// Read a little-endian `u16` field.
pub fn read_u16<R: Read>(reader: &mut R, field: &str) -> Result<u16> {
    let mut buf = [0u8; 2];
    read_exact(reader, &mut buf, field)?;
    Ok(u16::from_le_bytes(buf))
}

/// Read a little-endian `u32` field.
pub fn read_u32<R: Read>(reader: &mut R, field: &str) -> Result<u32> {
    let mut buf = [0u8; 4];
    read_exact(reader, &mut buf, field)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a little-endian `u64` field.
pub fn read_u64<R: Read>(reader: &mut R, field: &str) -> Result<u64> {
    let mut buf = [0u8; 8];
    read_exact(reader, &mut buf, field)?;
    Ok(u64::from_le_bytes(buf))
}

/// Read exactly `len` bytes.
///
/// The buffer grows with the data actually present, so a corrupt length
/// cannot force a huge allocation up front.
pub fn read_bytes<R: Read>(reader: &mut R, len: u64, field: &str) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.by_ref().take(len).read_to_end(&mut buf)?;
    if buf.len() as u64 != len {
        return Err(Error::format(format!(
            "Truncated {}: expected {} bytes, got {}",
            field,
            len,
            buf.len()
        )));
    }
    Ok(buf)
}

/// Write a `u8` field.
pub fn write_u8<W: Write>(writer: &mut W, value: u8) -> Result<()> {
    writer.write_all(&[value])?;
    Ok(())
}

/// Write a little-endian `u16` field.
pub fn write_u16<W: Write>(writer: &mut W, value: u16) -> Result<()> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian `u32` field.
pub fn write_u32<W: Write>(writer: &mut W, value: u32) -> Result<()> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian `u64` field.
pub fn write_u64<W: Write>(writer: &mut W, value: u64) -> Result<()> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

/// Convert a relative path to its archive form (UTF-8, '/'-separated).
pub fn encode_path(relative: &Path) -> Result<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| {
                    Error::invalid_argument(format!(
                        "Path is not valid UTF-8: {}",
                        relative.display()
                    ))
                })?;
                parts.push(part);
            }
            Component::CurDir => {}
            _ => {
                return Err(Error::invalid_argument(format!(
                    "Archive paths must be relative: {}",
                    relative.display()
                )));
            }
        }
    }

    if parts.is_empty() {
        return Err(Error::invalid_argument("Archive path is empty"));
    }
    Ok(parts.join("/"))
}

/// Turn an archive path back into a relative path that stays below the
/// extraction root.
pub fn decode_path(stored: &str) -> Result<PathBuf> {
    let mut path = PathBuf::new();
    for segment in stored.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(Error::format(format!(
                    "Archive path escapes destination: {}",
                    stored
                )));
            }
            _ => path.push(segment),
        }
    }

    let is_plain = path
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    if path.as_os_str().is_empty() || !is_plain {
        return Err(Error::format(format!("Invalid archive path: {:?}", stored)));
    }
    Ok(path)
}

/// Write an archive record path (`path_len: u32` then the bytes).
pub fn write_path<W: Write>(writer: &mut W, path: &str) -> Result<()> {
    let len = u32::try_from(path.len()).map_err(|_| {
        Error::invalid_argument("Relative path exceeds maximum supported length")
    })?;
    write_u32(writer, len)?;
    writer.write_all(path.as_bytes())?;
    Ok(())
}

/// Read an archive record path.
pub fn read_path<R: Read>(reader: &mut R) -> Result<String> {
    let len = read_u32(reader, "path length")?;
    let bytes = read_bytes(reader, u64::from(len), "path")?;
    String::from_utf8(bytes).map_err(|_| Error::format("Archive path is not valid UTF-8"))
}
