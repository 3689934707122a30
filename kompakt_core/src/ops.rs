//! Algorithm selection and the top-level compress/decompress entry points.

use crate::archive::{self, ArchiveListing, Outcome};
use crate::error::{Error, Result};
use crate::frame::{self, Magic};
use crate::huffman::{self, Huffman};
use crate::lzw::{self, Lzw};
use std::path::Path;

/// Settings shared by every operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    /// Worker threads for directory operations (0 = hardware parallelism).
    pub threads: usize,
    /// Descend into symlinked directories when compressing a directory.
    pub follow_symlinks: bool,
}

/// Supported codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Frequency-tree codec.
    Huffman,
    /// Adaptive-dictionary codec.
    Lzw,
}

impl Algorithm {
    /// Returns the string representation of the algorithm.
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Huffman => "huffman",
            Algorithm::Lzw => "lzw",
        }
    }

    /// Parse an algorithm name, ignoring case.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "huffman" => Ok(Algorithm::Huffman),
            "lzw" => Ok(Algorithm::Lzw),
            _ => Err(Error::invalid_argument(format!(
                "Unsupported algorithm: {} (expected huffman or lzw)",
                s
            ))),
        }
    }

    /// Magic of this codec's single-file container.
    pub fn file_magic(&self) -> Magic {
        match self {
            Algorithm::Huffman => huffman::FILE_MAGIC,
            Algorithm::Lzw => lzw::FILE_MAGIC,
        }
    }

    /// Magic of this codec's directory archive.
    pub fn archive_magic(&self) -> Magic {
        match self {
            Algorithm::Huffman => huffman::ARCHIVE_MAGIC,
            Algorithm::Lzw => lzw::ARCHIVE_MAGIC,
        }
    }
}

/// The four container variants, told apart by their magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    HuffmanFile,
    HuffmanArchive,
    LzwFile,
    LzwArchive,
}

impl FormatKind {
    /// Identify a container by its magic.
    pub fn from_magic(magic: &Magic) -> Result<Self> {
        match *magic {
            huffman::FILE_MAGIC => Ok(FormatKind::HuffmanFile),
            huffman::ARCHIVE_MAGIC => Ok(FormatKind::HuffmanArchive),
            lzw::FILE_MAGIC => Ok(FormatKind::LzwFile),
            lzw::ARCHIVE_MAGIC => Ok(FormatKind::LzwArchive),
            _ => Err(Error::format(format!(
                "Unknown magic: {}",
                frame::magic_str(magic)
            ))),
        }
    }

    /// The codec that wrote this container.
    pub fn algorithm(&self) -> Algorithm {
        match self {
            FormatKind::HuffmanFile | FormatKind::HuffmanArchive => Algorithm::Huffman,
            FormatKind::LzwFile | FormatKind::LzwArchive => Algorithm::Lzw,
        }
    }

    /// Whether this is a directory archive.
    pub fn is_archive(&self) -> bool {
        matches!(self, FormatKind::HuffmanArchive | FormatKind::LzwArchive)
    }
}

/// Identify the container at `path` from its first four bytes.
pub fn sniff(path: &Path) -> Result<FormatKind> {
    FormatKind::from_magic(&frame::read_magic(path)?)
}

/// Compress `input` to `output`.
///
/// A directory becomes an archive; anything else becomes a single-file
/// container.
pub fn compress(
    algorithm: Algorithm,
    input: &Path,
    output: &Path,
    options: &Options,
) -> Result<Outcome> {
    require_existing(input)?;

    match (algorithm, input.is_dir()) {
        (Algorithm::Huffman, true) => archive::compress_directory::<Huffman>(input, output, options),
        (Algorithm::Huffman, false) => archive::compress_file::<Huffman>(input, output),
        (Algorithm::Lzw, true) => archive::compress_directory::<Lzw>(input, output, options),
        (Algorithm::Lzw, false) => archive::compress_file::<Lzw>(input, output),
    }
}

/// Decompress `input` to `output`.
///
/// The input's magic decides between file and archive mode. For an archive,
/// `output` is the directory the entries are restored under.
pub fn decompress(
    algorithm: Algorithm,
    input: &Path,
    output: &Path,
    options: &Options,
) -> Result<Outcome> {
    require_existing(input)?;
    if input.is_dir() {
        return Err(Error::invalid_argument(format!(
            "Decompression input must be a file: {}",
            input.display()
        )));
    }

    let kind = sniff(input)?;
    if kind.algorithm() != algorithm {
        return Err(Error::format(format!(
            "{} was written by the {} codec, not {}",
            input.display(),
            kind.algorithm().as_str(),
            algorithm.as_str()
        )));
    }

    match kind {
        FormatKind::HuffmanFile => archive::decompress_file::<Huffman>(input, output),
        FormatKind::HuffmanArchive => {
            archive::decompress_archive::<Huffman>(input, output, options)
        }
        FormatKind::LzwFile => archive::decompress_file::<Lzw>(input, output),
        FormatKind::LzwArchive => archive::decompress_archive::<Lzw>(input, output, options),
    }
}

/// List the entries of an archive written by either codec.
pub fn list_archive(path: &Path) -> Result<Vec<ArchiveListing>> {
    require_existing(path)?;

    match sniff(path)? {
        FormatKind::HuffmanArchive => archive::list_entries::<Huffman>(path),
        FormatKind::LzwArchive => archive::list_entries::<Lzw>(path),
        FormatKind::HuffmanFile | FormatKind::LzwFile => Err(Error::format(format!(
            "{} is a single-file container, not an archive",
            path.display()
        ))),
    }
}

fn require_existing(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(Error::invalid_argument("Input path is empty"));
    }
    if !path.exists() {
        return Err(Error::invalid_argument(format!(
            "Input path does not exist: {}",
            path.display()
        )));
    }
    Ok(())
}
