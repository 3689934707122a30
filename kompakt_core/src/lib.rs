//! # Kompakt Core
//!
//! A small compression toolkit with two independent codecs.
//!
//! This library encodes and decodes single files and whole directory trees with
//! either a frequency-tree (Huffman) codec or an adaptive-dictionary (LZW)
//! codec. Directories are packed into one self-describing archive, and the
//! per-file work is spread across a fixed pool of worker threads.
//!
//! ## Features
//!
//! - Deterministic Huffman trees rebuilt from a stored frequency table
//! - LZW with 16-bit codes and a dictionary bounded at 4096 entries
//! - Single-file containers and directory archives with a shared framing
//! - Archive record order fixed by the directory listing, not by thread timing
//! - Atomic file writes via temporary files
//!
//! ## Example
//!
//! ```no_run
//! use kompakt_core::{Algorithm, Options, compress, decompress};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = Options {
//!     threads: 4,
//!     ..Options::default()
//! };
//!
//! // A directory becomes an archive
//! let outcome = compress(
//!     Algorithm::Huffman,
//!     Path::new("./my-data"),
//!     Path::new("./my-data.ghar"),
//!     &options,
//! )?;
//! println!("Packed {} files", outcome.entries);
//!
//! // The archive's magic selects archive mode
//! decompress(
//!     Algorithm::Huffman,
//!     Path::new("./my-data.ghar"),
//!     Path::new("./restored"),
//!     &options,
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod archive;
mod codec;
mod error;
pub mod frame;
pub mod huffman;
pub mod lzw;
mod ops;
mod pool;
mod resource;

pub use archive::{ArchiveEntry, ArchiveListing, Mode, Outcome};
pub use codec::{Codec, Encoded};
pub use error::{Error, Result};
pub use huffman::{Huffman, HuffmanMetadata};
pub use lzw::{Lzw, LzwMetadata};
pub use ops::{Algorithm, FormatKind, Options, compress, decompress, list_archive, sniff};
pub use pool::{TaskHandle, TaskPool, resolve_worker_count, wait_in_order};
pub use resource::{
    DirectoryContext, EntryDescriptor, EntryKind, FileContext, describe_path, write_file,
    write_file_with,
};
