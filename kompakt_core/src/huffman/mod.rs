//! Frequency-tree (Huffman) codec.
//!
//! The code table is never stored: the decoder rebuilds the identical tree
//! from the persisted 256-entry frequency table.
//!
//! Body layout (after the common header, or after the path in an archive record):
//!
//! ```text
//! original_size    u64
//! compressed_size  u64
//! frequencies      256 x u32
//! payload          compressed_size bytes, MSB-first, zero-padded
//! ```

mod bit_stream;
mod tree;

pub use bit_stream::{BitReader, BitWriter};
pub use tree::{CodeTable, Node, NodeId, Tree};

use crate::codec::{Codec, Encoded};
use crate::error::{Error, Result};
use crate::frame::{self, Magic};
use std::io::{Read, Write};

/// Magic of a single-file Huffman container.
pub const FILE_MAGIC: Magic = *b"GHUF";

/// Magic of a Huffman directory archive.
pub const ARCHIVE_MAGIC: Magic = *b"GHAR";

/// Occurrence count of every byte value.
pub type FrequencyTable = [u32; 256];

/// Metadata needed to decode a Huffman payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanMetadata {
    /// Per-symbol frequencies; zero for absent symbols.
    pub frequencies: FrequencyTable,
    /// Exact length of the decoded output.
    pub original_size: u64,
}

impl Default for HuffmanMetadata {
    fn default() -> Self {
        Self {
            frequencies: [0; 256],
            original_size: 0,
        }
    }
}

/// Encoder output for the Huffman codec.
pub type HuffmanEncoded = Encoded<HuffmanMetadata, Vec<u8>>;

/// Encode a buffer.
///
/// Empty input produces empty metadata and payload without building a tree.
pub fn encode(input: &[u8]) -> Result<HuffmanEncoded> {
    let mut metadata = HuffmanMetadata {
        original_size: input.len() as u64,
        ..HuffmanMetadata::default()
    };

    if input.is_empty() {
        return Ok(Encoded {
            metadata,
            payload: Vec::new(),
        });
    }

    let mut counts = [0u64; 256];
    for &byte in input {
        counts[usize::from(byte)] += 1;
    }
    for (slot, &count) in metadata.frequencies.iter_mut().zip(counts.iter()) {
        *slot = u32::try_from(count).map_err(|_| {
            Error::invalid_argument("Input too large for a 32-bit frequency table")
        })?;
    }

    let tree = Tree::build(&metadata.frequencies)
        .ok_or_else(|| Error::corrupt_tree("no symbols in non-empty input"))?;
    let codes = tree.code_table();

    let mut writer = BitWriter::new();
    for &byte in input {
        let bits = &codes[usize::from(byte)];
        if bits.is_empty() {
            return Err(Error::corrupt_tree(format!("no code for symbol {}", byte)));
        }
        writer.write_code(bits);
    }

    Ok(Encoded {
        metadata,
        payload: writer.finish(),
    })
}

/// Decode a payload to exactly `metadata.original_size` bytes.
///
/// A single-symbol table is expanded without reading the payload at all.
pub fn decode(metadata: &HuffmanMetadata, compressed: &[u8]) -> Result<Vec<u8>> {
    let original_size = metadata.original_size;
    if original_size == 0 {
        return Ok(Vec::new());
    }

    let total: u64 = metadata.frequencies.iter().map(|&f| u64::from(f)).sum();
    if total != original_size {
        return Err(Error::corrupt_tree(format!(
            "frequencies sum to {} but original size is {}",
            total, original_size
        )));
    }
    let target = usize::try_from(original_size)
        .map_err(|_| Error::format("Original size exceeds addressable memory"))?;

    let tree = Tree::build(&metadata.frequencies)
        .ok_or_else(|| Error::corrupt_tree("empty tree with non-zero size"))?;

    let root = tree.root();
    if tree.is_single_leaf() {
        let symbol = tree
            .node(root)
            .symbol
            .ok_or_else(|| Error::corrupt_tree("leaf without symbol"))?;
        return Ok(vec![symbol; target]);
    }

    let mut output = Vec::with_capacity(target);
    let mut reader = BitReader::new(compressed);
    let mut current = root;

    while output.len() < target {
        let bit = reader
            .read_bit()
            .ok_or_else(|| Error::truncated_stream(original_size, output.len() as u64))?;

        let node = tree.node(current);
        let next = if bit { node.right } else { node.left };
        current = next.ok_or_else(|| Error::corrupt_tree("null branch during traversal"))?;

        let node = tree.node(current);
        if node.is_leaf() {
            let symbol = node
                .symbol
                .ok_or_else(|| Error::corrupt_tree("leaf without symbol"))?;
            output.push(symbol);
            current = root;
        }
    }

    Ok(output)
}

/// Marker type selecting the Huffman codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct Huffman;

impl Codec for Huffman {
    type Metadata = HuffmanMetadata;
    type Payload = Vec<u8>;

    const NAME: &'static str = "huffman";
    const FILE_MAGIC: Magic = FILE_MAGIC;
    const ARCHIVE_MAGIC: Magic = ARCHIVE_MAGIC;

    fn encode(input: &[u8]) -> Result<HuffmanEncoded> {
        encode(input)
    }

    fn decode(metadata: &HuffmanMetadata, payload: &Vec<u8>) -> Result<Vec<u8>> {
        decode(metadata, payload)
    }

    fn original_size(metadata: &HuffmanMetadata) -> u64 {
        metadata.original_size
    }

    fn stored_size(payload: &Vec<u8>) -> u64 {
        payload.len() as u64
    }

    fn write_body<W: Write>(
        writer: &mut W,
        metadata: &HuffmanMetadata,
        payload: &Vec<u8>,
    ) -> Result<()> {
        frame::write_u64(writer, metadata.original_size)?;
        frame::write_u64(writer, payload.len() as u64)?;
        for &frequency in &metadata.frequencies {
            frame::write_u32(writer, frequency)?;
        }
        writer.write_all(payload)?;
        Ok(())
    }

    fn read_body<R: Read>(reader: &mut R) -> Result<(HuffmanMetadata, Vec<u8>)> {
        let original_size = frame::read_u64(reader, "original size")?;
        let compressed_size = frame::read_u64(reader, "compressed size")?;

        let mut frequencies = [0u32; 256];
        for slot in frequencies.iter_mut() {
            *slot = frame::read_u32(reader, "frequency table")?;
        }

        let payload = frame::read_bytes(reader, compressed_size, "compressed payload")?;
        Ok((
            HuffmanMetadata {
                frequencies,
                original_size,
            },
            payload,
        ))
    }
}
