//! Adaptive-dictionary (LZW) codec with 16-bit codes.
//!
//! Encoder and decoder both start from the 256 single-byte strings and grow
//! their dictionaries in lockstep until [`MAX_DICTIONARY_SIZE`] entries exist.
//! Past the bound, matching continues but nothing new is inserted.
//!
//! Body layout:
//!
//! ```text
//! original_size    u64
//! dictionary_size  u16   final next-code of the encoder, informational
//! code_count       u64
//! codes            code_count x u16
//! ```

use crate::codec::{Codec, Encoded};
use crate::error::{Error, Result};
use crate::frame::{self, Magic};
use std::collections::HashMap;
use std::io::{Read, Write};
use tracing::warn;

/// Magic of a single-file LZW container.
pub const FILE_MAGIC: Magic = *b"GLZW";

/// Magic of an LZW directory archive.
pub const ARCHIVE_MAGIC: Magic = *b"GLZA";

/// Codes 0..=255 are the single-byte strings.
pub const INITIAL_DICTIONARY_SIZE: u16 = 256;

/// No code at or above this value is ever assigned.
pub const MAX_DICTIONARY_SIZE: u16 = 4096;

/// Metadata needed to decode an LZW code stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LzwMetadata {
    /// Exact length of the decoded output.
    pub original_size: u64,
    /// Dictionary size the encoder reached (0 for empty input).
    pub dictionary_size: u16,
}

/// Encoder output for the LZW codec.
pub type LzwEncoded = Encoded<LzwMetadata, Vec<u16>>;

/// Encode a buffer into a code sequence using greedy longest match.
pub fn encode(input: &[u8]) -> Result<LzwEncoded> {
    let mut metadata = LzwMetadata {
        original_size: input.len() as u64,
        dictionary_size: 0,
    };
    if input.is_empty() {
        return Ok(Encoded {
            metadata,
            payload: Vec::new(),
        });
    }

    // (prefix code, next byte) -> code; single bytes are implicit
    let mut dictionary: HashMap<(u16, u8), u16> = HashMap::new();
    let mut next_code = INITIAL_DICTIONARY_SIZE;
    let mut codes = Vec::new();
    let mut current: Option<u16> = None;

    for &byte in input {
        let Some(prefix) = current else {
            current = Some(u16::from(byte));
            continue;
        };

        if let Some(&code) = dictionary.get(&(prefix, byte)) {
            current = Some(code);
            continue;
        }

        codes.push(prefix);
        if next_code < MAX_DICTIONARY_SIZE {
            dictionary.insert((prefix, byte), next_code);
            next_code += 1;
        }
        current = Some(u16::from(byte));
    }

    codes.push(current.ok_or(Error::EmptyMatch)?);
    metadata.dictionary_size = next_code;

    Ok(Encoded {
        metadata,
        payload: codes,
    })
}

/// Decode a code sequence.
///
/// If the rebuilt output disagrees with `metadata.original_size`, it is
/// padded with zeros or truncated to that length and a warning is logged.
pub fn decode(metadata: &LzwMetadata, codes: &[u16]) -> Result<Vec<u8>> {
    let original_size = metadata.original_size;
    if original_size == 0 {
        return Ok(Vec::new());
    }
    let target = usize::try_from(original_size)
        .map_err(|_| Error::format("Original size exceeds addressable memory"))?;

    let Some((&first, rest)) = codes.split_first() else {
        return Err(Error::truncated_stream(original_size, 0));
    };

    let mut dictionary: Vec<Vec<u8>> = (0..=255u8).map(|byte| vec![byte]).collect();
    let mut next_code = INITIAL_DICTIONARY_SIZE;

    let mut previous = dictionary
        .get(usize::from(first))
        .cloned()
        .ok_or_else(|| Error::invalid_code(first, 0))?;
    let mut output = previous.clone();

    for (index, &code) in rest.iter().enumerate() {
        let entry = if let Some(known) = dictionary.get(usize::from(code)) {
            known.clone()
        } else if code == next_code {
            let mut entry = previous.clone();
            entry.push(previous[0]);
            entry
        } else {
            return Err(Error::invalid_code(code, index + 1));
        };

        output.extend_from_slice(&entry);

        if next_code < MAX_DICTIONARY_SIZE {
            let mut added = previous;
            added.push(entry[0]);
            dictionary.push(added);
            next_code += 1;
        }
        previous = entry;
    }

    if output.len() != target {
        warn!(
            expected = target,
            produced = output.len(),
            "LZW output length differs from original size; adjusting"
        );
        output.resize(target, 0);
    }

    Ok(output)
}

/// Marker type selecting the LZW codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lzw;

impl Codec for Lzw {
    type Metadata = LzwMetadata;
    type Payload = Vec<u16>;

    const NAME: &'static str = "lzw";
    const FILE_MAGIC: Magic = FILE_MAGIC;
    const ARCHIVE_MAGIC: Magic = ARCHIVE_MAGIC;

    fn encode(input: &[u8]) -> Result<LzwEncoded> {
        encode(input)
    }

    fn decode(metadata: &LzwMetadata, payload: &Vec<u16>) -> Result<Vec<u8>> {
        decode(metadata, payload)
    }

    fn original_size(metadata: &LzwMetadata) -> u64 {
        metadata.original_size
    }

    fn stored_size(payload: &Vec<u16>) -> u64 {
        payload.len() as u64 * 2
    }

    fn write_body<W: Write>(writer: &mut W, metadata: &LzwMetadata, payload: &Vec<u16>) -> Result<()> {
        frame::write_u64(writer, metadata.original_size)?;
        frame::write_u16(writer, metadata.dictionary_size)?;
        frame::write_u64(writer, payload.len() as u64)?;

        let mut bytes = Vec::with_capacity(payload.len() * 2);
        for code in payload {
            bytes.extend_from_slice(&code.to_le_bytes());
        }
        writer.write_all(&bytes)?;
        Ok(())
    }

    fn read_body<R: Read>(reader: &mut R) -> Result<(LzwMetadata, Vec<u16>)> {
        let original_size = frame::read_u64(reader, "original size")?;
        let dictionary_size = frame::read_u16(reader, "dictionary size")?;
        let code_count = frame::read_u64(reader, "code count")?;

        let byte_len = code_count
            .checked_mul(2)
            .ok_or_else(|| Error::format(format!("Code count too large: {}", code_count)))?;
        let bytes = frame::read_bytes(reader, byte_len, "code stream")?;
        let codes = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        Ok((
            LzwMetadata {
                original_size,
                dictionary_size,
            },
            codes,
        ))
    }
}
