//! The seam between the archiver and the individual codecs.

use crate::error::Result;
use crate::frame::Magic;
use std::fmt;
use std::io::{Read, Write};

/// Output of a codec's encoder: the metadata needed to decode plus the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded<M, P> {
    /// Codec metadata (always carries the original size).
    pub metadata: M,
    /// Encoded payload.
    pub payload: P,
}

/// A byte-buffer codec with its own container magics and body layout.
///
/// The body is the codec-specific part of a container or archive record:
/// metadata, payload length field(s), then the payload itself.
pub trait Codec: 'static {
    /// Metadata stored alongside each payload.
    type Metadata: Clone + fmt::Debug + Send + 'static;
    /// Encoded payload representation.
    type Payload: fmt::Debug + Send + 'static;

    /// Short lowercase name, used in logs and listings.
    const NAME: &'static str;
    /// Magic of a single-file container.
    const FILE_MAGIC: Magic;
    /// Magic of a directory archive.
    const ARCHIVE_MAGIC: Magic;

    /// Encode a whole buffer.
    fn encode(input: &[u8]) -> Result<Encoded<Self::Metadata, Self::Payload>>;

    /// Decode a payload back to exactly the original bytes.
    fn decode(metadata: &Self::Metadata, payload: &Self::Payload) -> Result<Vec<u8>>;

    /// Size of the input that produced `metadata`.
    fn original_size(metadata: &Self::Metadata) -> u64;

    /// Number of bytes `payload` occupies on disk.
    fn stored_size(payload: &Self::Payload) -> u64;

    /// Write metadata, payload length and payload, in that order.
    fn write_body<W: Write>(
        writer: &mut W,
        metadata: &Self::Metadata,
        payload: &Self::Payload,
    ) -> Result<()>;

    /// Read what [`Codec::write_body`] wrote.
    fn read_body<R: Read>(reader: &mut R) -> Result<(Self::Metadata, Self::Payload)>;
}
