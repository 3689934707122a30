//! Single-file containers and directory archives, generic over the codec.
//!
//! Directory compression lists every file under the root, encodes each one on
//! the task pool, and writes the records in listing order regardless of which
//! task finished first. Decompression parses the whole archive into memory
//! before fanning out decode-and-write tasks.
//!
//! A failing task aborts the operation. Files already restored by other tasks
//! are left in place.

use crate::codec::{Codec, Encoded};
use crate::error::{Error, Result};
use crate::frame;
use crate::ops::Options;
use crate::pool::{TaskPool, wait_in_order};
use crate::resource::{DirectoryContext, EntryDescriptor, FileContext, write_file, write_file_with};
use std::fs;
use std::io::{BufReader, Read, Write};
use std::path::Path;
use tracing::{debug, info};

/// One archive record: where the file goes and how to rebuild it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry<M, P> {
    /// '/'-separated path relative to the archive root.
    pub relative_path: String,
    /// Codec metadata.
    pub metadata: M,
    /// Encoded payload.
    pub payload: P,
}

/// Archive record type for codec `C`.
pub type CodecEntry<C> = ArchiveEntry<<C as Codec>::Metadata, <C as Codec>::Payload>;

/// Whether an operation handled a single file or a whole directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Single-file container.
    File,
    /// Directory archive.
    Archive,
}

impl Mode {
    /// Get the string name of this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::File => "file",
            Mode::Archive => "archive",
        }
    }
}

/// Summary of a completed compress or decompress operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// File or archive mode.
    pub mode: Mode,
    /// Number of files processed.
    pub entries: usize,
    /// Bytes read from the input.
    pub bytes_in: u64,
    /// Bytes written to the output.
    pub bytes_out: u64,
}

/// One archive record as reported by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveListing {
    /// '/'-separated path relative to the archive root.
    pub relative_path: String,
    /// Size of the restored file.
    pub original_size: u64,
    /// Size of the stored payload.
    pub stored_size: u64,
}

/// Compress one file into a single-file container.
pub fn compress_file<C: Codec>(input: &Path, output: &Path) -> Result<Outcome> {
    let file = FileContext::open(input)?;
    let data = file.read_all()?;
    let encoded = C::encode(&data)?;

    write_file_with(output, |writer| write_container::<C, _>(writer, &encoded))?;
    let bytes_out = fs::metadata(output)?.len();

    info!(
        codec = C::NAME,
        input = %input.display(),
        output = %output.display(),
        bytes_in = data.len(),
        bytes_out,
        "compressed file"
    );

    Ok(Outcome {
        mode: Mode::File,
        entries: 1,
        bytes_in: data.len() as u64,
        bytes_out,
    })
}

/// Restore a file from a single-file container.
pub fn decompress_file<C: Codec>(input: &Path, output: &Path) -> Result<Outcome> {
    let mut reader = BufReader::new(fs::File::open(input)?);
    let (metadata, payload) = read_container::<C, _>(&mut reader)?;
    let data = C::decode(&metadata, &payload)?;
    write_file(output, &data)?;

    let bytes_in = fs::metadata(input)?.len();
    info!(
        codec = C::NAME,
        input = %input.display(),
        output = %output.display(),
        bytes_in,
        bytes_out = data.len(),
        "decompressed file"
    );

    Ok(Outcome {
        mode: Mode::File,
        entries: 1,
        bytes_in,
        bytes_out: data.len() as u64,
    })
}

/// Write a single-file container: header then codec body.
pub fn write_container<C: Codec, W: Write>(
    writer: &mut W,
    encoded: &Encoded<C::Metadata, C::Payload>,
) -> Result<()> {
    frame::write_header(writer, &C::FILE_MAGIC)?;
    C::write_body(writer, &encoded.metadata, &encoded.payload)
}

/// Read a single-file container written by [`write_container`].
pub fn read_container<C: Codec, R: Read>(reader: &mut R) -> Result<(C::Metadata, C::Payload)> {
    frame::read_header(reader, &C::FILE_MAGIC)?;
    C::read_body(reader)
}

/// Write an archive: header, entry count, then one record per entry in order.
pub fn write_archive<C: Codec, W: Write>(writer: &mut W, entries: &[CodecEntry<C>]) -> Result<()> {
    let count = u32::try_from(entries.len())
        .map_err(|_| Error::invalid_argument("Too many files for one archive"))?;

    frame::write_header(writer, &C::ARCHIVE_MAGIC)?;
    frame::write_u32(writer, count)?;
    for entry in entries {
        frame::write_path(writer, &entry.relative_path)?;
        C::write_body(writer, &entry.metadata, &entry.payload)?;
    }
    Ok(())
}

/// Parse a whole archive into memory.
///
/// Every record path is checked before anything is returned; a path that is
/// empty or climbs out of the root makes the archive malformed.
pub fn read_archive<C: Codec, R: Read>(reader: &mut R) -> Result<Vec<CodecEntry<C>>> {
    frame::read_header(reader, &C::ARCHIVE_MAGIC)?;
    let count = frame::read_u32(reader, "entry count")?;

    // The count is untrusted; let the vector grow with the records actually read
    let mut entries = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        let relative_path = frame::read_path(reader)?;
        frame::decode_path(&relative_path)?;
        let (metadata, payload) = C::read_body(reader)?;
        entries.push(ArchiveEntry {
            relative_path,
            metadata,
            payload,
        });
    }
    Ok(entries)
}

/// Read the archive at `path`.
pub fn read_archive_file<C: Codec>(path: &Path) -> Result<Vec<CodecEntry<C>>> {
    let mut reader = BufReader::new(fs::File::open(path)?);
    read_archive::<C, _>(&mut reader)
}

/// List the records of the archive at `path` without decoding payloads.
pub fn list_entries<C: Codec>(path: &Path) -> Result<Vec<ArchiveListing>> {
    Ok(read_archive_file::<C>(path)?
        .into_iter()
        .map(|entry| ArchiveListing {
            original_size: C::original_size(&entry.metadata),
            stored_size: C::stored_size(&entry.payload),
            relative_path: entry.relative_path,
        })
        .collect())
}

/// Compress every file under `root` into one archive at `destination`.
///
/// Empty directories are not recorded. The archive is written only after all
/// files were encoded, so a failure leaves no partial archive behind.
pub fn compress_directory<C: Codec>(
    root: &Path,
    destination: &Path,
    options: &Options,
) -> Result<Outcome> {
    let directory = DirectoryContext::open(root, options.follow_symlinks)?;
    let files = directory.list_entries(true, false)?;

    let entries = if files.is_empty() {
        Vec::new()
    } else {
        let pool = TaskPool::new(options.threads)?;
        debug!(
            codec = C::NAME,
            files = files.len(),
            workers = pool.worker_count(),
            "compressing directory"
        );

        let mut handles = Vec::with_capacity(files.len());
        for descriptor in files {
            handles.push(pool.submit(move || encode_entry::<C>(descriptor))?);
        }
        wait_in_order(handles)?
    };

    write_file_with(destination, |writer| write_archive::<C, _>(writer, &entries))?;

    let bytes_in = entries
        .iter()
        .map(|entry| C::original_size(&entry.metadata))
        .sum();
    let bytes_out = fs::metadata(destination)?.len();
    info!(
        codec = C::NAME,
        root = %directory.root().display(),
        output = %destination.display(),
        entries = entries.len(),
        bytes_in,
        bytes_out,
        "compressed directory"
    );

    Ok(Outcome {
        mode: Mode::Archive,
        entries: entries.len(),
        bytes_in,
        bytes_out,
    })
}

fn encode_entry<C: Codec>(descriptor: EntryDescriptor) -> Result<CodecEntry<C>> {
    let relative_path = frame::encode_path(&descriptor.relative_path)?;
    let file = FileContext::from_descriptor(descriptor)?;
    let data = file.read_all()?;
    let encoded = C::encode(&data)?;

    debug!(
        path = %relative_path,
        original = data.len(),
        stored = C::stored_size(&encoded.payload),
        "encoded entry"
    );

    Ok(ArchiveEntry {
        relative_path,
        metadata: encoded.metadata,
        payload: encoded.payload,
    })
}

/// Restore every record of the archive at `source` below `destination_root`.
///
/// Parent directories are created as needed and existing files are replaced.
pub fn decompress_archive<C: Codec>(
    source: &Path,
    destination_root: &Path,
    options: &Options,
) -> Result<Outcome> {
    let entries = read_archive_file::<C>(source)?;
    let bytes_in = fs::metadata(source)?.len();
    fs::create_dir_all(destination_root)?;

    let count = entries.len();
    let mut bytes_out = 0;
    if !entries.is_empty() {
        let pool = TaskPool::new(options.threads)?;
        debug!(
            codec = C::NAME,
            entries = count,
            workers = pool.worker_count(),
            "restoring archive"
        );

        let mut handles = Vec::with_capacity(count);
        for entry in entries {
            let target = destination_root.join(frame::decode_path(&entry.relative_path)?);
            handles.push(pool.submit(move || restore_entry::<C>(entry, &target))?);
        }
        bytes_out = wait_in_order(handles)?.into_iter().sum();
    }

    info!(
        codec = C::NAME,
        input = %source.display(),
        output = %destination_root.display(),
        entries = count,
        bytes_in,
        bytes_out,
        "decompressed archive"
    );

    Ok(Outcome {
        mode: Mode::Archive,
        entries: count,
        bytes_in,
        bytes_out,
    })
}

fn restore_entry<C: Codec>(entry: CodecEntry<C>, target: &Path) -> Result<u64> {
    let data = C::decode(&entry.metadata, &entry.payload)?;
    write_file(target, &data)?;
    debug!(path = %entry.relative_path, bytes = data.len(), "restored entry");
    Ok(data.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::huffman::Huffman;
    use crate::lzw::Lzw;
    use std::io::Cursor;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn options(threads: usize) -> Options {
        Options {
            threads,
            ..Options::default()
        }
    }

    fn sample_tree(root: &Path) {
        fs::create_dir_all(root.join("nested").join("deeper")).unwrap();
        fs::create_dir_all(root.join("empty_dir")).unwrap();
        fs::write(root.join("readme.txt"), b"hello hello hello world").unwrap();
        fs::write(root.join("zero.bin"), b"").unwrap();
        fs::write(root.join(".hidden"), b"dotfile").unwrap();
        fs::write(root.join("nested").join("data.bin"), (0..=255u8).cycle().take(5000).collect::<Vec<_>>())
            .unwrap();
        fs::write(root.join("nested").join("deeper").join("a.txt"), b"AAAAAAAAAAAA").unwrap();
    }

    fn collect_files(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
        let directory = DirectoryContext::open(root, false).unwrap();
        directory
            .list_entries(true, false)
            .unwrap()
            .into_iter()
            .map(|e| {
                let data = fs::read(&e.absolute_path).unwrap();
                (e.relative_path, data)
            })
            .collect()
    }

    fn directory_roundtrip<C: Codec>() {
        let source = TempDir::new().unwrap();
        sample_tree(source.path());
        let work = TempDir::new().unwrap();
        let archive = work.path().join("tree.arc");
        let restored = work.path().join("restored");

        let compressed = compress_directory::<C>(source.path(), &archive, &options(3)).unwrap();
        assert_eq!(compressed.mode, Mode::Archive);
        assert_eq!(compressed.entries, 5);

        let decompressed = decompress_archive::<C>(&archive, &restored, &options(2)).unwrap();
        assert_eq!(decompressed.entries, 5);
        assert_eq!(decompressed.bytes_out, compressed.bytes_in);

        assert_eq!(collect_files(source.path()), collect_files(&restored));
        assert!(!restored.join("empty_dir").exists());
    }

    #[test]
    fn test_huffman_directory_roundtrip() {
        directory_roundtrip::<Huffman>();
    }

    #[test]
    fn test_lzw_directory_roundtrip() {
        directory_roundtrip::<Lzw>();
    }

    #[test]
    fn test_archive_order_follows_listing() {
        let source = TempDir::new().unwrap();
        sample_tree(source.path());
        let work = TempDir::new().unwrap();
        let archive = work.path().join("tree.arc");

        compress_directory::<Lzw>(source.path(), &archive, &options(4)).unwrap();
        let paths: Vec<String> = list_entries::<Lzw>(&archive)
            .unwrap()
            .into_iter()
            .map(|listing| listing.relative_path)
            .collect();

        assert_eq!(
            paths,
            vec![
                ".hidden",
                "nested/data.bin",
                "nested/deeper/a.txt",
                "readme.txt",
                "zero.bin",
            ]
        );
    }

    #[test]
    fn test_archive_bytes_independent_of_thread_count() {
        let source = TempDir::new().unwrap();
        sample_tree(source.path());
        let work = TempDir::new().unwrap();
        let single = work.path().join("single.arc");
        let many = work.path().join("many.arc");

        compress_directory::<Huffman>(source.path(), &single, &options(1)).unwrap();
        compress_directory::<Huffman>(source.path(), &many, &options(8)).unwrap();
        assert_eq!(fs::read(&single).unwrap(), fs::read(&many).unwrap());
    }

    #[test]
    fn test_empty_directory_archive() {
        let source = TempDir::new().unwrap();
        fs::create_dir_all(source.path().join("only").join("dirs")).unwrap();
        let work = TempDir::new().unwrap();
        let archive = work.path().join("empty.arc");

        let outcome = compress_directory::<Huffman>(source.path(), &archive, &options(0)).unwrap();
        assert_eq!(outcome.entries, 0);
        assert_eq!(fs::read(&archive).unwrap(), b"GHAR\x01\x00\x00\x00\x00\x00\x00\x00");

        let restored = work.path().join("restored");
        let outcome = decompress_archive::<Huffman>(&archive, &restored, &options(0)).unwrap();
        assert_eq!(outcome.entries, 0);
        assert!(restored.is_dir());
    }

    #[test]
    fn test_listing_sizes() {
        let source = TempDir::new().unwrap();
        fs::write(source.path().join("one.txt"), b"ABABABA").unwrap();
        let work = TempDir::new().unwrap();
        let archive = work.path().join("one.arc");

        compress_directory::<Lzw>(source.path(), &archive, &options(1)).unwrap();
        let listing = list_entries::<Lzw>(&archive).unwrap();
        assert_eq!(
            listing,
            vec![ArchiveListing {
                relative_path: "one.txt".to_string(),
                original_size: 7,
                stored_size: 8,
            }]
        );
    }

    #[test]
    fn test_single_file_roundtrip() {
        let work = TempDir::new().unwrap();
        let input = work.path().join("input.txt");
        let packed = work.path().join("input.ghuf");
        let output = work.path().join("out").join("input.txt");
        fs::write(&input, b"mississippi river banks").unwrap();

        let outcome = compress_file::<Huffman>(&input, &packed).unwrap();
        assert_eq!(outcome.mode, Mode::File);
        assert_eq!(outcome.bytes_in, 23);
        assert_eq!(&fs::read(&packed).unwrap()[0..5], b"GHUF\x01");

        decompress_file::<Huffman>(&packed, &output).unwrap();
        assert_eq!(fs::read(&output).unwrap(), b"mississippi river banks");
    }

    #[test]
    fn test_empty_file_roundtrip() {
        let work = TempDir::new().unwrap();
        let input = work.path().join("empty");
        let packed = work.path().join("empty.glzw");
        let output = work.path().join("empty.out");
        fs::write(&input, b"").unwrap();

        compress_file::<Lzw>(&input, &packed).unwrap();
        // header + original size + dictionary size + code count
        assert_eq!(fs::read(&packed).unwrap().len(), 8 + 8 + 2 + 8);

        decompress_file::<Lzw>(&packed, &output).unwrap();
        assert!(fs::read(&output).unwrap().is_empty());
    }

    #[test]
    fn test_wrong_codec_magic() {
        let work = TempDir::new().unwrap();
        let input = work.path().join("input.txt");
        let packed = work.path().join("input.glzw");
        let output = work.path().join("never.txt");
        fs::write(&input, b"ABABABA").unwrap();
        compress_file::<Lzw>(&input, &packed).unwrap();

        let err = decompress_file::<Huffman>(&packed, &output).unwrap_err();
        assert!(err.is_format_error());
        assert!(!output.exists());
    }

    #[test]
    fn test_file_container_is_not_an_archive() {
        let work = TempDir::new().unwrap();
        let input = work.path().join("input.txt");
        let packed = work.path().join("input.ghuf");
        fs::write(&input, b"payload").unwrap();
        compress_file::<Huffman>(&input, &packed).unwrap();

        let err = decompress_archive::<Huffman>(&packed, &work.path().join("out"), &options(1))
            .unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_archive_rejects_escaping_path() {
        let encoded = Huffman::encode(b"evil").unwrap();
        let entries = vec![ArchiveEntry {
            relative_path: "../outside.txt".to_string(),
            metadata: encoded.metadata,
            payload: encoded.payload,
        }];
        let mut buf = Vec::new();
        write_archive::<Huffman, _>(&mut buf, &entries).unwrap();

        let err = read_archive::<Huffman, _>(&mut Cursor::new(buf)).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_archive_truncated_record() {
        let encoded = Lzw::encode(b"some text to store").unwrap();
        let entries = vec![ArchiveEntry {
            relative_path: "a.txt".to_string(),
            metadata: encoded.metadata,
            payload: encoded.payload,
        }];
        let mut buf = Vec::new();
        write_archive::<Lzw, _>(&mut buf, &entries).unwrap();
        buf.truncate(buf.len() - 3);

        let err = read_archive::<Lzw, _>(&mut Cursor::new(buf)).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_archive_overstated_count() {
        let mut buf = Vec::new();
        frame::write_header(&mut buf, &Lzw::ARCHIVE_MAGIC).unwrap();
        frame::write_u32(&mut buf, u32::MAX).unwrap();

        let err = read_archive::<Lzw, _>(&mut Cursor::new(buf)).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_corrupt_entry_fails_decompression() {
        let encoded = Huffman::encode(b"abcabcabc").unwrap();
        let mut payload = encoded.payload.clone();
        payload.truncate(1);
        let entries = vec![
            ArchiveEntry {
                relative_path: "good.txt".to_string(),
                metadata: encoded.metadata.clone(),
                payload: encoded.payload,
            },
            ArchiveEntry {
                relative_path: "bad.txt".to_string(),
                metadata: encoded.metadata,
                payload,
            },
        ];

        let work = TempDir::new().unwrap();
        let archive = work.path().join("broken.arc");
        write_file_with(&archive, |writer| write_archive::<Huffman, _>(writer, &entries)).unwrap();

        let err =
            decompress_archive::<Huffman>(&archive, &work.path().join("out"), &options(2)).unwrap_err();
        assert!(matches!(err, Error::TruncatedStream { .. }));
    }

    #[test]
    #[cfg(unix)]
    fn test_unreadable_entry_aborts_compression() {
        let source = TempDir::new().unwrap();
        fs::write(source.path().join("fine.txt"), b"fine").unwrap();
        std::os::unix::fs::symlink(
            source.path().join("does-not-exist"),
            source.path().join("dangling"),
        )
        .unwrap();

        let work = TempDir::new().unwrap();
        let archive = work.path().join("never.arc");
        let err = compress_directory::<Lzw>(source.path(), &archive, &options(2)).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(!archive.exists());
    }

    #[test]
    fn test_compress_directory_requires_directory() {
        let work = TempDir::new().unwrap();
        let file = work.path().join("plain.txt");
        fs::write(&file, b"x").unwrap();

        let err = compress_directory::<Huffman>(&file, &work.path().join("out.arc"), &options(1))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }
}
