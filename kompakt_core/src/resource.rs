//! File and directory access used by the codecs and the archiver.
//!
//! [`describe_path`] and directory listings are best-effort: a failing stat
//! degrades the affected field to its default (size 0, modification time at
//! the Unix epoch, not a symlink) instead of failing the listing.

use crate::error::{Error, Result};
use crate::pool::{TaskPool, wait_in_order};
use std::fs;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

/// Kind of a file-system entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Anything that is not a directory.
    File,
    /// A directory (or, when symlinks are not followed, a link to one).
    Directory,
}

impl EntryKind {
    /// Get the string name of this entry kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
        }
    }
}

/// Snapshot of one file-system entry, taken when it was described.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDescriptor {
    /// Absolute location of the entry.
    pub absolute_path: PathBuf,
    /// Location relative to the listing root (file name for standalone paths).
    pub relative_path: PathBuf,
    /// File or directory.
    pub kind: EntryKind,
    /// Size in bytes; always 0 for directories.
    pub size: u64,
    /// Last modification time; the Unix epoch when unavailable.
    pub modified: SystemTime,
    /// Whether the entry itself is a symbolic link.
    pub is_symlink: bool,
}

impl EntryDescriptor {
    /// Whether this entry is a file.
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// Describe a single path.
///
/// Only an empty path is rejected; everything else degrades to defaults.
pub fn describe_path(path: &Path) -> Result<EntryDescriptor> {
    if path.as_os_str().is_empty() {
        return Err(Error::invalid_argument("Provided path is empty"));
    }

    let absolute_path = make_absolute(path);
    let relative_path = absolute_path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| absolute_path.clone());

    let kind = resolve_kind(path);
    let size = match kind {
        EntryKind::File => safe_file_size(path),
        EntryKind::Directory => 0,
    };

    Ok(EntryDescriptor {
        absolute_path,
        relative_path,
        kind,
        size,
        modified: safe_modified(path),
        is_symlink: safe_is_symlink(path),
    })
}

fn make_absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn resolve_kind(path: &Path) -> EntryKind {
    if path.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    }
}

fn safe_file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

fn safe_modified(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

fn safe_is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

/// Write `data` to `destination`, creating parent directories and replacing
/// any existing file.
pub fn write_file(destination: &Path, data: &[u8]) -> Result<()> {
    write_file_with(destination, |writer| {
        writer.write_all(data)?;
        Ok(())
    })
}

/// Stream bytes produced by `fill` to `destination`.
///
/// The bytes go to a temporary file next to the destination which is then
/// renamed into place, so a failing `fill` leaves the destination untouched.
pub fn write_file_with<F>(destination: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&mut fs::File>) -> Result<()>,
{
    if destination.as_os_str().is_empty() {
        return Err(Error::invalid_argument("Destination path is empty"));
    }

    let destination = make_absolute(destination);
    let parent = destination
        .parent()
        .ok_or_else(|| Error::invalid_argument(format!("No parent for {}", destination.display())))?;
    fs::create_dir_all(parent)?;

    let mut temp_file = temp_file_builder().tempfile_in(parent)?;
    {
        let mut writer = BufWriter::new(temp_file.as_file_mut());
        fill(&mut writer)?;
        writer.flush()?;
    }
    temp_file.persist(&destination)?;

    Ok(())
}

/// Temporary files default to owner-only access; restored files should not.
#[cfg(unix)]
fn temp_file_builder() -> tempfile::Builder<'static, 'static> {
    use std::os::unix::fs::PermissionsExt;

    let mut builder = tempfile::Builder::new();
    builder
        .prefix(".kompakt-")
        .permissions(fs::Permissions::from_mode(0o644));
    builder
}

/// Temporary file builder (non-Unix fallback).
#[cfg(not(unix))]
fn temp_file_builder() -> tempfile::Builder<'static, 'static> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(".kompakt-");
    builder
}

/// A regular file, verified at construction.
#[derive(Debug, Clone)]
pub struct FileContext {
    descriptor: EntryDescriptor,
}

impl FileContext {
    /// Open an existing file.
    ///
    /// Fails with `InvalidArgument` if the path is empty, missing, or a directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let descriptor = describe_path(path)?;

        if descriptor.kind != EntryKind::File || fs::metadata(path).is_err() {
            return Err(Error::invalid_argument(format!(
                "FileContext requires an existing regular file: {}",
                path.display()
            )));
        }

        Ok(Self { descriptor })
    }

    /// Build a context from a descriptor produced by a directory listing.
    pub fn from_descriptor(descriptor: EntryDescriptor) -> Result<Self> {
        if !descriptor.is_file() {
            return Err(Error::invalid_argument(format!(
                "FileContext requires a file entry: {}",
                descriptor.absolute_path.display()
            )));
        }
        Ok(Self { descriptor })
    }

    /// The descriptor captured at construction.
    pub fn descriptor(&self) -> &EntryDescriptor {
        &self.descriptor
    }

    /// Read the whole file.
    pub fn read_all(&self) -> Result<Vec<u8>> {
        Ok(fs::read(&self.descriptor.absolute_path)?)
    }

    /// Read up to `length` bytes starting at `offset`.
    ///
    /// Returns fewer bytes near the end of the file and nothing past it.
    pub fn read_range(&self, offset: u64, length: usize) -> Result<Vec<u8>> {
        let mut file = fs::File::open(&self.descriptor.absolute_path)?;
        let file_size = file.metadata()?.len();
        if offset >= file_size {
            return Ok(Vec::new());
        }

        let available = (file_size - offset).min(length as u64);
        file.seek(SeekFrom::Start(offset))?;

        let mut buffer = Vec::with_capacity(available as usize);
        file.take(available).read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    /// Write `data` to `destination` (see [`write_file`]).
    pub fn write_all(&self, destination: &Path, data: &[u8]) -> Result<()> {
        write_file(destination, data)
    }

    /// Copy this file to `destination`, creating parents and overwriting.
    pub fn copy_to(&self, destination: &Path) -> Result<()> {
        if destination.as_os_str().is_empty() {
            return Err(Error::invalid_argument("Destination path is empty"));
        }

        let destination = make_absolute(destination);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::copy(&self.descriptor.absolute_path, &destination)?;
        Ok(())
    }
}

/// An existing directory whose entries can be listed and processed in parallel.
#[derive(Debug, Clone)]
pub struct DirectoryContext {
    root: PathBuf,
    follow_symlinks: bool,
}

impl DirectoryContext {
    /// Open an existing directory.
    pub fn open(root: impl AsRef<Path>, follow_symlinks: bool) -> Result<Self> {
        let root = root.as_ref();
        if root.as_os_str().is_empty() {
            return Err(Error::invalid_argument("Provided path is empty"));
        }

        let root = fs::canonicalize(root).map_err(|_| {
            Error::invalid_argument(format!(
                "DirectoryContext requires an existing directory: {}",
                root.display()
            ))
        })?;
        if !root.is_dir() {
            return Err(Error::invalid_argument(format!(
                "DirectoryContext requires an existing directory: {}",
                root.display()
            )));
        }

        Ok(Self {
            root,
            follow_symlinks,
        })
    }

    /// Absolute root of this directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether directory symlinks are descended into.
    pub fn follows_symlinks(&self) -> bool {
        self.follow_symlinks
    }

    /// List entries under the root in depth-first order.
    ///
    /// Siblings are sorted by file name, so the order is stable for a given
    /// tree. Hidden files and ignore files get no special treatment.
    pub fn list_entries(
        &self,
        recursive: bool,
        include_directories: bool,
    ) -> Result<Vec<EntryDescriptor>> {
        let mut builder = ignore::WalkBuilder::new(&self.root);
        builder
            .standard_filters(false)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name(|a, b| a.cmp(b));
        if !recursive {
            builder.max_depth(Some(1));
        }

        let mut entries = Vec::new();
        for entry in builder.build() {
            let entry = entry?;

            // Skip the root itself
            if entry.depth() == 0 {
                continue;
            }

            let descriptor = self.build_descriptor(&entry);
            if !include_directories && descriptor.kind == EntryKind::Directory {
                continue;
            }
            entries.push(descriptor);
        }

        Ok(entries)
    }

    fn build_descriptor(&self, entry: &ignore::DirEntry) -> EntryDescriptor {
        let path = entry.path();
        let relative_path = match path.strip_prefix(&self.root) {
            Ok(relative) if !relative.as_os_str().is_empty() => relative.to_path_buf(),
            _ => path
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| path.to_path_buf()),
        };

        let kind = resolve_kind(path);
        let size = match kind {
            EntryKind::File => safe_file_size(path),
            EntryKind::Directory => 0,
        };

        EntryDescriptor {
            absolute_path: path.to_path_buf(),
            relative_path,
            kind,
            size,
            modified: safe_modified(path),
            is_symlink: entry.path_is_symlink(),
        }
    }

    /// Run `callback` once for every file, spread over a pool of `threads`
    /// workers (`0` = hardware parallelism).
    ///
    /// Blocks until every callback has finished and returns the first failure
    /// in listing order.
    pub fn for_each_file<F>(&self, callback: F, recursive: bool, threads: usize) -> Result<()>
    where
        F: Fn(&EntryDescriptor) -> Result<()> + Send + Sync + 'static,
    {
        let entries = self.list_entries(recursive, false)?;
        if entries.is_empty() {
            return Ok(());
        }

        let pool = TaskPool::new(threads)?;
        debug!(
            files = entries.len(),
            workers = pool.worker_count(),
            root = %self.root.display(),
            "visiting files"
        );

        let callback = Arc::new(callback);
        let mut handles = Vec::with_capacity(entries.len());
        for entry in entries {
            let callback = Arc::clone(&callback);
            handles.push(pool.submit(move || callback(&entry))?);
        }

        wait_in_order(handles)?;
        Ok(())
    }
}
