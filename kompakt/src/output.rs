//! Output formatting for CLI commands.
//!
//! Provides abstraction layer for outputting results in text or JSON format.

use anyhow::Result;
use chrono::{DateTime, Utc};
use kompakt_core::{ArchiveListing, EntryDescriptor, Outcome};
use serde::Serialize;
use std::io::{self, Write};

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Writer for command output with format abstraction.
pub struct OutputWriter {
    format: OutputFormat,
    stdout: io::Stdout,
}

impl OutputWriter {
    /// Create a new OutputWriter.
    pub fn new(json: bool) -> Self {
        Self {
            format: if json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
            stdout: io::stdout(),
        }
    }

    /// Write output using the configured format.
    ///
    /// The `data` parameter must be a serializable struct that includes
    /// `success: bool` and `result_code: u8` fields.
    ///
    /// The `text_fn` closure is called only in text mode to generate the
    /// human-readable output.
    pub fn write<T: Serialize>(&self, data: &T, text_fn: impl FnOnce() -> String) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                writeln!(&self.stdout, "{}", json)?;
            }
            OutputFormat::Text => {
                let text = text_fn();
                if !text.is_empty() {
                    write!(&self.stdout, "{}", text)?;
                }
            }
        }
        Ok(())
    }

    /// Write an error message to stderr.
    ///
    /// In JSON mode, writes a JSON error object with success=false.
    /// In text mode, writes the error chain directly.
    pub fn write_error(&self, error: &anyhow::Error, result_code: u8) {
        match self.format {
            OutputFormat::Json => {
                let error_output = ErrorOutput {
                    success: false,
                    result_code,
                    error: format!("{:#}", error),
                };
                if let Ok(json) = serde_json::to_string_pretty(&error_output) {
                    let _ = writeln!(io::stderr(), "{}", json);
                }
            }
            OutputFormat::Text => {
                let _ = writeln!(io::stderr(), "Error: {:#}", error);
            }
        }
    }
}

// ============================================================================
// Data Transfer Objects (DTOs) for JSON output
// ============================================================================

/// Error output structure.
#[derive(Debug, Serialize)]
pub struct ErrorOutput {
    pub success: bool,
    pub result_code: u8,
    pub error: String,
}

/// Output for `compress` and `decompress` commands.
#[derive(Debug, Serialize)]
pub struct TransformOutput {
    pub success: bool,
    pub result_code: u8,
    pub operation: String,
    pub algorithm: String,
    pub mode: String,
    pub input: String,
    pub output: String,
    pub entries: usize,
    pub bytes_in: u64,
    pub bytes_out: u64,
}

impl TransformOutput {
    /// Build the output from a library outcome.
    pub fn new(
        operation: &str,
        algorithm: &str,
        input: String,
        output: String,
        outcome: &Outcome,
    ) -> Self {
        Self {
            success: true,
            result_code: 0,
            operation: operation.to_string(),
            algorithm: algorithm.to_string(),
            mode: outcome.mode.as_str().to_string(),
            input,
            output,
            entries: outcome.entries,
            bytes_in: outcome.bytes_in,
            bytes_out: outcome.bytes_out,
        }
    }
}

/// Archive entry information for `list` command.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveEntryInfo {
    pub path: String,
    pub original_size: u64,
    pub stored_size: u64,
}

impl From<ArchiveListing> for ArchiveEntryInfo {
    fn from(listing: ArchiveListing) -> Self {
        Self {
            path: listing.relative_path,
            original_size: listing.original_size,
            stored_size: listing.stored_size,
        }
    }
}

/// Output for `list` command.
#[derive(Debug, Serialize)]
pub struct ListOutput {
    pub success: bool,
    pub result_code: u8,
    pub archive: String,
    pub algorithm: String,
    pub entries: Vec<ArchiveEntryInfo>,
}

/// Entry information for `scan` command.
#[derive(Debug, Clone, Serialize)]
pub struct ScanEntryInfo {
    pub path: String,
    pub kind: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub is_symlink: bool,
}

impl From<&EntryDescriptor> for ScanEntryInfo {
    fn from(descriptor: &EntryDescriptor) -> Self {
        Self {
            path: descriptor.relative_path.display().to_string(),
            kind: descriptor.kind.as_str().to_string(),
            size: descriptor.size,
            modified: DateTime::<Utc>::from(descriptor.modified),
            is_symlink: descriptor.is_symlink,
        }
    }
}

/// Output for `scan` command.
#[derive(Debug, Serialize)]
pub struct ScanOutput {
    pub success: bool,
    pub result_code: u8,
    pub root: String,
    pub entries: Vec<ScanEntryInfo>,
}
