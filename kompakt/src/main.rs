mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kompakt_core::{Algorithm, DirectoryContext, Options};
use output::{ListOutput, OutputWriter, ScanEntryInfo, ScanOutput, TransformOutput};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Kompakt - Huffman and LZW compression for files and directories
#[derive(Parser)]
#[command(name = "kompakt")]
#[command(about = "Compress files and directory trees with Huffman or LZW", long_about = None)]
#[command(version)]
struct Cli {
    /// Output results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging (KOMPAKT_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file, or a directory into an archive
    Compress {
        #[command(flatten)]
        args: TransformArgs,
    },

    /// Decompress a file or an archive (detected from its header)
    Decompress {
        #[command(flatten)]
        args: TransformArgs,
    },

    /// List the entries of an archive
    List {
        /// Archive to inspect
        archive: PathBuf,
    },

    /// Show the entries the directory walker produces
    Scan {
        /// Directory to scan
        dir: PathBuf,

        /// Only list the top level
        #[arg(long)]
        flat: bool,

        /// Include directories in the listing
        #[arg(long)]
        dirs: bool,

        /// Descend into symlinked directories
        #[arg(long)]
        follow_symlinks: bool,
    },
}

#[derive(clap::Args)]
struct TransformArgs {
    /// Codec to use (huffman or lzw)
    #[arg(short, long)]
    algo: String,

    /// Input file or directory
    #[arg(short, long)]
    input: PathBuf,

    /// Output file (or destination directory for archives)
    #[arg(short, long)]
    output: PathBuf,

    /// Worker threads (defaults to KOMPAKT_THREADS env var or all cores)
    #[arg(short, long)]
    threads: Option<usize>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let output = OutputWriter::new(cli.json);

    let result = match cli.command {
        Commands::Compress { args } => cmd_compress(&args, &output),
        Commands::Decompress { args } => cmd_decompress(&args, &output),
        Commands::List { archive } => cmd_list(&archive, &output),
        Commands::Scan {
            dir,
            flat,
            dirs,
            follow_symlinks,
        } => cmd_scan(&dir, !flat, dirs, follow_symlinks, &output),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output.write_error(&err, 1);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("KOMPAKT_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Build library options: --threads > KOMPAKT_THREADS env var > 0 (all cores)
fn resolve_options(threads: Option<usize>) -> Result<Options> {
    let threads = match threads {
        Some(threads) => threads,
        None => match std::env::var("KOMPAKT_THREADS") {
            Ok(value) => value
                .trim()
                .parse()
                .with_context(|| format!("Invalid KOMPAKT_THREADS value: {}", value))?,
            Err(_) => 0,
        },
    };

    let options = Options {
        threads,
        ..Options::default()
    };
    debug!(threads = options.threads, "resolved options");
    Ok(options)
}

fn cmd_compress(args: &TransformArgs, output: &OutputWriter) -> Result<()> {
    let algorithm = Algorithm::parse(&args.algo)?;
    let options = resolve_options(args.threads)?;

    let outcome = kompakt_core::compress(algorithm, &args.input, &args.output, &options)
        .with_context(|| {
            format!(
                "Failed to compress {} to {}",
                args.input.display(),
                args.output.display()
            )
        })?;

    let data = TransformOutput::new(
        "compress",
        algorithm.as_str(),
        args.input.display().to_string(),
        args.output.display().to_string(),
        &outcome,
    );
    output.write(&data, || {
        format!(
            "Compressed {} ({} {}, {} entries): {} -> {} bytes\n",
            args.input.display(),
            algorithm.as_str(),
            outcome.mode.as_str(),
            outcome.entries,
            outcome.bytes_in,
            outcome.bytes_out
        )
    })
}

fn cmd_decompress(args: &TransformArgs, output: &OutputWriter) -> Result<()> {
    let algorithm = Algorithm::parse(&args.algo)?;
    let options = resolve_options(args.threads)?;

    let outcome = kompakt_core::decompress(algorithm, &args.input, &args.output, &options)
        .with_context(|| {
            format!(
                "Failed to decompress {} to {}",
                args.input.display(),
                args.output.display()
            )
        })?;

    let data = TransformOutput::new(
        "decompress",
        algorithm.as_str(),
        args.input.display().to_string(),
        args.output.display().to_string(),
        &outcome,
    );
    output.write(&data, || {
        format!(
            "Decompressed {} ({} {}, {} entries) to {}: {} bytes\n",
            args.input.display(),
            algorithm.as_str(),
            outcome.mode.as_str(),
            outcome.entries,
            args.output.display(),
            outcome.bytes_out
        )
    })
}

fn cmd_list(archive: &Path, output: &OutputWriter) -> Result<()> {
    let kind = kompakt_core::sniff(archive)
        .with_context(|| format!("Failed to read header of {}", archive.display()))?;
    let listing = kompakt_core::list_archive(archive)
        .with_context(|| format!("Failed to list archive {}", archive.display()))?;

    let data = ListOutput {
        success: true,
        result_code: 0,
        archive: archive.display().to_string(),
        algorithm: kind.algorithm().as_str().to_string(),
        entries: listing.into_iter().map(Into::into).collect(),
    };

    output.write(&data, || {
        if data.entries.is_empty() {
            return "Archive is empty\n".to_string();
        }
        let mut text = String::new();
        for entry in &data.entries {
            text.push_str(&format!(
                "{:>12} {:>12} {}\n",
                entry.original_size, entry.stored_size, entry.path
            ));
        }
        text
    })
}

fn cmd_scan(
    dir: &Path,
    recursive: bool,
    include_directories: bool,
    follow_symlinks: bool,
    output: &OutputWriter,
) -> Result<()> {
    let directory = DirectoryContext::open(dir, follow_symlinks)
        .with_context(|| format!("Failed to open directory {}", dir.display()))?;
    let entries = directory
        .list_entries(recursive, include_directories)
        .with_context(|| format!("Failed to list {}", dir.display()))?;

    let data = ScanOutput {
        success: true,
        result_code: 0,
        root: directory.root().display().to_string(),
        entries: entries.iter().map(ScanEntryInfo::from).collect(),
    };

    output.write(&data, || {
        let mut text = String::new();
        for entry in &data.entries {
            let type_char = if entry.kind == "directory" { 'd' } else { 'f' };
            let link = if entry.is_symlink { "@" } else { "" };
            text.push_str(&format!(
                "{} {:>12} {} {}{}\n",
                type_char,
                entry.size,
                entry.modified.format("%Y-%m-%d %H:%M:%S"),
                entry.path,
                link
            ));
        }
        text
    })
}
