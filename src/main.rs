use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use huffpack::{ArchiveConfig, ArchiveSummary, Archiver};

/// Every failure, including bad usage, exits with this code.
const EXIT_FAILURE: u8 = 111;

/// Archive and unarchive files using Huffman algorithm with canonization
#[derive(Parser, Debug)]
#[command(name = "huffpack", version)]
struct Cli {
    /// Create ARCHIVE from the given files
    #[arg(
        short = 'c',
        num_args = 2..,
        value_names = ["ARCHIVE", "FILE"],
        required_unless_present = "extract",
        conflicts_with = "extract"
    )]
    create: Option<Vec<PathBuf>>,

    /// Extract ARCHIVE into the current directory
    #[arg(short = 'd', value_name = "ARCHIVE")]
    extract: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print a per-file JSON summary on stdout
    #[arg(long)]
    json: bool,

    /// Log progress to stderr
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all logging
    #[arg(short, long)]
    quiet: bool,
}

fn init_tracing(cli: &Cli) {
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("off")
    } else if cli.verbose {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
    } else {
        tracing_subscriber::EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => ArchiveConfig::from_json_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => ArchiveConfig::default(),
    };
    let archiver = Archiver::new(config);

    let summary: ArchiveSummary = match (cli.create, cli.extract) {
        (Some(mut paths), None) => {
            let archive_path = paths.remove(0);
            archiver
                .archive_files(&archive_path, &paths)
                .context("error occurred while archiving")?
        }
        (None, Some(archive_path)) => archiver
            .unarchive_file(&archive_path)
            .context("error occurred while unarchiving")?,
        _ => anyhow::bail!(huffpack::ArchiveError::InvalidArguments(
            "exactly one of -c or -d is required".into()
        )),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    init_tracing(&cli);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
