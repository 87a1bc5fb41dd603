//! huffpack: a multi-file archiver built on canonical Huffman coding.
//!
//! Every file becomes one record of a single MSB-first bit stream:
//! - a per-file canonical Huffman codebook, transmitted as symbol order plus
//!   per-length counts
//! - the file's base name, coded with that codebook and closed by a sentinel
//! - the file's content, closed by a sentinel saying whether another record follows
//!
//! The crate is layered leaves first: [`bit_stream`], [`priority_queue`],
//! [`trie`], [`codebook`], [`codebook_codec`], and [`archive`] on top.
//! [`Archiver`] ties them to files on disk.

pub mod archive;
pub mod bit_stream;
pub mod codebook;
pub mod codebook_codec;
pub mod config;
pub mod error;
pub mod priority_queue;
pub mod symbol;
pub mod trie;

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::warn;

pub use crate::archive::{ArchiveEntry, ArchiveInput, DirectorySink, EntrySink, MemorySink};
pub use crate::config::ArchiveConfig;
pub use crate::error::{ArchiveError, Result};

/// What one record of an archive held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySummary {
    /// Stored name, lossily decoded as UTF-8.
    pub name: String,
    pub original_size: u64,
    /// Bits of the whole record: codebook, name, content and terminator.
    pub encoded_bits: u64,
    pub alphabet_size: usize,
    pub max_code_length: usize,
}

/// Per-record report of an archive or extract run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ArchiveSummary {
    pub entries: Vec<EntrySummary>,
}

impl ArchiveSummary {
    pub fn total_original_size(&self) -> u64 {
        self.entries.iter().map(|e| e.original_size).sum()
    }

    /// Archive size in whole bytes, counting the final padding.
    pub fn total_encoded_bytes(&self) -> u64 {
        let bits: u64 = self.entries.iter().map(|e| e.encoded_bits).sum();
        (bits + 7) / 8
    }

    /// Encoded size over original size.
    pub fn ratio(&self) -> f64 {
        let original = self.total_original_size();
        if original == 0 {
            1.0
        } else {
            self.total_encoded_bytes() as f64 / original as f64
        }
    }
}

/// The archiver engine
pub struct Archiver {
    config: ArchiveConfig,
}

impl Default for Archiver {
    fn default() -> Self {
        Self::new(ArchiveConfig::default())
    }
}

impl Archiver {
    /// Create a new archiver with the given configuration
    pub fn new(config: ArchiveConfig) -> Self {
        Self { config }
    }

    fn buffer_size(&self) -> usize {
        self.config.io_buffer_size.max(1)
    }

    /// Archive `inputs`, in order, into `sink`.
    pub fn archive<W: Write, R: Read + Seek>(
        &self,
        sink: W,
        inputs: &mut [ArchiveInput<R>],
    ) -> Result<ArchiveSummary> {
        let sink = BufWriter::with_capacity(self.buffer_size(), sink);
        archive::write_archive(sink, inputs, self.buffer_size())
    }

    /// Extract every record of `source` into `sink`.
    pub fn unarchive<R: Read, S: EntrySink + ?Sized>(
        &self,
        source: R,
        sink: &mut S,
    ) -> Result<ArchiveSummary> {
        let source = BufReader::with_capacity(self.buffer_size(), source);
        archive::read_archive(source, sink)
    }

    /// Archive the files at `files` into a new file at `archive_path`.
    ///
    /// All inputs are opened before the archive is created, and none of them
    /// may be the archive itself. A half-written archive is removed if
    /// encoding fails.
    pub fn archive_files(&self, archive_path: &Path, files: &[PathBuf]) -> Result<ArchiveSummary> {
        if files.is_empty() {
            return Err(ArchiveError::InvalidArguments("no files to archive".into()));
        }

        let mut inputs = Vec::with_capacity(files.len());
        for path in files {
            let file = File::open(path).map_err(|source| ArchiveError::FileOpenFailure {
                path: path.clone(),
                source,
            })?;
            inputs.push(ArchiveInput::from_path(path, file)?);
        }

        // Creating the archive truncates it, so it must not also be an input.
        if let Ok(target) = fs::canonicalize(archive_path) {
            if let Some(path) = files
                .iter()
                .find(|path| fs::canonicalize(path).map_or(false, |p| p == target))
            {
                return Err(ArchiveError::InvalidArguments(format!(
                    "{} is both an input and the archive",
                    path.display()
                )));
            }
        }

        let archive = File::create(archive_path).map_err(|source| ArchiveError::FileOpenFailure {
            path: archive_path.to_path_buf(),
            source,
        })?;

        let result = self.archive(archive, &mut inputs);
        if let Err(ref e) = result {
            warn!(path = %archive_path.display(), error = %e, "removing incomplete archive");
            let _ = fs::remove_file(archive_path);
        }
        result
    }

    /// Extract the archive at `archive_path` into the configured output directory.
    pub fn unarchive_file(&self, archive_path: &Path) -> Result<ArchiveSummary> {
        let archive = File::open(archive_path).map_err(|source| ArchiveError::FileOpenFailure {
            path: archive_path.to_path_buf(),
            source,
        })?;
        let mut sink = DirectorySink::from_config(&self.config);
        self.unarchive(archive, &mut sink)
    }

    /// Archive in-memory `(path, contents)` pairs.
    pub fn archive_to_vec(&self, files: &[(&str, &[u8])]) -> Result<Vec<u8>> {
        let mut inputs: Vec<_> = files
            .iter()
            .map(|&(path, contents)| ArchiveInput::new(path, Cursor::new(contents)))
            .collect();
        let mut out = Vec::new();
        self.archive(&mut out, &mut inputs)?;
        Ok(out)
    }

    /// Extract an in-memory archive.
    pub fn unarchive_to_memory(&self, archive: &[u8]) -> Result<Vec<ArchiveEntry>> {
        let mut sink = MemorySink::new();
        self.unarchive(archive, &mut sink)?;
        Ok(sink.into_entries())
    }
}
