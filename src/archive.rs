//! Multi-file archive framing.
//!
//! An archive is a single bit stream of records, one per file:
//!
//! ```text
//! [codebook][filename codes][FILENAME_END][content codes][ONE_MORE_FILE | ARCHIVE_END]
//! ```
//!
//! Each record carries its own codebook, built from the filename and content
//! of that file alone. Only the last record ends with `ARCHIVE_END`.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::bit_stream::{BitInput, BitOutput};
use crate::codebook::{Codebook, FrequencyTable};
use crate::codebook_codec::{read_codebook, write_codebook};
use crate::config::ArchiveConfig;
use crate::error::{ArchiveError, Result};
use crate::symbol::{is_sentinel, Symbol, ARCHIVE_END, FILENAME_END, ONE_MORE_FILE};
use crate::{ArchiveSummary, EntrySummary};

/// A file to archive: the raw bytes of the path it was given under, and
/// its contents.
pub struct ArchiveInput<R> {
    pub path: Vec<u8>,
    pub reader: R,
}

impl<R> ArchiveInput<R> {
    pub fn new(path: impl Into<Vec<u8>>, reader: R) -> Self {
        Self {
            path: path.into(),
            reader,
        }
    }

    /// Input named by a filesystem path.
    pub fn from_path(path: &Path, reader: R) -> Result<Self> {
        Ok(Self::new(path_bytes(path)?, reader))
    }
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Result<Vec<u8>> {
    use std::os::unix::ffi::OsStrExt;
    Ok(path.as_os_str().as_bytes().to_vec())
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Result<Vec<u8>> {
    path.to_str()
        .map(|s| s.as_bytes().to_vec())
        .ok_or_else(|| {
            ArchiveError::InvalidArguments(format!("{} is not valid Unicode", path.display()))
        })
}

#[cfg(unix)]
fn entry_path(root: &Path, name: &[u8]) -> Result<PathBuf> {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    Ok(root.join(OsStr::from_bytes(name)))
}

#[cfg(not(unix))]
fn entry_path(root: &Path, name: &[u8]) -> Result<PathBuf> {
    let name = std::str::from_utf8(name).map_err(|_| {
        ArchiveError::malformed(format!(
            "stored filename {} cannot be represented on this platform",
            display_name(name)
        ))
    })?;
    Ok(root.join(name))
}

/// Lossy text form of a stored name, for logs and reports.
pub(crate) fn display_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

/// The part of `path` after its last `/`.
pub fn stored_name(path: &[u8]) -> &[u8] {
    match path.iter().rposition(|&b| b == b'/') {
        Some(slash) => &path[slash + 1..],
        None => path,
    }
}

/// Destination for extracted files.
pub trait EntrySink {
    /// Open a writer for the entry whose stored name is `name`. It is
    /// dropped before the next entry is created.
    fn create(&mut self, name: &[u8]) -> Result<Box<dyn Write + '_>>;
}

/// Extracts into a directory on disk.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
    overwrite_existing: bool,
    buffer_size: usize,
    created: Vec<PathBuf>,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::from_config(&ArchiveConfig {
            output_dir: root.into(),
            ..ArchiveConfig::default()
        })
    }

    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self {
            root: config.output_dir.clone(),
            overwrite_existing: config.overwrite_existing,
            buffer_size: config.io_buffer_size.max(1),
            created: Vec::new(),
        }
    }

    pub fn overwrite_existing(mut self, overwrite: bool) -> Self {
        self.overwrite_existing = overwrite;
        self
    }

    /// Paths written so far, in archive order.
    pub fn created(&self) -> &[PathBuf] {
        &self.created
    }
}

/// Stored names must be a single plain path component.
fn validate_entry_name(name: &[u8]) -> Result<()> {
    if name.is_empty() || name == b"." || name == b".." {
        return Err(ArchiveError::malformed(format!(
            "stored filename {:?} is not a file name",
            display_name(name)
        )));
    }
    if name.iter().any(|&b| matches!(b, b'/' | b'\\' | 0)) {
        return Err(ArchiveError::malformed(format!(
            "stored filename {:?} contains a path separator",
            display_name(name)
        )));
    }
    Ok(())
}

impl EntrySink for DirectorySink {
    fn create(&mut self, name: &[u8]) -> Result<Box<dyn Write + '_>> {
        validate_entry_name(name)?;
        let path = entry_path(&self.root, name)?;

        let mut options = OpenOptions::new();
        options.write(true);
        if self.overwrite_existing {
            if path.exists() {
                warn!(path = %path.display(), "overwriting existing file");
            }
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }

        let file = options
            .open(&path)
            .map_err(|source| ArchiveError::FileOpenFailure {
                path: path.clone(),
                source,
            })?;
        self.created.push(path);
        Ok(Box::new(BufWriter::with_capacity(self.buffer_size, file)))
    }
}

/// An extracted file held in memory.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArchiveEntry {
    pub name: Vec<u8>,
    pub contents: Vec<u8>,
}

/// Collects extracted files in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Vec<ArchiveEntry>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_entries(self) -> Vec<ArchiveEntry> {
        self.entries
    }
}

impl EntrySink for MemorySink {
    fn create(&mut self, name: &[u8]) -> Result<Box<dyn Write + '_>> {
        self.entries.push(ArchiveEntry {
            name: name.to_vec(),
            contents: Vec::new(),
        });
        let last = self.entries.len() - 1;
        Ok(Box::new(&mut self.entries[last].contents))
    }
}

/// Feed `reader` to `f` one buffer at a time; returns the byte count.
fn for_each_chunk<R: Read>(
    reader: R,
    capacity: usize,
    mut f: impl FnMut(&[u8]) -> Result<()>,
) -> Result<u64> {
    let mut reader = BufReader::with_capacity(capacity.max(1), reader);
    let mut total = 0u64;
    loop {
        let chunk = match reader.fill_buf() {
            Ok(chunk) => chunk,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(ArchiveError::Io(e)),
        };
        if chunk.is_empty() {
            return Ok(total);
        }
        let len = chunk.len();
        f(chunk)?;
        reader.consume(len);
        total += len as u64;
    }
}

fn put_symbol<W: Write>(out: &mut BitOutput<W>, codebook: &Codebook, symbol: Symbol) -> Result<()> {
    let code = codebook.get(symbol).ok_or_else(|| {
        ArchiveError::InvalidArguments(format!("symbol {symbol} has no code in this codebook"))
    })?;
    out.put(code.bits, code.length as u32)
}

fn write_record<W: Write, R: Read + Seek>(
    out: &mut BitOutput<W>,
    input: &mut ArchiveInput<R>,
    is_last: bool,
    buffer_size: usize,
) -> Result<EntrySummary> {
    let name = stored_name(&input.path).to_vec();
    if name.is_empty() {
        return Err(ArchiveError::InvalidArguments(format!(
            "{:?} has no file name component",
            display_name(&input.path)
        )));
    }
    let display_str = display_name(&name);
    let start_bits = out.bits_written();

    let mut frequencies = FrequencyTable::with_sentinels();
    frequencies.count_bytes(&name);
    input.reader.seek(SeekFrom::Start(0))?;
    let original_size = for_each_chunk(&mut input.reader, buffer_size, |chunk| {
        frequencies.count_bytes(chunk);
        Ok(())
    })?;

    let codebook = Codebook::build(&frequencies)?;
    debug!(
        name = %display_str,
        alphabet_size = codebook.len(),
        max_code_length = codebook.max_length(),
        "built codebook"
    );
    write_codebook(&codebook, out)?;

    for &byte in &name {
        put_symbol(out, &codebook, Symbol::from(byte))?;
    }
    put_symbol(out, &codebook, FILENAME_END)?;

    input.reader.seek(SeekFrom::Start(0))?;
    let reread = for_each_chunk(&mut input.reader, buffer_size, |chunk| {
        for &byte in chunk {
            put_symbol(out, &codebook, Symbol::from(byte))?;
        }
        Ok(())
    })?;
    if reread != original_size {
        return Err(ArchiveError::InvalidArguments(format!(
            "{display_str} changed size while being archived ({original_size} then {reread} bytes)"
        )));
    }

    put_symbol(out, &codebook, if is_last { ARCHIVE_END } else { ONE_MORE_FILE })?;

    let summary = EntrySummary {
        name: display_str,
        original_size,
        encoded_bits: out.bits_written() - start_bits,
        alphabet_size: codebook.len(),
        max_code_length: codebook.max_length(),
    };
    info!(
        name = %summary.name,
        original_size = summary.original_size,
        encoded_bits = summary.encoded_bits,
        "archived entry"
    );
    Ok(summary)
}

/// Write every input, in order, as one archive into `sink`.
///
/// Each reader is rewound and read twice: once to count frequencies, once
/// to encode.
pub fn write_archive<W: Write, R: Read + Seek>(
    sink: W,
    inputs: &mut [ArchiveInput<R>],
    buffer_size: usize,
) -> Result<ArchiveSummary> {
    if inputs.is_empty() {
        return Err(ArchiveError::InvalidArguments("no files to archive".into()));
    }

    let mut out = BitOutput::new(sink);
    let last = inputs.len() - 1;
    let mut entries = Vec::with_capacity(inputs.len());
    for (index, input) in inputs.iter_mut().enumerate() {
        entries.push(write_record(&mut out, input, index == last, buffer_size)?);
    }
    out.finish()?;

    Ok(ArchiveSummary { entries })
}

fn read_record<R: Read, S: EntrySink + ?Sized>(
    input: &mut BitInput<R>,
    sink: &mut S,
) -> Result<(EntrySummary, bool)> {
    let start_bits = input.bits_read();
    let codebook = read_codebook(input)?;
    let trie = codebook.to_trie()?;

    let mut name = Vec::new();
    loop {
        match trie.decode_symbol(input)? {
            FILENAME_END => break,
            symbol if is_sentinel(symbol) => {
                return Err(ArchiveError::malformed("record ends inside a filename"));
            }
            symbol => name.push(symbol as u8),
        }
    }

    let mut writer = sink.create(&name)?;
    let mut original_size = 0u64;
    let has_more = loop {
        match trie.decode_symbol(input)? {
            ONE_MORE_FILE => break true,
            ARCHIVE_END => break false,
            FILENAME_END => {
                return Err(ArchiveError::malformed(
                    "filename terminator inside file content",
                ));
            }
            symbol => {
                writer.write_all(&[symbol as u8])?;
                original_size += 1;
            }
        }
    };
    writer.flush()?;
    drop(writer);

    let summary = EntrySummary {
        name: display_name(&name),
        original_size,
        encoded_bits: input.bits_read() - start_bits,
        alphabet_size: codebook.len(),
        max_code_length: codebook.max_length(),
    };
    info!(
        name = %summary.name,
        original_size = summary.original_size,
        encoded_bits = summary.encoded_bits,
        "extracted entry"
    );
    Ok((summary, has_more))
}

/// Decode records from `source` until `ARCHIVE_END`, handing each file to `sink`.
pub fn read_archive<R: Read, S: EntrySink + ?Sized>(
    source: R,
    sink: &mut S,
) -> Result<ArchiveSummary> {
    let mut input = BitInput::new(source);
    let mut entries = Vec::new();
    loop {
        let (summary, has_more) = read_record(&mut input, sink)?;
        entries.push(summary);
        if !has_more {
            break;
        }
    }
    Ok(ArchiveSummary { entries })
}
