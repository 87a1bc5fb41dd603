//! Error types for huffpack

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::symbol::Symbol;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("cannot open or create file {}: {source}", path.display())]
    FileOpenFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed archive: {0}")]
    MalformedArchive(String),

    #[error("unexpected end of archive input")]
    UnexpectedEndOfInput,

    #[error("code for symbol {symbol} would be {length} bits long")]
    CodeTooLong { symbol: Symbol, length: usize },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(io::Error),
}

impl ArchiveError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        ArchiveError::MalformedArchive(msg.into())
    }
}

impl From<io::Error> for ArchiveError {
    fn from(e: io::Error) -> Self {
        // bitstream-io reports a drained source as UnexpectedEof
        if e.kind() == io::ErrorKind::UnexpectedEof {
            ArchiveError::UnexpectedEndOfInput
        } else {
            ArchiveError::Io(e)
        }
    }
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
