//! Read-only ZIP support: directory parsing, entry extraction and the
//! container built on top of them.
//!
//! - [`structures`]: fixed-layout records and their sizes
//! - [`parser`]: [`ZipParser`], which finds and decodes the central directory
//!   through any [`ReadAt`](crate::io::ReadAt)
//! - [`extractor`]: [`ZipArchive`], which streams entry bytes, whole or by range
//! - [`opener`]: [`ZipArchiveOpener`], which chooses how to read a
//!   [`Resource`](crate::resource::Resource) before promoting it to a [`ZipContainer`]
//! - [`container`]: [`ZipContainer`] and its [`ZipEntryResource`]s
//!
//! Local files are read with a small buffer. Remote resources get a large
//! read-ahead buffer, and their tail is kept in memory (the whole resource
//! when it is small), so finding the central directory again costs no
//! request.
//!
//! ZIP64 archives are understood. Entries may be STORED or DEFLATE and are
//! checked against their CRC-32. Encrypted entries and multi-disk archives
//! are rejected.

mod container;
mod extractor;
mod opener;
mod parser;
mod structures;

pub use container::{ZipContainer, ZipEntryResource};
pub use extractor::{ZipArchive, ZipReadOptions};
pub use opener::{ArchiveOpenError, ArchiveOpener, ArchiveReadStrategy, ZipArchiveOpener};
pub use parser::ZipParser;
pub use structures::*;

use crate::error::ReadError;

/// Failure while parsing or extracting a ZIP archive.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum ZipError {
    #[error("not a ZIP archive: end of central directory not found")]
    NotAZip,

    #[error("invalid {0}")]
    Malformed(&'static str),

    #[error("unsupported compression method {0}")]
    UnsupportedCompression(u16),

    #[error("`{0}` is encrypted")]
    Encrypted(String),

    #[error("corrupt deflate stream: {0}")]
    Deflate(#[from] flate2::DecompressError),

    #[error("CRC-32 mismatch for `{path}`: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        path: String,
        expected: u32,
        actual: u32,
    },

    #[error("`{path}` holds {actual} bytes instead of {expected}")]
    SizeMismatch {
        path: String,
        expected: u64,
        actual: u64,
    },

    #[error(transparent)]
    Read(#[from] ReadError),
}

impl From<ZipError> for ReadError {
    fn from(error: ZipError) -> Self {
        match error {
            ZipError::Read(error) => error,
            error => ReadError::Decoding(error.to_string()),
        }
    }
}
