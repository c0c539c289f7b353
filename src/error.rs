//! Error types shared by every layer that touches bytes.
//!
//! A [`ReadError`] always means "the bytes could not be obtained or could
//! not be decoded". Not recognizing a format is never a [`ReadError`]:
//! sniffers report that with `None`.

use std::io;

/// Alias for `Result<T, ReadError>`.
pub type ReadResult<T> = Result<T, ReadError>;

/// Failure while reading a [`Resource`](crate::resource::Resource).
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    /// The content exists but is malformed (corrupt ZIP, bad checksum...).
    #[error("[Decoding]: {0}")]
    Decoding(String),

    /// The content could not be accessed locally (missing file, permissions).
    #[error("[Access]: {0}")]
    Access(#[from] io::Error),

    /// The content could not be fetched from the network.
    #[error("[Networking]: {0}")]
    Networking(#[from] HttpError),
}

impl ReadError {
    pub fn decoding(message: impl Into<String>) -> Self {
        Self::Decoding(message.into())
    }
}

/// Failure reported by the HTTP transport.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum HttpError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// The server ignored a `Range` header for a non-zero offset.
    #[error("remote server does not support Range requests")]
    RangeNotSupported,
}
