//! Readable byte sources.
//!
//! A [`Resource`] knows nothing about formats: it serves bounded reads, an
//! estimated length, and a few lightweight properties. Everything that needs
//! to know *what* the bytes are goes through the [`sniffer`](crate::sniffer).

mod buffer;
mod factory;
mod file;
mod http;
mod reader;
mod tail_cache;

pub use buffer::BufferResource;
pub use factory::{DefaultResourceFactory, ResourceFactory, ResourceFactoryError};
pub use file::FileResource;
pub use http::HttpResource;
pub use reader::ResourceReader;
pub use tail_cache::TailCachingResource;

use std::ops::Range;

use crate::error::ReadResult;
use async_trait::async_trait;
use url::Url;

/// Receives the bytes of a [`Resource::stream`] call, one chunk at a time.
pub type Consumer<'a> = dyn FnMut(&[u8]) + Send + 'a;

/// Lightweight metadata reported by a [`Resource`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceProperties {
    /// Name of the underlying file, if known.
    pub filename: Option<String>,
    /// Media type declared by the source (e.g. an HTTP `Content-Type`).
    pub media_type: Option<String>,
    /// Set when the resource is an entry of an archive.
    pub archive_entry: Option<ArchiveEntryProperties>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveEntryProperties {
    /// Length of the entry as stored in the archive.
    pub entry_length: u64,
    pub is_entry_compressed: bool,
}

/// A capability over a byte-addressable object.
#[async_trait]
pub trait Resource: Send + Sync {
    /// URL of the underlying source, when it has one.
    fn source_url(&self) -> Option<&Url> {
        None
    }

    /// Length in bytes, `None` when unknown.
    async fn estimated_length(&self) -> ReadResult<Option<u64>>;

    async fn properties(&self) -> ReadResult<ResourceProperties> {
        Ok(ResourceProperties::default())
    }

    /// Feed the bytes of `range` (or of the whole resource) to `consume`.
    ///
    /// Ranges are clamped to the resource length; an empty or inverted range
    /// yields no bytes. Dropping the returned future stops the transfer.
    async fn stream(&self, range: Option<Range<u64>>, consume: &mut Consumer<'_>) -> ReadResult<()>;

    /// Collect [`Resource::stream`] into memory.
    async fn read(&self, range: Option<Range<u64>>) -> ReadResult<Vec<u8>> {
        let mut data = Vec::new();
        self.stream(range, &mut |chunk: &[u8]| data.extend_from_slice(chunk))
            .await?;
        Ok(data)
    }
}

/// Last path segment of `url`, percent-decoded, when not empty.
pub(crate) fn url_filename(url: &Url) -> Option<String> {
    url.path_segments()?
        .next_back()
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            percent_encoding::percent_decode_str(segment)
                .decode_utf8_lossy()
                .into_owned()
        })
}

#[cfg(test)]
mod tests {
    use super::url_filename;
    use url::Url;

    #[test]
    fn test_url_filename() {
        #[rustfmt::skip]
        let expected = [
            (Some("book.epub"), "https://example.com/pubs/book.epub"),
            (Some("Moby Dick.epub"), "file:///tmp/Moby%20Dick.epub"),
            (None, "https://example.com/pubs/"),
            (None, "https://example.com"),
        ];

        for (expected, url) in expected {
            let url = Url::parse(url).unwrap();
            assert_eq!(expected.map(str::to_string), url_filename(&url), "{url}");
        }
    }
}
