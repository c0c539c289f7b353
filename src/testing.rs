//! Fixtures shared by unit tests.

use async_trait::async_trait;
use std::io::{Cursor, Write};
use std::ops::Range;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

use ::zip::CompressionMethod;
use ::zip::write::{SimpleFileOptions, ZipWriter};

use crate::error::{HttpError, ReadError, ReadResult};
use crate::resource::{BufferResource, Consumer, Resource, ResourceProperties};

/// Content of `b/c.txt` in [`fixture_entries`]: 20 bytes that deflate well.
pub const C_TXT: &[u8; 20] = b"cccccccccccccccccccc";

/// Builds ZIP archives in memory.
pub struct ZipFixture {
    writer: ZipWriter<Cursor<Vec<u8>>>,
}

impl ZipFixture {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    fn file(mut self, path: &str, data: &[u8], method: CompressionMethod) -> Self {
        let options = SimpleFileOptions::default().compression_method(method);
        self.writer.start_file(path, options).unwrap();
        self.writer.write_all(data).unwrap();
        self
    }

    pub fn stored(self, path: &str, data: &[u8]) -> Self {
        self.file(path, data, CompressionMethod::Stored)
    }

    pub fn deflated(self, path: &str, data: &[u8]) -> Self {
        self.file(path, data, CompressionMethod::Deflated)
    }

    pub fn directory(mut self, path: &str) -> Self {
        self.writer
            .add_directory(path, SimpleFileOptions::default())
            .unwrap();
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.writer.set_comment(comment);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.writer.finish().unwrap().into_inner()
    }
}

/// `a.txt` (10 bytes, stored), `b/` (directory), `b/c.txt` (20 bytes, deflated).
pub fn fixture_entries() -> Vec<u8> {
    ZipFixture::new()
        .stored("a.txt", b"0123456789")
        .directory("b/")
        .deflated("b/c.txt", C_TXT)
        .build()
}

/// An in-memory resource posing as a remote one, recording every range it serves.
pub struct CountingResource {
    inner: BufferResource,
    url: Url,
    failing_length: bool,
    ranges: Mutex<Vec<Range<u64>>>,
    whole_reads: AtomicUsize,
}

impl CountingResource {
    pub fn remote(data: impl Into<Vec<u8>>) -> Self {
        let url = Url::parse("https://example.com/archive.zip").unwrap();
        Self {
            inner: BufferResource::new(data),
            url,
            failing_length: false,
            ranges: Mutex::new(Vec::new()),
            whole_reads: AtomicUsize::new(0),
        }
    }

    /// Make [`Resource::estimated_length`] fail like an unreachable `HEAD`.
    pub fn failing_length(mut self) -> Self {
        self.failing_length = true;
        self
    }

    pub fn requested_ranges(&self) -> Vec<Range<u64>> {
        self.ranges.lock().unwrap().clone()
    }

    /// How many times the content was streamed without a range.
    pub fn whole_reads(&self) -> usize {
        self.whole_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Resource for CountingResource {
    fn source_url(&self) -> Option<&Url> {
        Some(&self.url)
    }

    async fn estimated_length(&self) -> ReadResult<Option<u64>> {
        if self.failing_length {
            return Err(ReadError::Networking(HttpError::Status(503)));
        }
        self.inner.estimated_length().await
    }

    async fn properties(&self) -> ReadResult<ResourceProperties> {
        Ok(ResourceProperties::default())
    }

    async fn stream(&self, range: Option<Range<u64>>, consume: &mut Consumer<'_>) -> ReadResult<()> {
        let length = self.inner.read(None).await?.len() as u64;
        if range.is_none() {
            self.whole_reads.fetch_add(1, Ordering::SeqCst);
        }
        let recorded = range.clone().unwrap_or(0..length);
        self.ranges.lock().unwrap().push(recorded);
        self.inner.stream(range, consume).await
    }
}
