use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::ops::Range;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use url::Url;

use crate::container::{Container, RelativeUrl};
use crate::error::ReadResult;
use crate::io::{BufferedReader, ReadAt};
use crate::resource::{ArchiveEntryProperties, Consumer, Resource, ResourceProperties, ResourceReader};

use super::ZipError;
use super::extractor::{ZipArchive, ZipReadOptions};
use super::structures::ZipEntry;

/// The file entries of a ZIP archive, addressed by normalized path.
pub struct ZipContainer {
    source: Arc<dyn Resource>,
    /// Length of `source`, found once while listing.
    source_length: u64,
    buffer_size: usize,
    options: ZipReadOptions,
    entries: BTreeSet<RelativeUrl>,
    files: HashMap<RelativeUrl, ZipEntry>,
}

impl ZipContainer {
    /// List the archive served by `source` once and index its file entries.
    ///
    /// Directory records and paths normalizing to nothing are left out. When
    /// two records normalize to the same path, the last one wins.
    pub async fn open(
        source: Arc<dyn Resource>,
        buffer_size: usize,
        options: ZipReadOptions,
    ) -> Result<Self, ZipError> {
        let reader = Arc::new(ResourceReader::new(source.clone()));
        let source_length = reader.size().await?;
        let archive = open_archive(reader, buffer_size).await?;

        let mut files = HashMap::new();
        for entry in archive.entries().await? {
            if entry.is_directory() {
                continue;
            }
            match RelativeUrl::new(&entry.path) {
                Some(url) => {
                    files.insert(url, entry.clone());
                }
                None => tracing::trace!(path = %entry.path, "skipping entry with an empty path"),
            }
        }
        tracing::debug!(files = files.len(), "listed ZIP archive");

        Ok(Self {
            source,
            source_length,
            buffer_size,
            options,
            entries: files.keys().cloned().collect(),
            files,
        })
    }

    /// The central directory record behind `url`.
    pub fn entry(&self, url: &RelativeUrl) -> Option<&ZipEntry> {
        self.files.get(url)
    }
}

impl Container for ZipContainer {
    fn source_url(&self) -> Option<&Url> {
        self.source.source_url()
    }

    fn entries(&self) -> &BTreeSet<RelativeUrl> {
        &self.entries
    }

    fn get(&self, url: &RelativeUrl) -> Option<Arc<dyn Resource>> {
        let entry = self.files.get(url)?;
        Some(Arc::new(ZipEntryResource {
            source: self.source.clone(),
            source_length: self.source_length,
            buffer_size: self.buffer_size,
            options: self.options,
            url: url.clone(),
            entry: entry.clone(),
            archive: OnceCell::new(),
            reading: Mutex::new(()),
        }))
    }
}

/// One file entry of a [`ZipContainer`].
///
/// The resource opens its own [`ZipArchive`] handle on first read and keeps
/// it. Reads through one instance are serialized on that handle; separate
/// instances read independently.
pub struct ZipEntryResource {
    source: Arc<dyn Resource>,
    source_length: u64,
    buffer_size: usize,
    options: ZipReadOptions,
    url: RelativeUrl,
    entry: ZipEntry,
    archive: OnceCell<ZipArchive<dyn ReadAt>>,
    reading: Mutex<()>,
}

impl ZipEntryResource {
    pub fn entry(&self) -> &ZipEntry {
        &self.entry
    }
}

#[async_trait]
impl Resource for ZipEntryResource {
    async fn estimated_length(&self) -> ReadResult<Option<u64>> {
        Ok(Some(self.entry.uncompressed_size))
    }

    async fn properties(&self) -> ReadResult<ResourceProperties> {
        Ok(ResourceProperties {
            filename: Some(self.url.filename().to_string()),
            archive_entry: Some(ArchiveEntryProperties {
                entry_length: self.entry.compressed_size,
                is_entry_compressed: self.entry.is_compressed(),
            }),
            ..Default::default()
        })
    }

    async fn stream(&self, range: Option<Range<u64>>, consume: &mut Consumer<'_>) -> ReadResult<()> {
        let _reading = self.reading.lock().await;
        let archive = self
            .archive
            .get_or_try_init(|| {
                let reader = ResourceReader::with_size(self.source.clone(), self.source_length);
                open_archive(Arc::new(reader), self.buffer_size)
            })
            .await?;

        archive
            .extract(&self.entry, range, self.options, consume)
            .await?;
        Ok(())
    }
}

async fn open_archive(
    reader: Arc<ResourceReader>,
    buffer_size: usize,
) -> Result<ZipArchive<dyn ReadAt>, ZipError> {
    let buffered: Arc<dyn ReadAt> = Arc::new(BufferedReader::new(reader, buffer_size));
    ZipArchive::open(buffered).await
}
