use async_trait::async_trait;
use std::sync::Arc;

use crate::container::Container;
use crate::error::ReadError;
use crate::format::{Format, FormatSpecification};
use crate::io::{LOCAL_BUFFER_SIZE, MemoryProbe, REMOTE_BUFFER_SIZE, SystemMemory};
use crate::resource::{Resource, TailCachingResource};

use super::container::ZipContainer;
use super::extractor::ZipReadOptions;
use super::structures::TAIL_CACHE_LENGTH;

/// Remote archives up to this size are cached entirely.
pub const FULL_CACHE_CEILING: u64 = 5_000_000;

/// Failure to open a resource as an archive.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum ArchiveOpenError {
    /// The format is not an archive this opener handles. Not a read failure.
    #[error("format not supported by this archive opener")]
    FormatNotSupported,

    #[error(transparent)]
    Reading(#[from] ReadError),
}

/// Promotes a [`Resource`] holding an archive to a [`Container`] of its entries.
#[async_trait]
pub trait ArchiveOpener: Send + Sync {
    async fn open(
        &self,
        resource: Arc<dyn Resource>,
        format: &Format,
    ) -> Result<Arc<dyn Container>, ArchiveOpenError>;
}

/// Buffer sizes and caching thresholds used to read archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveReadStrategy {
    pub local_buffer_size: usize,
    pub remote_buffer_size: usize,
    pub full_cache_ceiling: u64,
}

impl Default for ArchiveReadStrategy {
    fn default() -> Self {
        Self {
            local_buffer_size: LOCAL_BUFFER_SIZE,
            remote_buffer_size: REMOTE_BUFFER_SIZE,
            full_cache_ceiling: FULL_CACHE_CEILING,
        }
    }
}

/// Opens resources conforming to [`FormatSpecification::ZIP`].
#[derive(Clone)]
pub struct ZipArchiveOpener {
    strategy: ArchiveReadStrategy,
    memory: Arc<dyn MemoryProbe>,
    options: ZipReadOptions,
}

impl Default for ZipArchiveOpener {
    fn default() -> Self {
        Self {
            strategy: ArchiveReadStrategy::default(),
            memory: Arc::new(SystemMemory),
            options: ZipReadOptions::default(),
        }
    }
}

impl ZipArchiveOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strategy(mut self, strategy: ArchiveReadStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_memory_probe(mut self, memory: Arc<dyn MemoryProbe>) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_read_options(mut self, options: ZipReadOptions) -> Self {
        self.options = options;
        self
    }

    /// Offset from which a remote archive of `length` bytes is kept in memory.
    ///
    /// Small archives are cached whole when twice their ceiling can be
    /// allocated; otherwise only the tail holding the EOCD records is.
    pub fn tail_cache_offset(&self, length: u64) -> u64 {
        let ceiling = self.strategy.full_cache_ceiling;
        if length <= ceiling && self.memory.can_allocate(ceiling.saturating_mul(2)) {
            0
        } else {
            length.saturating_sub(TAIL_CACHE_LENGTH)
        }
    }

    /// Wrap `resource` for archive reads and pick the read buffer size.
    async fn prepare(&self, resource: Arc<dyn Resource>) -> (Arc<dyn Resource>, usize) {
        let is_local = resource
            .source_url()
            .is_none_or(|url| url.scheme() == "file");
        if is_local {
            return (resource, self.strategy.local_buffer_size);
        }

        let source: Arc<dyn Resource> = match resource.estimated_length().await {
            Ok(Some(length)) => {
                let offset = self.tail_cache_offset(length);
                tracing::debug!(length, cache_from = offset, "caching remote archive tail");
                Arc::new(TailCachingResource::new(resource, length, offset))
            }
            Ok(None) => {
                tracing::debug!("remote archive length unknown, reading uncached");
                resource
            }
            Err(error) => {
                tracing::debug!(%error, "remote archive length unavailable, reading uncached");
                resource
            }
        };

        (source, self.strategy.remote_buffer_size)
    }
}

#[async_trait]
impl ArchiveOpener for ZipArchiveOpener {
    async fn open(
        &self,
        resource: Arc<dyn Resource>,
        format: &Format,
    ) -> Result<Arc<dyn Container>, ArchiveOpenError> {
        if !format.conforms_to(&FormatSpecification::ZIP) {
            return Err(ArchiveOpenError::FormatNotSupported);
        }

        let (source, buffer_size) = self.prepare(resource).await;
        let container = ZipContainer::open(source, buffer_size, self.options)
            .await
            .map_err(ReadError::from)?;

        Ok(Arc::new(container))
    }
}
