use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::Resource;
use crate::error::ReadResult;
use crate::io::ReadAt;

/// Random access over a [`Resource`], for parsers written against [`ReadAt`].
pub struct ResourceReader {
    resource: Arc<dyn Resource>,
    size: OnceCell<u64>,
}

impl ResourceReader {
    pub fn new(resource: Arc<dyn Resource>) -> Self {
        Self {
            resource,
            size: OnceCell::new(),
        }
    }

    /// A reader over a resource whose length is already known.
    pub fn with_size(resource: Arc<dyn Resource>, size: u64) -> Self {
        Self {
            resource,
            size: OnceCell::new_with(Some(size)),
        }
    }

    pub fn resource(&self) -> &Arc<dyn Resource> {
        &self.resource
    }

    /// Length of a resource that cannot report it, found by reading it through.
    async fn measure(&self) -> ReadResult<u64> {
        let mut size = 0u64;
        self.resource
            .stream(None, &mut |chunk: &[u8]| size += chunk.len() as u64)
            .await?;
        Ok(size)
    }
}

#[async_trait]
impl ReadAt for ResourceReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> ReadResult<usize> {
        let size = self.size().await?;
        if offset >= size || buf.is_empty() {
            return Ok(0);
        }

        let end = (offset + buf.len() as u64).min(size);
        let mut filled = 0;
        self.resource
            .stream(Some(offset..end), &mut |chunk: &[u8]| {
                let n = chunk.len().min(buf.len() - filled);
                buf[filled..filled + n].copy_from_slice(&chunk[..n]);
                filled += n;
            })
            .await?;

        Ok(filled)
    }

    async fn size(&self) -> ReadResult<u64> {
        let size = self
            .size
            .get_or_try_init(|| async {
                match self.resource.estimated_length().await {
                    Ok(Some(length)) => Ok(length),
                    Ok(None) => self.measure().await,
                    Err(error) => {
                        tracing::debug!(%error, "length query failed, measuring by reading");
                        self.measure().await
                    }
                }
            })
            .await?;
        Ok(*size)
    }
}
