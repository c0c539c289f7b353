use async_trait::async_trait;
use std::ops::Range;
use std::sync::Arc;
use tokio::sync::OnceCell;
use url::Url;

use super::{Consumer, Resource, ResourceProperties};
use crate::error::{ReadError, ReadResult};
use crate::io::clamp_range;

/// Keeps the bytes from `cache_from_offset` to the end of `inner` in memory.
///
/// The tail is fetched once, on the first read touching it. Reads before
/// the offset always go to `inner`. An offset of 0 caches the whole resource.
pub struct TailCachingResource {
    inner: Arc<dyn Resource>,
    length: u64,
    cache_from_offset: u64,
    tail: OnceCell<Vec<u8>>,
}

impl TailCachingResource {
    pub fn new(inner: Arc<dyn Resource>, length: u64, cache_from_offset: u64) -> Self {
        Self {
            inner,
            length,
            cache_from_offset: cache_from_offset.min(length),
            tail: OnceCell::new(),
        }
    }

    pub fn cache_from_offset(&self) -> u64 {
        self.cache_from_offset
    }

    async fn tail(&self) -> ReadResult<&[u8]> {
        let tail = self
            .tail
            .get_or_try_init(|| async {
                tracing::trace!(
                    from = self.cache_from_offset,
                    to = self.length,
                    "filling tail cache"
                );
                let data = self
                    .inner
                    .read(Some(self.cache_from_offset..self.length))
                    .await?;
                let expected = self.length - self.cache_from_offset;
                if data.len() as u64 != expected {
                    return Err(ReadError::decoding(format!(
                        "expected {expected} bytes at the end of the resource, got {}",
                        data.len()
                    )));
                }
                Ok(data)
            })
            .await?;
        Ok(tail)
    }
}

#[async_trait]
impl Resource for TailCachingResource {
    fn source_url(&self) -> Option<&Url> {
        self.inner.source_url()
    }

    async fn estimated_length(&self) -> ReadResult<Option<u64>> {
        Ok(Some(self.length))
    }

    async fn properties(&self) -> ReadResult<ResourceProperties> {
        self.inner.properties().await
    }

    async fn stream(&self, range: Option<Range<u64>>, consume: &mut Consumer<'_>) -> ReadResult<()> {
        let range = clamp_range(range, self.length);
        let split = self.cache_from_offset;

        if range.start < split {
            self.inner
                .stream(Some(range.start..range.end.min(split)), consume)
                .await?;
        }
        if range.end > split {
            let tail = self.tail().await?;
            let start = (range.start.max(split) - split) as usize;
            let end = (range.end - split) as usize;
            consume(&tail[start..end]);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CountingResource;

    fn fixture() -> Arc<CountingResource> {
        Arc::new(CountingResource::remote((0..=99u8).collect::<Vec<_>>()))
    }

    #[tokio::test]
    async fn test_tail_is_fetched_once() {
        let inner = fixture();
        let resource = TailCachingResource::new(inner.clone(), 100, 80);

        assert_eq!((85..90).collect::<Vec<u8>>(), resource.read(Some(85..90)).await.unwrap());
        assert_eq!((90..100).collect::<Vec<u8>>(), resource.read(Some(90..100)).await.unwrap());
        assert_eq!(vec![80..100], inner.requested_ranges());
    }

    #[tokio::test]
    async fn test_read_spanning_the_split() {
        let inner = fixture();
        let resource = TailCachingResource::new(inner.clone(), 100, 80);

        assert_eq!((70..95).collect::<Vec<u8>>(), resource.read(Some(70..95)).await.unwrap());
        assert_eq!(vec![70..80, 80..100], inner.requested_ranges());

        assert_eq!((10..20).collect::<Vec<u8>>(), resource.read(Some(10..20)).await.unwrap());
        assert_eq!(vec![70..80, 80..100, 10..20], inner.requested_ranges());
    }

    #[tokio::test]
    async fn test_offset_zero_caches_everything() {
        let inner = fixture();
        let resource = TailCachingResource::new(inner.clone(), 100, 0);

        assert_eq!((0..=99u8).collect::<Vec<_>>(), resource.read(None).await.unwrap());
        assert_eq!((3..7).collect::<Vec<u8>>(), resource.read(Some(3..7)).await.unwrap());
        assert_eq!(vec![0..100], inner.requested_ranges());
    }

    #[tokio::test]
    async fn test_offset_is_clamped_to_length() {
        let resource = TailCachingResource::new(fixture(), 100, 500);
        assert_eq!(100, resource.cache_from_offset());
        assert_eq!(Some(100), resource.estimated_length().await.unwrap());
    }
}
