use async_trait::async_trait;
use std::ops::Range;
use url::Url;

use super::{Consumer, Resource, ResourceProperties};
use crate::error::ReadResult;
use crate::io::clamp_range;

/// Bytes already held in memory.
#[derive(Debug, Clone, Default)]
pub struct BufferResource {
    data: Vec<u8>,
    url: Option<Url>,
    properties: ResourceProperties,
}

impl BufferResource {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            ..Default::default()
        }
    }

    /// Report `url` as the source of these bytes.
    pub fn with_source_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    pub fn with_properties(mut self, properties: ResourceProperties) -> Self {
        self.properties = properties;
        self
    }
}

#[async_trait]
impl Resource for BufferResource {
    fn source_url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    async fn estimated_length(&self) -> ReadResult<Option<u64>> {
        Ok(Some(self.data.len() as u64))
    }

    async fn properties(&self) -> ReadResult<ResourceProperties> {
        Ok(self.properties.clone())
    }

    async fn stream(&self, range: Option<Range<u64>>, consume: &mut Consumer<'_>) -> ReadResult<()> {
        let range = clamp_range(range, self.data.len() as u64);
        if !range.is_empty() {
            consume(&self.data[range.start as usize..range.end as usize]);
        }
        Ok(())
    }
}
