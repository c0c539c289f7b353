use async_trait::async_trait;
use reqwest::Client;
use std::ops::Range;
use url::Url;

use super::{Consumer, Resource, ResourceProperties, url_filename};
use crate::error::ReadResult;
use crate::io::HttpRangeReader;

/// A remote object served over HTTP(S) with Range request support.
pub struct HttpResource {
    reader: HttpRangeReader,
}

impl HttpResource {
    pub fn new(client: Client, url: Url) -> Self {
        Self {
            reader: HttpRangeReader::new(client, url),
        }
    }

    /// Bytes received from the network so far.
    pub fn transferred_bytes(&self) -> u64 {
        self.reader.transferred_bytes()
    }
}

#[async_trait]
impl Resource for HttpResource {
    fn source_url(&self) -> Option<&Url> {
        Some(self.reader.url())
    }

    async fn estimated_length(&self) -> ReadResult<Option<u64>> {
        Ok(self.reader.head().await?.content_length)
    }

    async fn properties(&self) -> ReadResult<ResourceProperties> {
        let head = self.reader.head().await?;
        Ok(ResourceProperties {
            filename: url_filename(self.reader.url()),
            media_type: head.content_type.clone(),
            ..Default::default()
        })
    }

    async fn stream(&self, range: Option<Range<u64>>, consume: &mut Consumer<'_>) -> ReadResult<()> {
        self.reader.stream(range, consume).await
    }
}
