use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_TYPE, HeaderName, RANGE};
use reqwest::{Client, StatusCode};
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::OnceCell;
use url::Url;

use crate::error::{HttpError, ReadResult};

/// Response metadata of a `HEAD` request.
#[derive(Debug, Clone, Default)]
pub struct HeadInfo {
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
}

/// HTTP Range reader for remote resources.
///
/// Nothing is sent until the first length query or read. Failed requests are
/// never retried: every error goes back to the caller.
pub struct HttpRangeReader {
    client: Client,
    url: Url,
    head: OnceCell<HeadInfo>,
    transferred_bytes: AtomicU64,
}

impl HttpRangeReader {
    pub fn new(client: Client, url: Url) -> Self {
        Self {
            client,
            url,
            head: OnceCell::new(),
            transferred_bytes: AtomicU64::new(0),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get total bytes transferred from network
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }

    /// Metadata reported by a `HEAD` request, cached after the first call.
    ///
    /// Both fields are `None` when the server refuses `HEAD`.
    pub async fn head(&self) -> ReadResult<&HeadInfo> {
        let head = self
            .head
            .get_or_try_init(|| async {
                let resp = self
                    .client
                    .head(self.url.clone())
                    .send()
                    .await
                    .map_err(HttpError::from)?;

                if !resp.status().is_success() {
                    tracing::debug!(url = %self.url, status = %resp.status(), "HEAD refused, length unknown");
                    return Ok::<_, HttpError>(HeadInfo::default());
                }

                let header = |name: HeaderName| resp.headers().get(name).and_then(|v| v.to_str().ok());
                if !header(ACCEPT_RANGES).is_some_and(|v| v.contains("bytes")) {
                    tracing::debug!(url = %self.url, "server does not advertise Range support");
                }

                Ok(HeadInfo {
                    content_length: header(CONTENT_LENGTH).and_then(|s| s.parse().ok()),
                    content_type: header(CONTENT_TYPE).map(str::to_string),
                })
            })
            .await?;

        Ok(head)
    }

    /// Stream `range` (or the whole body) to `consume`, chunk by chunk.
    ///
    /// A server answering `200 OK` to a ranged request is only accepted when
    /// the range starts at 0; the body is then truncated to the range.
    pub async fn stream(
        &self,
        range: Option<Range<u64>>,
        consume: &mut (dyn FnMut(&[u8]) + Send),
    ) -> ReadResult<()> {
        let mut request = self.client.get(self.url.clone());
        if let Some(range) = &range {
            if range.start >= range.end {
                return Ok(());
            }
            request = request.header(RANGE, format!("bytes={}-{}", range.start, range.end - 1));
        }

        tracing::trace!(url = %self.url, ?range, "GET");
        let mut resp = request.send().await.map_err(HttpError::from)?;

        match (resp.status(), &range) {
            (StatusCode::PARTIAL_CONTENT, _) | (StatusCode::OK, None) => {}
            (StatusCode::OK, Some(range)) if range.start == 0 => {}
            (StatusCode::OK, Some(_)) => return Err(HttpError::RangeNotSupported.into()),
            // The requested range starts past the end of the resource.
            (StatusCode::RANGE_NOT_SATISFIABLE, Some(_)) => return Ok(()),
            (status, _) => return Err(HttpError::Status(status.as_u16()).into()),
        }

        let mut remaining = range.map(|range| range.end - range.start);
        while let Some(chunk) = resp.chunk().await.map_err(HttpError::from)? {
            let len = match remaining {
                Some(remaining) => (chunk.len() as u64).min(remaining) as usize,
                None => chunk.len(),
            };
            self.transferred_bytes
                .fetch_add(len as u64, Ordering::Relaxed);
            consume(&chunk[..len]);

            if let Some(remaining) = remaining.as_mut() {
                *remaining -= len as u64;
                if *remaining == 0 {
                    break;
                }
            }
        }

        Ok(())
    }
}
