use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::{FileResource, HttpResource, Resource};

/// Failure to create a [`Resource`] for a URL.
#[non_exhaustive]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceFactoryError {
    #[error("URL scheme `{0}` is not supported")]
    SchemeNotSupported(String),
}

/// Opens a [`Resource`] for a URL.
///
/// This is the only place where scheme-specific logic lives.
#[async_trait]
pub trait ResourceFactory: Send + Sync {
    async fn make(&self, url: &Url) -> Result<Arc<dyn Resource>, ResourceFactoryError>;
}

/// Serves `file://` from the local filesystem and `http(s)://` with [`reqwest`].
///
/// Resources are opened lazily: a missing file or an unreachable host is
/// reported by the first read, not here.
#[derive(Clone)]
pub struct DefaultResourceFactory {
    client: Client,
}

impl DefaultResourceFactory {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Default for DefaultResourceFactory {
    fn default() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self::new(client)
    }
}

#[async_trait]
impl ResourceFactory for DefaultResourceFactory {
    async fn make(&self, url: &Url) -> Result<Arc<dyn Resource>, ResourceFactoryError> {
        match url.scheme() {
            "file" => FileResource::from_url(url)
                .map(|resource| Arc::new(resource) as Arc<dyn Resource>)
                .ok_or_else(|| ResourceFactoryError::SchemeNotSupported(url.scheme().to_string())),
            "http" | "https" => Ok(Arc::new(HttpResource::new(self.client.clone(), url.clone()))),
            scheme => Err(ResourceFactoryError::SchemeNotSupported(scheme.to_string())),
        }
    }
}
