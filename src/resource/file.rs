use async_trait::async_trait;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;
use url::Url;

use super::{Consumer, Resource, ResourceProperties};
use crate::error::{ReadError, ReadResult};
use crate::io::{self, LOCAL_BUFFER_SIZE, LocalFileReader, ReadAt};

/// A file on the local filesystem, opened on first access.
pub struct FileResource {
    url: Url,
    path: PathBuf,
    reader: OnceCell<LocalFileReader>,
}

impl FileResource {
    pub fn new(path: &Path) -> ReadResult<Self> {
        let path = std::path::absolute(path)?;
        let url = Url::from_file_path(&path).map_err(|_| {
            ReadError::Access(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("not an absolute path: {}", path.display()),
            ))
        })?;
        Ok(Self {
            url,
            path,
            reader: OnceCell::new(),
        })
    }

    /// Build from a `file://` URL; `None` when it has no path equivalent.
    pub fn from_url(url: &Url) -> Option<Self> {
        let path = url.to_file_path().ok()?;
        Some(Self {
            url: url.clone(),
            path,
            reader: OnceCell::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn reader(&self) -> ReadResult<&LocalFileReader> {
        self.reader
            .get_or_try_init(|| async { LocalFileReader::open(&self.path) })
            .await
    }
}

#[async_trait]
impl Resource for FileResource {
    fn source_url(&self) -> Option<&Url> {
        Some(&self.url)
    }

    async fn estimated_length(&self) -> ReadResult<Option<u64>> {
        Ok(Some(self.reader().await?.size().await?))
    }

    async fn properties(&self) -> ReadResult<ResourceProperties> {
        Ok(ResourceProperties {
            filename: self
                .path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            ..Default::default()
        })
    }

    async fn stream(&self, range: Option<Range<u64>>, consume: &mut Consumer<'_>) -> ReadResult<()> {
        io::stream_range(self.reader().await?, range, LOCAL_BUFFER_SIZE, consume).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_read_file_resource() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(b"hello, world").unwrap();

        let resource = FileResource::new(file.path()).unwrap();
        assert_eq!("file", resource.source_url().unwrap().scheme());
        assert_eq!(Some(12), resource.estimated_length().await.unwrap());
        assert_eq!(b"hello, world".to_vec(), resource.read(None).await.unwrap());
        assert_eq!(b"world".to_vec(), resource.read(Some(7..100)).await.unwrap());

        let properties = resource.properties().await.unwrap();
        assert!(properties.filename.unwrap().ends_with(".txt"));
    }

    #[tokio::test]
    async fn test_large_file_is_streamed_in_chunks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let data = vec![7u8; LOCAL_BUFFER_SIZE * 2 + 10];
        file.write_all(&data).unwrap();

        let resource = FileResource::new(file.path()).unwrap();
        let mut chunks = Vec::new();
        resource
            .stream(None, &mut |chunk: &[u8]| chunks.push(chunk.len()))
            .await
            .unwrap();
        assert_eq!(vec![LOCAL_BUFFER_SIZE, LOCAL_BUFFER_SIZE, 10], chunks);
    }

    #[tokio::test]
    async fn test_missing_file_fails_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let resource = FileResource::new(&dir.path().join("missing.epub")).unwrap();
        assert!(matches!(resource.read(None).await, Err(ReadError::Access(_))));
    }
}
