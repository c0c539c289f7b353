use super::ReadAt;
use crate::error::ReadResult;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Local file reader with random access support
pub struct LocalFileReader {
    path: PathBuf,
    #[cfg(unix)]
    file: std::fs::File,
    #[cfg(not(unix))]
    file: std::sync::Mutex<std::fs::File>,
    size: u64,
}

impl LocalFileReader {
    pub fn open(path: &Path) -> ReadResult<Self> {
        let file = std::fs::File::open(path)?;
        let size = file.metadata()?.len();
        tracing::trace!(path = %path.display(), size, "opened local file");

        Ok(Self {
            path: path.to_path_buf(),
            #[cfg(unix)]
            file,
            #[cfg(not(unix))]
            file: std::sync::Mutex::new(file),
            size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ReadAt for LocalFileReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> ReadResult<usize> {
        if offset >= self.size || buf.is_empty() {
            return Ok(0);
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            Ok(self.file.read_at(buf, offset)?)
        }

        #[cfg(not(unix))]
        {
            use std::io::{Read, Seek, SeekFrom};
            // No positional reads here: seek and read under the lock
            let mut file = self
                .file
                .lock()
                .map_err(|_| std::io::Error::other("poisoned file handle"))?;
            file.seek(SeekFrom::Start(offset))?;
            Ok(file.read(buf)?)
        }
    }

    async fn size(&self) -> ReadResult<u64> {
        Ok(self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_read_at_offsets() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();

        let reader = LocalFileReader::open(file.path()).unwrap();
        assert_eq!(10, reader.size().await.unwrap());

        let mut buf = [0u8; 4];
        reader.read_exact_at(3, &mut buf).await.unwrap();
        assert_eq!(b"3456", &buf);

        assert_eq!(0, reader.read_at(10, &mut buf).await.unwrap());
        assert!(reader.read_exact_at(8, &mut buf).await.is_err());
    }

    #[test]
    fn test_open_missing_file_is_access_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = LocalFileReader::open(&dir.path().join("missing.zip"));
        assert!(matches!(result, Err(crate::error::ReadError::Access(_))));
    }
}
