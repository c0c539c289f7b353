use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::ReadAt;
use crate::error::ReadResult;

/// Read-ahead adapter keeping one window of `capacity` bytes.
///
/// Small reads falling inside the window are served from memory; any other
/// small read refills the window from its offset. Reads at least as large as
/// the window bypass it.
pub struct BufferedReader<R: ReadAt + ?Sized> {
    inner: Arc<R>,
    capacity: usize,
    window: Mutex<Window>,
}

#[derive(Default)]
struct Window {
    offset: u64,
    data: Vec<u8>,
}

impl Window {
    fn get(&self, offset: u64, len: usize) -> Option<&[u8]> {
        let start = offset.checked_sub(self.offset)? as usize;
        self.data.get(start..start.checked_add(len)?)
    }
}

impl<R: ReadAt + ?Sized> BufferedReader<R> {
    pub fn new(inner: Arc<R>, capacity: usize) -> Self {
        Self {
            inner,
            capacity: capacity.max(1),
            window: Mutex::new(Window::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[async_trait]
impl<R: ReadAt + ?Sized> ReadAt for BufferedReader<R> {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> ReadResult<usize> {
        if buf.len() >= self.capacity {
            return self.inner.read_at(offset, buf).await;
        }

        let mut window = self.window.lock().await;
        if let Some(data) = window.get(offset, buf.len()) {
            buf.copy_from_slice(data);
            return Ok(buf.len());
        }

        let size = self.inner.size().await?;
        if offset >= size {
            return Ok(0);
        }
        let len = (size - offset).min(self.capacity as u64) as usize;
        let mut data = vec![0u8; len];
        self.inner.read_exact_at(offset, &mut data).await?;
        *window = Window { offset, data };

        let n = buf.len().min(len);
        buf[..n].copy_from_slice(&window.data[..n]);
        Ok(n)
    }

    async fn size(&self) -> ReadResult<u64> {
        self.inner.size().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingReader {
        data: Vec<u8>,
        reads: AtomicUsize,
    }

    #[async_trait]
    impl ReadAt for CountingReader {
        async fn read_at(&self, offset: u64, buf: &mut [u8]) -> ReadResult<usize> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let start = (offset as usize).min(self.data.len());
            let n = buf.len().min(self.data.len() - start);
            buf[..n].copy_from_slice(&self.data[start..start + n]);
            Ok(n)
        }

        async fn size(&self) -> ReadResult<u64> {
            Ok(self.data.len() as u64)
        }
    }

    #[tokio::test]
    async fn test_small_reads_share_one_window() {
        let inner = Arc::new(CountingReader {
            data: (0..100u8).collect(),
            reads: AtomicUsize::new(0),
        });
        let reader = BufferedReader::new(inner.clone(), 32);

        let mut buf = [0u8; 4];
        reader.read_exact_at(10, &mut buf).await.unwrap();
        assert_eq!([10, 11, 12, 13], buf);
        reader.read_exact_at(30, &mut buf).await.unwrap();
        assert_eq!([30, 31, 32, 33], buf);
        assert_eq!(1, inner.reads.load(Ordering::SeqCst));

        // Outside the window [10, 42)
        reader.read_exact_at(40, &mut buf).await.unwrap();
        assert_eq!([40, 41, 42, 43], buf);
        assert_eq!(2, inner.reads.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_window_is_clamped_to_the_end() {
        let inner = Arc::new(CountingReader {
            data: (0..10u8).collect(),
            reads: AtomicUsize::new(0),
        });
        let reader = BufferedReader::new(inner, 64);

        let mut buf = [0u8; 8];
        assert_eq!(2, reader.read_at(8, &mut buf).await.unwrap());
        assert_eq!([8, 9], buf[..2]);
        assert_eq!(0, reader.read_at(10, &mut buf).await.unwrap());
    }

    #[tokio::test]
    async fn test_large_reads_bypass_the_window() {
        let inner = Arc::new(CountingReader {
            data: (0..100u8).collect(),
            reads: AtomicUsize::new(0),
        });
        let reader = BufferedReader::new(inner.clone(), 8);

        let mut buf = [0u8; 16];
        reader.read_exact_at(0, &mut buf).await.unwrap();
        reader.read_exact_at(0, &mut buf).await.unwrap();
        assert_eq!(2, inner.reads.load(Ordering::SeqCst));
    }
}
