mod buffered;
mod http;
mod local;
mod memory;

pub use buffered::BufferedReader;
pub use http::{HeadInfo, HttpRangeReader};
pub use local::LocalFileReader;
pub use memory::{FixedMemory, MemoryProbe, SystemMemory};

use std::ops::Range;

use crate::error::{ReadError, ReadResult};
use async_trait::async_trait;

/// Buffer size used when reading local files.
pub const LOCAL_BUFFER_SIZE: usize = 16_384;

/// Buffer size used when reading remote resources.
pub const REMOTE_BUFFER_SIZE: usize = 6_000_000;

/// Trait for random access reading from a data source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer.
    ///
    /// Returns the number of bytes read, `0` once `offset` is past the end.
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> ReadResult<usize>;

    /// Get the total size of the data source
    async fn size(&self) -> ReadResult<u64>;

    /// Fill `buf` entirely, failing if the source ends first.
    async fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> ReadResult<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_at(offset + filled as u64, &mut buf[filled..]).await?;
            if n == 0 {
                return Err(ReadError::decoding(format!(
                    "unexpected end of data at offset {}",
                    offset + filled as u64
                )));
            }
            filled += n;
        }
        Ok(())
    }
}

/// Clamp an optional range to `[0, size)`; `None` means the whole source.
pub(crate) fn clamp_range(range: Option<Range<u64>>, size: u64) -> Range<u64> {
    match range {
        Some(range) => {
            let end = range.end.min(size);
            range.start.min(end)..end
        }
        None => 0..size,
    }
}

/// Read `range` from `reader` in chunks of `chunk_size`, handing each chunk to `consume`.
pub(crate) async fn stream_range<R: ReadAt + ?Sized>(
    reader: &R,
    range: Option<Range<u64>>,
    chunk_size: usize,
    consume: &mut (dyn FnMut(&[u8]) + Send),
) -> ReadResult<()> {
    let range = clamp_range(range, reader.size().await?);
    let mut buf = vec![0u8; chunk_size.min((range.end - range.start) as usize)];
    let mut offset = range.start;

    while offset < range.end {
        let len = ((range.end - offset) as usize).min(buf.len());
        let n = reader.read_at(offset, &mut buf[..len]).await?;
        if n == 0 {
            return Err(ReadError::decoding(format!(
                "unexpected end of data at offset {offset}"
            )));
        }
        consume(&buf[..n]);
        offset += n as u64;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::clamp_range;

    #[test]
    fn test_clamp_range() {
        assert_eq!(0..10, clamp_range(None, 10));
        assert_eq!(2..5, clamp_range(Some(2..5), 10));
        assert_eq!(8..10, clamp_range(Some(8..50), 10));
        assert_eq!(10..10, clamp_range(Some(20..30), 10));
        assert_eq!(5..5, clamp_range(Some(7..5), 10));
    }
}
