use flate2::{Crc, Decompress, FlushDecompress, Status};
use std::ops::Range;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::io::{ReadAt, clamp_range};
use crate::resource::Consumer;

use super::ZipError;
use super::parser::ZipParser;
use super::structures::{CentralDirectory, CompressionMethod, ZipEntry};

/// Size of the chunks read from the archive and handed to consumers.
const CHUNK_SIZE: usize = 32 * 1024;

/// Options applied when extracting entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZipReadOptions {
    /// Skip CRC-32 verification of fully read entries.
    pub skip_checksum: bool,
}

/// A ZIP archive whose central directory has been located.
///
/// Opening only reads the end of the archive. The entry list is read on the
/// first call to [`ZipArchive::entries`]. Extraction takes `&self` but is not
/// meant to run concurrently on one archive: callers sharing one should
/// serialize access.
pub struct ZipArchive<R: ReadAt + ?Sized> {
    parser: ZipParser<R>,
    directory: CentralDirectory,
    entries: OnceCell<Vec<ZipEntry>>,
}

impl<R: ReadAt + ?Sized> ZipArchive<R> {
    /// Locate the central directory of the archive served by `reader`.
    pub async fn open(reader: Arc<R>) -> Result<Self, ZipError> {
        let parser = ZipParser::new(reader);
        let directory = parser.locate_central_directory().await?;
        tracing::trace!(
            entries = directory.total_entries,
            offset = directory.offset,
            "located central directory"
        );

        Ok(Self {
            parser,
            directory,
            entries: OnceCell::new(),
        })
    }

    pub fn central_directory(&self) -> &CentralDirectory {
        &self.directory
    }

    /// All records of the central directory, in archive order.
    pub async fn entries(&self) -> Result<&[ZipEntry], ZipError> {
        let entries = self
            .entries
            .get_or_try_init(|| self.parser.read_central_directory(&self.directory))
            .await?;
        Ok(entries)
    }

    /// Find an entry by its path as stored in the archive.
    pub async fn entry(&self, path: &str) -> Result<Option<&ZipEntry>, ZipError> {
        Ok(self.entries().await?.iter().find(|entry| entry.path == path))
    }

    /// Stream the uncompressed bytes of `entry` in `range` (or all of them).
    ///
    /// The CRC-32 is only verified when the whole entry is read and
    /// `options.skip_checksum` is unset.
    pub async fn extract(
        &self,
        entry: &ZipEntry,
        range: Option<Range<u64>>,
        options: ZipReadOptions,
        consume: &mut Consumer<'_>,
    ) -> Result<(), ZipError> {
        if entry.is_encrypted() {
            return Err(ZipError::Encrypted(entry.path.clone()));
        }

        let verify = range.is_none() && !options.skip_checksum;
        let range = clamp_range(range, entry.uncompressed_size);
        if range.is_empty() && !verify {
            return Ok(());
        }

        let data_offset = self.parser.data_offset(entry).await?;
        let mut sink = RangeSink {
            range,
            position: 0,
            crc: verify.then(Crc::new),
            consume,
        };

        match entry.compression_method {
            CompressionMethod::Stored => self.extract_stored(entry, data_offset, &mut sink).await?,
            CompressionMethod::Deflate => self.extract_deflated(entry, data_offset, &mut sink).await?,
            CompressionMethod::Unknown(method) => {
                return Err(ZipError::UnsupportedCompression(method));
            }
        }

        if let Some(crc) = sink.crc {
            if sink.position != entry.uncompressed_size {
                return Err(ZipError::SizeMismatch {
                    path: entry.path.clone(),
                    expected: entry.uncompressed_size,
                    actual: sink.position,
                });
            }
            if crc.sum() != entry.crc32 {
                return Err(ZipError::ChecksumMismatch {
                    path: entry.path.clone(),
                    expected: entry.crc32,
                    actual: crc.sum(),
                });
            }
        }

        Ok(())
    }

    async fn extract_stored(
        &self,
        entry: &ZipEntry,
        data_offset: u64,
        sink: &mut RangeSink<'_, '_>,
    ) -> Result<(), ZipError> {
        // Without checksum, start directly at the range
        let start = if sink.crc.is_some() { 0 } else { sink.range.start };
        let end = if sink.crc.is_some() {
            entry.uncompressed_size
        } else {
            sink.range.end
        };
        sink.position = start;

        let reader = self.parser.reader();
        let mut buf = vec![0u8; CHUNK_SIZE.min((end - start) as usize)];
        let mut offset = start;
        while offset < end {
            let len = ((end - offset) as usize).min(buf.len());
            reader
                .read_exact_at(data_offset + offset, &mut buf[..len])
                .await?;
            sink.push(&buf[..len]);
            offset += len as u64;
        }

        Ok(())
    }

    async fn extract_deflated(
        &self,
        entry: &ZipEntry,
        data_offset: u64,
        sink: &mut RangeSink<'_, '_>,
    ) -> Result<(), ZipError> {
        let reader = self.parser.reader();
        let mut decompress = Decompress::new(false);
        let mut input = vec![0u8; CHUNK_SIZE];
        let mut output = vec![0u8; CHUNK_SIZE];
        let (mut input_start, mut input_end) = (0, 0);
        let mut read_offset = 0u64;

        loop {
            if input_start == input_end && read_offset < entry.compressed_size {
                let len = ((entry.compressed_size - read_offset) as usize).min(input.len());
                reader
                    .read_exact_at(data_offset + read_offset, &mut input[..len])
                    .await?;
                read_offset += len as u64;
                (input_start, input_end) = (0, len);
            }

            let flush = if read_offset == entry.compressed_size {
                FlushDecompress::Finish
            } else {
                FlushDecompress::None
            };
            let (total_in, total_out) = (decompress.total_in(), decompress.total_out());
            let status = decompress.decompress(&input[input_start..input_end], &mut output, flush)?;
            let consumed = (decompress.total_in() - total_in) as usize;
            let produced = (decompress.total_out() - total_out) as usize;
            input_start += consumed;

            sink.push(&output[..produced]);

            if status == Status::StreamEnd || sink.is_done() {
                return Ok(());
            }
            if consumed == 0 && produced == 0 && input_start == input_end
                && read_offset == entry.compressed_size
            {
                return Err(ZipError::Malformed("deflate stream: unexpected end"));
            }
        }
    }
}

/// Forwards the part of a byte stream falling into `range`, tracking the
/// CRC-32 of everything it sees.
struct RangeSink<'c, 'a> {
    range: Range<u64>,
    /// Offset in the uncompressed entry of the next byte pushed.
    position: u64,
    crc: Option<Crc>,
    consume: &'c mut Consumer<'a>,
}

impl RangeSink<'_, '_> {
    fn push(&mut self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }
        if let Some(crc) = self.crc.as_mut() {
            crc.update(chunk);
        }

        let chunk_start = self.position;
        let chunk_end = chunk_start + chunk.len() as u64;
        let start = self.range.start.max(chunk_start);
        let end = self.range.end.min(chunk_end);
        if start < end {
            (self.consume)(&chunk[(start - chunk_start) as usize..(end - chunk_start) as usize]);
        }
        self.position = chunk_end;
    }

    /// The range is delivered and no checksum needs the rest of the entry.
    fn is_done(&self) -> bool {
        self.crc.is_none() && self.position >= self.range.end
    }
}
