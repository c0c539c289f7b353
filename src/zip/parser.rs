//! Reads the directory records of a ZIP archive through [`ReadAt`].
//!
//! An archive is walked backwards. The end of central directory record sits
//! in the last bytes, optionally followed by a comment, and points at the
//! central directory. ZIP64 archives add a locator and a second record just
//! before it. Both lookups stay within the last [`TAIL_CACHE_LENGTH`] bytes,
//! so a tail-cached remote resource answers them without a request.
//!
//! Local headers are only read when an entry is opened.

use byteorder::{ByteOrder, LittleEndian};
use std::sync::Arc;

use crate::io::ReadAt;

use super::ZipError;
use super::structures::*;

/// Longest archive comment the 16-bit length field can express.
const MAX_COMMENT_LENGTH: u64 = u16::MAX as u64;

/// Header ID of the ZIP64 extended information extra field.
const ZIP64_EXTRA_FIELD_ID: u16 = 0x0001;

/// Value of a 32-bit header field whose real value lives in the ZIP64 extra field.
const SATURATED_U32: u64 = 0xFFFF_FFFF;

pub struct ZipParser<R: ReadAt + ?Sized> {
    reader: Arc<R>,
}

impl<R: ReadAt + ?Sized> ZipParser<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self { reader }
    }

    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }

    async fn read_vec(&self, offset: u64, length: usize) -> Result<Vec<u8>, ZipError> {
        let mut buf = vec![0u8; length];
        self.reader.read_exact_at(offset, &mut buf).await?;
        Ok(buf)
    }

    /// The end of central directory record and its offset.
    ///
    /// Fails with [`ZipError::NotAZip`] when no record ends the data, either
    /// directly or through a comment of matching length.
    pub async fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64), ZipError> {
        let size = self.reader.size().await?;
        let record_size = EndOfCentralDirectory::SIZE as u64;

        // Most archives carry no comment
        if let Some(offset) = size.checked_sub(record_size) {
            let record = self.read_vec(offset, EndOfCentralDirectory::SIZE).await?;
            if record.starts_with(EndOfCentralDirectory::SIGNATURE) && record[20..22] == [0, 0] {
                return Ok((EndOfCentralDirectory::from_bytes(&record)?, offset));
            }
        }

        let window_start = size.saturating_sub(MAX_COMMENT_LENGTH + record_size);
        let window = self.read_vec(window_start, (size - window_start) as usize).await?;

        let candidates = window.len().saturating_sub(EndOfCentralDirectory::SIZE);
        let found = (0..candidates).rev().find(|&start| {
            window[start..].starts_with(EndOfCentralDirectory::SIGNATURE)
                && LittleEndian::read_u16(&window[start + 20..]) as usize
                    == window.len() - start - EndOfCentralDirectory::SIZE
        });

        match found {
            Some(start) => Ok((
                EndOfCentralDirectory::from_bytes(&window[start..])?,
                window_start + start as u64,
            )),
            None => Err(ZipError::NotAZip),
        }
    }

    /// The ZIP64 record announced by a locator right before the regular one.
    pub async fn read_zip64_eocd(&self, eocd_offset: u64) -> Result<Zip64EOCD, ZipError> {
        let locator_offset = eocd_offset
            .checked_sub(Zip64EOCDLocator::SIZE as u64)
            .ok_or(ZipError::Malformed("ZIP64 end of central directory locator"))?;
        let locator_bytes = self.read_vec(locator_offset, Zip64EOCDLocator::SIZE).await?;
        let locator = Zip64EOCDLocator::from_bytes(&locator_bytes)?;

        let record = self.read_vec(locator.eocd64_offset, Zip64EOCD::MIN_SIZE).await?;
        Zip64EOCD::from_bytes(&record)
    }

    /// Where the central directory lies, checked against the end record.
    pub async fn locate_central_directory(&self) -> Result<CentralDirectory, ZipError> {
        let (eocd, eocd_offset) = self.find_eocd().await?;

        let directory = if eocd.is_zip64() {
            let eocd64 = self.read_zip64_eocd(eocd_offset).await?;
            CentralDirectory {
                offset: eocd64.cd_offset,
                size: eocd64.cd_size,
                total_entries: eocd64.total_entries,
            }
        } else {
            CentralDirectory {
                offset: eocd.cd_offset.into(),
                size: eocd.cd_size.into(),
                total_entries: eocd.total_entries.into(),
            }
        };

        match directory.offset.checked_add(directory.size) {
            Some(end) if end <= eocd_offset => Ok(directory),
            _ => Err(ZipError::Malformed("central directory bounds")),
        }
    }

    /// Fetch the central directory at once and decode all of its records.
    pub async fn read_central_directory(
        &self,
        directory: &CentralDirectory,
    ) -> Result<Vec<ZipEntry>, ZipError> {
        let records = self.read_vec(directory.offset, directory.size as usize).await?;

        // A lying entry count cannot exceed what the directory size allows
        let capacity = directory
            .total_entries
            .min(directory.size / CDFH_MIN_SIZE as u64) as usize;
        let mut entries = Vec::with_capacity(capacity);

        let mut rest = records.as_slice();
        for _ in 0..directory.total_entries {
            let (entry, record_length) = parse_cdfh(rest)?;
            entries.push(entry);
            rest = &rest[record_length..];
        }

        Ok(entries)
    }

    /// Offset of the first data byte of `entry`.
    ///
    /// The local header repeats the name and carries its own extra field,
    /// whose length may differ from the central directory's.
    pub async fn data_offset(&self, entry: &ZipEntry) -> Result<u64, ZipError> {
        let header = self.read_vec(entry.lfh_offset, LFH_SIZE).await?;
        if !header.starts_with(LFH_SIGNATURE) {
            return Err(ZipError::Malformed("local file header"));
        }

        let name_length = LittleEndian::read_u16(&header[26..]) as u64;
        let extra_length = LittleEndian::read_u16(&header[28..]) as u64;
        Ok(entry.lfh_offset + LFH_SIZE as u64 + name_length + extra_length)
    }
}

/// Decode the central directory record at the start of `data`.
///
/// Returns the entry and the length of the whole record.
fn parse_cdfh(data: &[u8]) -> Result<(ZipEntry, usize), ZipError> {
    const MALFORMED: ZipError = ZipError::Malformed("central directory file header");

    if data.len() < CDFH_MIN_SIZE || !data.starts_with(CDFH_SIGNATURE) {
        return Err(MALFORMED);
    }

    let flags = LittleEndian::read_u16(&data[8..]);
    let compression_method = LittleEndian::read_u16(&data[10..]);
    let crc32 = LittleEndian::read_u32(&data[16..]);
    let mut compressed_size = LittleEndian::read_u32(&data[20..]) as u64;
    let mut uncompressed_size = LittleEndian::read_u32(&data[24..]) as u64;
    let name_length = LittleEndian::read_u16(&data[28..]) as usize;
    let extra_length = LittleEndian::read_u16(&data[30..]) as usize;
    let comment_length = LittleEndian::read_u16(&data[32..]) as usize;
    let mut lfh_offset = LittleEndian::read_u32(&data[42..]) as u64;

    let extra_start = CDFH_MIN_SIZE + name_length;
    let record_length = extra_start + extra_length + comment_length;
    if data.len() < record_length {
        return Err(MALFORMED);
    }

    // Non-UTF-8 names are kept, lossily
    let path = String::from_utf8_lossy(&data[CDFH_MIN_SIZE..extra_start]).into_owned();

    let mut extra = &data[extra_start..extra_start + extra_length];
    while extra.len() >= 4 {
        let header_id = LittleEndian::read_u16(extra);
        let field_length = (LittleEndian::read_u16(&extra[2..]) as usize).min(extra.len() - 4);
        let mut field = &extra[4..4 + field_length];

        if header_id == ZIP64_EXTRA_FIELD_ID {
            // Only saturated header values appear, in this order
            for value in [&mut uncompressed_size, &mut compressed_size, &mut lfh_offset] {
                if *value == SATURATED_U32 && field.len() >= 8 {
                    *value = LittleEndian::read_u64(field);
                    field = &field[8..];
                }
            }
        }
        extra = &extra[4 + field_length..];
    }

    let entry_type = if path.ends_with('/') || path.ends_with('\\') {
        EntryType::Directory
    } else {
        EntryType::File
    };

    let entry = ZipEntry {
        path,
        entry_type,
        compression_method: CompressionMethod::from(compression_method),
        compressed_size,
        uncompressed_size,
        crc32,
        lfh_offset,
        flags,
    };
    Ok((entry, record_length))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{BufferResource, ResourceReader};
    use crate::testing::{ZipFixture, fixture_entries};

    fn parser(data: Vec<u8>) -> ZipParser<ResourceReader> {
        ZipParser::new(Arc::new(ResourceReader::new(Arc::new(BufferResource::new(data)))))
    }

    #[tokio::test]
    async fn test_read_central_directory() {
        let parser = parser(fixture_entries());
        let directory = parser.locate_central_directory().await.unwrap();
        assert_eq!(3, directory.total_entries);

        let entries = parser.read_central_directory(&directory).await.unwrap();
        let summary: Vec<(&str, EntryType, u64)> = entries
            .iter()
            .map(|e| (e.path.as_str(), e.entry_type, e.uncompressed_size))
            .collect();
        assert_eq!(
            vec![
                ("a.txt", EntryType::File, 10),
                ("b/", EntryType::Directory, 0),
                ("b/c.txt", EntryType::File, 20),
            ],
            summary
        );
        assert!(!entries[0].is_compressed());
        assert!(entries[2].is_compressed());
    }

    #[tokio::test]
    async fn test_find_eocd_behind_a_comment() {
        let data = ZipFixture::new()
            .stored("a.txt", b"0123456789")
            .comment("a comment that pushes the EOCD away from the end")
            .build();
        let parser = parser(data);
        let (eocd, _) = parser.find_eocd().await.unwrap();
        assert_eq!(1, eocd.total_entries);
        assert!(eocd.comment_len > 0);
    }

    #[tokio::test]
    async fn test_not_a_zip() {
        for data in [Vec::new(), b"PK".to_vec(), vec![b'x'; 100_000]] {
            let result = parser(data).find_eocd().await;
            assert!(matches!(result, Err(ZipError::NotAZip)));
        }
    }

    #[tokio::test]
    async fn test_data_offset_points_after_the_local_header() {
        let data = fixture_entries();
        let parser = parser(data.clone());
        let directory = parser.locate_central_directory().await.unwrap();
        let entries = parser.read_central_directory(&directory).await.unwrap();

        let offset = parser.data_offset(&entries[0]).await.unwrap() as usize;
        assert_eq!(b"0123456789", &data[offset..offset + 10]);
    }
}
