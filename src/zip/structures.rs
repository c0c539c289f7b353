//! Fixed-layout records of the ZIP format.

use byteorder::{ByteOrder, LittleEndian};

use super::ZipError;

/// Longest end of central directory record, comment included.
pub const EOCD_MAX_LENGTH: u64 = EndOfCentralDirectory::SIZE as u64 + u16::MAX as u64;

/// ZIP64 locator and record, stored right before the regular end record.
pub const ZIP64_EOCD_EXTRA_LENGTH: u64 = (Zip64EOCDLocator::SIZE + Zip64EOCD::MIN_SIZE) as u64;

/// How many trailing bytes of an archive are enough to locate its central
/// directory.
pub const TAIL_CACHE_LENGTH: u64 = EOCD_MAX_LENGTH + ZIP64_EOCD_EXTRA_LENGTH;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl From<u16> for CompressionMethod {
    fn from(value: u16) -> Self {
        match value {
            0 => Self::Stored,
            8 => Self::Deflate,
            other => Self::Unknown(other),
        }
    }
}

/// `data` starts with a record of `size` bytes introduced by `signature`.
fn check_record(
    data: &[u8],
    signature: &[u8],
    size: usize,
    name: &'static str,
) -> Result<(), ZipError> {
    if data.len() < size || !data.starts_with(signature) {
        return Err(ZipError::Malformed(name));
    }
    Ok(())
}

/// The record closing every archive. Its fields saturate when the archive
/// needs ZIP64.
#[derive(Debug, Clone)]
pub struct EndOfCentralDirectory {
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn from_bytes(data: &[u8]) -> Result<Self, ZipError> {
        check_record(data, Self::SIGNATURE, Self::SIZE, "end of central directory")?;
        Ok(Self {
            disk_entries: LittleEndian::read_u16(&data[8..]),
            total_entries: LittleEndian::read_u16(&data[10..]),
            cd_size: LittleEndian::read_u32(&data[12..]),
            cd_offset: LittleEndian::read_u32(&data[16..]),
            comment_len: LittleEndian::read_u16(&data[20..]),
        })
    }

    pub fn is_zip64(&self) -> bool {
        [self.disk_entries, self.total_entries].contains(&u16::MAX)
            || [self.cd_size, self.cd_offset].contains(&u32::MAX)
    }
}

#[derive(Debug, Clone)]
pub struct Zip64EOCDLocator {
    pub eocd64_offset: u64,
}

impl Zip64EOCDLocator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    pub fn from_bytes(data: &[u8]) -> Result<Self, ZipError> {
        check_record(
            data,
            Self::SIGNATURE,
            Self::SIZE,
            "ZIP64 end of central directory locator",
        )?;
        Ok(Self {
            eocd64_offset: LittleEndian::read_u64(&data[8..]),
        })
    }
}

/// Fixed part of the ZIP64 end record. The extensible data sector is ignored.
#[derive(Debug, Clone)]
pub struct Zip64EOCD {
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64EOCD {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const MIN_SIZE: usize = 56;

    pub fn from_bytes(data: &[u8]) -> Result<Self, ZipError> {
        check_record(
            data,
            Self::SIGNATURE,
            Self::MIN_SIZE,
            "ZIP64 end of central directory",
        )?;
        Ok(Self {
            total_entries: LittleEndian::read_u64(&data[32..]),
            cd_size: LittleEndian::read_u64(&data[40..]),
            cd_offset: LittleEndian::read_u64(&data[48..]),
        })
    }
}

/// Location of the central directory, from either EOCD flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CentralDirectory {
    pub offset: u64,
    pub size: u64,
    pub total_entries: u64,
}

/// Central directory record, before its variable-length name, extra
/// field and comment.
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

/// Local header, before its name and extra field.
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// General purpose flag: the entry is encrypted.
pub const FLAG_ENCRYPTED: u16 = 0x0001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    File,
    Directory,
}

/// One record of the central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipEntry {
    /// Path as stored in the archive, not normalized.
    pub path: String,
    pub entry_type: EntryType,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub lfh_offset: u64,
    pub flags: u16,
}

impl ZipEntry {
    pub fn is_directory(&self) -> bool {
        self.entry_type == EntryType::Directory
    }

    pub fn is_compressed(&self) -> bool {
        self.compression_method != CompressionMethod::Stored
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }
}
