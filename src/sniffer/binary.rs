use async_trait::async_trait;

use crate::error::ReadResult;
use crate::format::{Format, FormatHints, FormatSpecification, MediaType};

use super::{FormatSniffer, FormatSnifferBlob};

/// Raster images, recognized by extension, media type or magic number.
pub struct BitmapSniffer;

/// (extensions, media type, magic-number test) of each bitmap kind.
type BitmapKind = (&'static [&'static str], &'static str, fn(&[u8]) -> bool);

const BITMAPS: &[BitmapKind] = &[
    (&["png"], MediaType::PNG, |b| b.starts_with(b"\x89PNG\r\n\x1a\n")),
    (&["jpg", "jpeg", "jpe", "jfif"], MediaType::JPEG, |b| b.starts_with(b"\xFF\xD8\xFF")),
    (&["gif"], MediaType::GIF, |b| b.starts_with(b"GIF87a") || b.starts_with(b"GIF89a")),
    (&["webp"], MediaType::WEBP, |b| b.len() >= 12 && &b[..4] == b"RIFF" && &b[8..12] == b"WEBP"),
    (&["bmp", "dib"], MediaType::BMP, |b| b.starts_with(b"BM")),
    (&["tif", "tiff"], MediaType::TIFF, |b| b.starts_with(b"II*\0") || b.starts_with(b"MM\0*")),
];

impl BitmapSniffer {
    fn format(extensions: &[&str], media_type: &str) -> Format {
        let extension = extensions.first().copied().unwrap_or_default();
        Format::new([FormatSpecification::BITMAP], media_type, extension)
    }
}

#[async_trait]
impl FormatSniffer for BitmapSniffer {
    fn sniff_hints(&self, hints: &FormatHints) -> Option<Format> {
        BITMAPS
            .iter()
            .find(|(extensions, media_type, _)| {
                hints.has_file_extension(extensions) || hints.has_media_type(&[media_type])
            })
            .map(|(extensions, media_type, _)| Self::format(extensions, media_type))
    }

    async fn sniff_blob(
        &self,
        blob: &FormatSnifferBlob,
        refining: &Format,
    ) -> ReadResult<Option<Format>> {
        if refining.conforms_to(&FormatSpecification::BITMAP) {
            return Ok(None);
        }
        let prefix = blob.prefix().await?;
        Ok(BITMAPS
            .iter()
            .find(|(_, _, magic)| magic(prefix))
            .map(|(extensions, media_type, _)| Self::format(extensions, media_type)))
    }
}

/// ZIP and RAR archives, before anything is known of their content.
pub struct ArchiveSniffer;

impl ArchiveSniffer {
    fn rar() -> Format {
        Format::new([FormatSpecification::RAR], MediaType::RAR, "rar")
    }

    fn cbr() -> Format {
        Format::new(
            [FormatSpecification::RAR, FormatSpecification::INFORMAL_COMIC],
            MediaType::CBR,
            "cbr",
        )
    }
}

#[async_trait]
impl FormatSniffer for ArchiveSniffer {
    fn sniff_hints(&self, hints: &FormatHints) -> Option<Format> {
        if hints.has_file_extension(&["zip"]) || hints.has_media_type(&[MediaType::ZIP]) {
            Some(Format::zip())
        } else if hints.has_file_extension(&["cbr"]) || hints.has_media_type(&[MediaType::CBR]) {
            Some(Self::cbr())
        } else if hints.has_file_extension(&["rar"])
            || hints.has_media_type(&[MediaType::RAR, "application/x-rar-compressed"])
        {
            Some(Self::rar())
        } else {
            None
        }
    }

    async fn sniff_blob(
        &self,
        blob: &FormatSnifferBlob,
        refining: &Format,
    ) -> ReadResult<Option<Format>> {
        let prefix = blob.prefix().await?;
        let is_zip = prefix.starts_with(b"PK\x03\x04") || prefix.starts_with(b"PK\x05\x06");
        let is_rar = prefix.starts_with(b"Rar!\x1a\x07");

        if is_zip && !refining.conforms_to(&FormatSpecification::ZIP) {
            Ok(Some(Format::zip()))
        } else if is_rar && !refining.conforms_to(&FormatSpecification::RAR) {
            Ok(Some(Self::rar()))
        } else {
            Ok(None)
        }
    }
}
