//! Heuristics recognizing a [`Format`] from hints, bytes or archive layout.
//!
//! Each [`FormatSniffer`] implements whichever of the three capabilities it
//! needs. They answer `None` when they don't recognize something, and only
//! fail when the bytes cannot be read at all.

mod binary;
mod blob;
mod document;
mod epub;
mod informal;
mod readium;

pub use binary::{ArchiveSniffer, BitmapSniffer};
pub use blob::{CONTENT_CEILING, FormatSnifferBlob, PREFIX_LENGTH, XmlRoot};
pub use document::{JsonSniffer, MarkupSniffer, PdfSniffer};
pub use epub::EpubSniffer;
pub use informal::{InformalAudiobookSniffer, InformalComicSniffer};
pub use readium::ReadiumWebPubSniffer;

use async_trait::async_trait;

use crate::container::Container;
use crate::error::ReadResult;
use crate::format::{Format, FormatHints};

/// Recognizes formats. Every method defaults to "don't know".
#[async_trait]
pub trait FormatSniffer: Send + Sync {
    /// Guess from media types and extensions alone, without any I/O.
    fn sniff_hints(&self, _hints: &FormatHints) -> Option<Format> {
        None
    }

    /// Inspect the bytes of a single resource, knowing it is at least `refining`.
    async fn sniff_blob(
        &self,
        _blob: &FormatSnifferBlob,
        _refining: &Format,
    ) -> ReadResult<Option<Format>> {
        Ok(None)
    }

    /// Inspect the entries of an archive, knowing it is at least `refining`.
    async fn sniff_container(
        &self,
        _container: &dyn Container,
        _refining: &Format,
    ) -> ReadResult<Option<Format>> {
        Ok(None)
    }
}

/// Runs a list of sniffers in order.
///
/// The first sniffer returning a format wins, whatever the others would
/// have said. Order the list from the most to the least specific sniffer.
pub struct DefaultFormatSniffer {
    sniffers: Vec<Box<dyn FormatSniffer>>,
}

impl DefaultFormatSniffer {
    pub fn new(sniffers: Vec<Box<dyn FormatSniffer>>) -> Self {
        Self { sniffers }
    }
}

impl Default for DefaultFormatSniffer {
    fn default() -> Self {
        Self::new(vec![
            Box::new(EpubSniffer),
            Box::new(ReadiumWebPubSniffer),
            Box::new(InformalAudiobookSniffer),
            Box::new(InformalComicSniffer),
            Box::new(PdfSniffer),
            Box::new(MarkupSniffer),
            Box::new(JsonSniffer),
            Box::new(BitmapSniffer),
            Box::new(ArchiveSniffer),
        ])
    }
}

#[async_trait]
impl FormatSniffer for DefaultFormatSniffer {
    fn sniff_hints(&self, hints: &FormatHints) -> Option<Format> {
        self.sniffers
            .iter()
            .find_map(|sniffer| sniffer.sniff_hints(hints))
    }

    async fn sniff_blob(
        &self,
        blob: &FormatSnifferBlob,
        refining: &Format,
    ) -> ReadResult<Option<Format>> {
        for sniffer in &self.sniffers {
            if let Some(format) = sniffer.sniff_blob(blob, refining).await? {
                return Ok(Some(format));
            }
        }
        Ok(None)
    }

    async fn sniff_container(
        &self,
        container: &dyn Container,
        refining: &Format,
    ) -> ReadResult<Option<Format>> {
        for sniffer in &self.sniffers {
            if let Some(format) = sniffer.sniff_container(container, refining).await? {
                return Ok(Some(format));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{FormatSpecification, MediaType};
    use crate::resource::BufferResource;
    use std::sync::Arc;

    struct Fixed(Format);

    #[async_trait]
    impl FormatSniffer for Fixed {
        fn sniff_hints(&self, _hints: &FormatHints) -> Option<Format> {
            Some(self.0.clone())
        }

        async fn sniff_blob(
            &self,
            _blob: &FormatSnifferBlob,
            _refining: &Format,
        ) -> ReadResult<Option<Format>> {
            Ok(Some(self.0.clone()))
        }
    }

    /// Implements nothing.
    struct Silent;

    impl FormatSniffer for Silent {}

    #[tokio::test]
    async fn test_first_configured_sniffer_wins() {
        let rar = Format::new([FormatSpecification::RAR], MediaType::RAR, "rar");
        let sniffer = DefaultFormatSniffer::new(vec![
            Box::new(Silent),
            Box::new(Fixed(Format::zip())),
            Box::new(Fixed(rar)),
        ]);

        assert_eq!(Some(Format::zip()), sniffer.sniff_hints(&FormatHints::new()));
        let blob = FormatSnifferBlob::new(Arc::new(BufferResource::new(*b"data")));
        assert_eq!(
            Some(Format::zip()),
            sniffer.sniff_blob(&blob, &Format::unknown()).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_empty_chain_knows_nothing() {
        let sniffer = DefaultFormatSniffer::new(vec![Box::new(Silent)]);
        assert_eq!(None, sniffer.sniff_hints(&FormatHints::with_file_extension("epub")));
        let blob = FormatSnifferBlob::new(Arc::new(BufferResource::new(*b"%PDF-1.7")));
        assert_eq!(None, sniffer.sniff_blob(&blob, &Format::unknown()).await.unwrap());
    }

    #[tokio::test]
    async fn test_default_hints() {
        let sniffer = DefaultFormatSniffer::default();
        #[rustfmt::skip]
        let expected = [
            (FormatHints::with_file_extension("epub"), Some(Format::epub())),
            (FormatHints::with_media_type("application/pdf"), Some(Format::pdf())),
            (FormatHints::with_file_extension("ZIP"), Some(Format::zip())),
            (FormatHints::with_file_extension("unknown"), None),
            (FormatHints::new(), None),
        ];

        for (hints, expected) in expected {
            assert_eq!(expected, sniffer.sniff_hints(&hints), "{hints:?}");
        }
    }
}
