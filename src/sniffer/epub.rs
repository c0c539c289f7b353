use async_trait::async_trait;

use crate::container::Container;
use crate::error::ReadResult;
use crate::format::{Format, FormatHints, FormatSpecification, MediaType};

use super::FormatSniffer;

/// EPUB publications: ZIP archives declaring `application/epub+zip`.
pub struct EpubSniffer;

#[async_trait]
impl FormatSniffer for EpubSniffer {
    fn sniff_hints(&self, hints: &FormatHints) -> Option<Format> {
        (hints.has_file_extension(&["epub"]) || hints.has_media_type(&[MediaType::EPUB]))
            .then(Format::epub)
    }

    async fn sniff_container(
        &self,
        container: &dyn Container,
        refining: &Format,
    ) -> ReadResult<Option<Format>> {
        if !refining.conforms_to(&FormatSpecification::ZIP)
            || refining.conforms_to(&FormatSpecification::EPUB)
        {
            return Ok(None);
        }

        if let Some(mimetype) = container.get_path("mimetype") {
            let content = mimetype.read(None).await?;
            if String::from_utf8_lossy(&content).trim() == MediaType::EPUB {
                return Ok(Some(Format::epub()));
            }
        }

        // Some packagers forget the mimetype entry
        let has_container_xml = container.get_path("META-INF/container.xml").is_some();
        Ok(has_container_xml.then(Format::epub))
    }
}
