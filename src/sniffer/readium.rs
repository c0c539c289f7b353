use async_trait::async_trait;
use serde_json::Value;

use crate::container::Container;
use crate::error::ReadResult;
use crate::format::{FileExtension, Format, FormatHints, FormatSpecification, MediaType};

use super::informal::AUDIO_EXTENSIONS;
use super::{FormatSniffer, FormatSnifferBlob};

const AUDIOBOOK_PROFILE: &str = "https://readium.org/webpub-manifest/profiles/audiobook";

/// Readium Web Publication manifests and the packages (RPF) holding them.
pub struct ReadiumWebPubSniffer;

impl ReadiumWebPubSniffer {
    fn manifest(audiobook: bool) -> Format {
        if audiobook {
            Format::new(
                [
                    FormatSpecification::JSON,
                    FormatSpecification::RWPM,
                    FormatSpecification::AUDIOBOOK,
                ],
                MediaType::READIUM_AUDIOBOOK_MANIFEST,
                "json",
            )
        } else {
            Format::new(
                [FormatSpecification::JSON, FormatSpecification::RWPM],
                MediaType::READIUM_WEBPUB_MANIFEST,
                "json",
            )
        }
    }

    fn package(audiobook: bool) -> Format {
        if audiobook {
            Format::new(
                [
                    FormatSpecification::ZIP,
                    FormatSpecification::RPF,
                    FormatSpecification::AUDIOBOOK,
                ],
                MediaType::READIUM_AUDIOBOOK,
                "audiobook",
            )
        } else {
            Format::new(
                [FormatSpecification::ZIP, FormatSpecification::RPF],
                MediaType::READIUM_WEBPUB,
                "webpub",
            )
        }
    }

    fn lcp_audiobook() -> Format {
        Format::new(
            [
                FormatSpecification::ZIP,
                FormatSpecification::RPF,
                FormatSpecification::AUDIOBOOK,
                FormatSpecification::LCP,
            ],
            MediaType::LCP_PROTECTED_AUDIOBOOK,
            "lcpa",
        )
    }

    fn lcp_pdf() -> Format {
        Format::new(
            [
                FormatSpecification::ZIP,
                FormatSpecification::RPF,
                FormatSpecification::PDF,
                FormatSpecification::LCP,
            ],
            MediaType::LCP_PROTECTED_PDF,
            "lcpdf",
        )
    }
}

#[async_trait]
impl FormatSniffer for ReadiumWebPubSniffer {
    fn sniff_hints(&self, hints: &FormatHints) -> Option<Format> {
        if hints.has_file_extension(&["audiobook"])
            || hints.has_media_type(&[MediaType::READIUM_AUDIOBOOK])
        {
            Some(Self::package(true))
        } else if hints.has_media_type(&[MediaType::READIUM_AUDIOBOOK_MANIFEST]) {
            Some(Self::manifest(true))
        } else if hints.has_file_extension(&["webpub"])
            || hints.has_media_type(&[MediaType::READIUM_WEBPUB])
        {
            Some(Self::package(false))
        } else if hints.has_media_type(&[MediaType::READIUM_WEBPUB_MANIFEST]) {
            Some(Self::manifest(false))
        } else if hints.has_file_extension(&["lcpa"])
            || hints.has_media_type(&[MediaType::LCP_PROTECTED_AUDIOBOOK])
        {
            Some(Self::lcp_audiobook())
        } else if hints.has_file_extension(&["lcpdf"])
            || hints.has_media_type(&[MediaType::LCP_PROTECTED_PDF])
        {
            Some(Self::lcp_pdf())
        } else {
            None
        }
    }

    async fn sniff_blob(
        &self,
        blob: &FormatSnifferBlob,
        refining: &Format,
    ) -> ReadResult<Option<Format>> {
        if refining.conforms_to(&FormatSpecification::RWPM)
            || blob.first_significant_byte().await? != Some(b'{')
        {
            return Ok(None);
        }

        let Some(manifest) = blob.json().await? else {
            return Ok(None);
        };
        Ok(is_manifest(manifest).then(|| Self::manifest(is_audiobook(manifest))))
    }

    async fn sniff_container(
        &self,
        container: &dyn Container,
        refining: &Format,
    ) -> ReadResult<Option<Format>> {
        if !refining.conforms_to(&FormatSpecification::ZIP)
            || refining.conforms_to(&FormatSpecification::RPF)
        {
            return Ok(None);
        }
        let Some(resource) = container.get_path("manifest.json") else {
            return Ok(None);
        };

        let content = resource.read(None).await?;
        let manifest: Option<Value> = serde_json::from_slice(&content).ok();
        let audiobook = manifest.as_ref().is_some_and(is_audiobook);

        if container.get_path("license.lcpl").is_some() {
            let protected = if audiobook {
                Self::lcp_audiobook()
            } else if manifest.as_ref().is_some_and(is_pdf_package) {
                Self::lcp_pdf()
            } else {
                Self::package(false).adding(FormatSpecification::LCP)
            };
            return Ok(Some(protected));
        }

        Ok(Some(Self::package(audiobook)))
    }
}

fn is_manifest(value: &Value) -> bool {
    value.get("metadata").is_some_and(Value::is_object)
        && (value.get("readingOrder").is_some_and(Value::is_array)
            || value.get("links").is_some_and(Value::is_array))
}

fn conforms_to(metadata: &Value, profile: &str) -> bool {
    match metadata.get("conformsTo") {
        Some(Value::String(value)) => value == profile,
        Some(Value::Array(values)) => values.iter().any(|value| value.as_str() == Some(profile)),
        _ => false,
    }
}

fn is_audiobook(manifest: &Value) -> bool {
    let metadata = &manifest["metadata"];
    let declared = metadata["@type"]
        .as_str()
        .is_some_and(|kind| kind.ends_with("schema.org/Audiobook"))
        || conforms_to(metadata, AUDIOBOOK_PROFILE);

    declared || reading_order_all(manifest, is_audio_link)
}

fn is_pdf_package(manifest: &Value) -> bool {
    reading_order_all(manifest, |link| {
        link_media_type(link).is_some_and(|media_type| media_type.matches_str(MediaType::PDF))
            || link_extension(link).is_some_and(|extension| extension.as_str() == "pdf")
    })
}

fn reading_order_all(manifest: &Value, predicate: impl Fn(&Value) -> bool) -> bool {
    manifest["readingOrder"]
        .as_array()
        .is_some_and(|links| !links.is_empty() && links.iter().all(predicate))
}

fn is_audio_link(link: &Value) -> bool {
    link_media_type(link).is_some_and(|media_type| media_type.is_audio())
        || link_extension(link)
            .is_some_and(|extension| AUDIO_EXTENSIONS.contains(&extension.as_str()))
}

fn link_media_type(link: &Value) -> Option<MediaType> {
    link["type"].as_str()?.parse().ok()
}

fn link_extension(link: &Value) -> Option<FileExtension> {
    let href = link["href"].as_str()?;
    let path = href.split(['?', '#']).next().unwrap_or(href);
    FileExtension::of_path(path)
}
