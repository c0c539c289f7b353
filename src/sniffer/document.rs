use async_trait::async_trait;
use serde_json::Value;

use crate::error::ReadResult;
use crate::format::{Format, FormatHints, FormatSpecification, MediaType};

use super::{FormatSniffer, FormatSnifferBlob, XmlRoot};

const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";
const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";

/// PDF documents, recognized by their `%PDF-` header.
pub struct PdfSniffer;

#[async_trait]
impl FormatSniffer for PdfSniffer {
    fn sniff_hints(&self, hints: &FormatHints) -> Option<Format> {
        (hints.has_file_extension(&["pdf"]) || hints.has_media_type(&[MediaType::PDF]))
            .then(Format::pdf)
    }

    async fn sniff_blob(
        &self,
        blob: &FormatSnifferBlob,
        refining: &Format,
    ) -> ReadResult<Option<Format>> {
        if refining.conforms_to(&FormatSpecification::PDF) {
            return Ok(None);
        }
        Ok(blob.prefix().await?.starts_with(b"%PDF-").then(Format::pdf))
    }
}

/// HTML, XHTML, OPDS 1 feeds and other XML documents.
pub struct MarkupSniffer;

impl MarkupSniffer {
    fn html() -> Format {
        Format::new([FormatSpecification::HTML], MediaType::HTML, "html")
    }

    fn xhtml() -> Format {
        Format::new(
            [FormatSpecification::HTML, FormatSpecification::XML],
            MediaType::XHTML,
            "xhtml",
        )
    }

    fn xml() -> Format {
        Format::new([FormatSpecification::XML], MediaType::XML, "xml")
    }

    fn opds1() -> Format {
        Format::new(
            [FormatSpecification::XML, FormatSpecification::OPDS1],
            MediaType::OPDS1,
            "xml",
        )
    }

    fn from_root(root: &XmlRoot) -> Format {
        let namespace = root.namespace.as_deref();
        match root.local_name.as_str() {
            "html" if namespace == Some(XHTML_NAMESPACE) => Self::xhtml(),
            "html" => Self::html(),
            "feed" | "entry" if namespace == Some(ATOM_NAMESPACE) => Self::opds1(),
            _ => Self::xml(),
        }
    }
}

#[async_trait]
impl FormatSniffer for MarkupSniffer {
    fn sniff_hints(&self, hints: &FormatHints) -> Option<Format> {
        if hints.has_file_extension(&["xhtml", "xht"]) || hints.has_media_type(&[MediaType::XHTML])
        {
            Some(Self::xhtml())
        } else if hints.has_file_extension(&["html", "htm"])
            || hints.has_media_type(&[MediaType::HTML])
        {
            Some(Self::html())
        } else if hints.has_file_extension(&["opds"]) || hints.has_media_type(&[MediaType::OPDS1]) {
            Some(Self::opds1())
        } else if hints.has_file_extension(&["xml"])
            || hints.has_media_type(&[MediaType::XML, "text/xml"])
        {
            Some(Self::xml())
        } else {
            None
        }
    }

    async fn sniff_blob(
        &self,
        blob: &FormatSnifferBlob,
        refining: &Format,
    ) -> ReadResult<Option<Format>> {
        if blob.first_significant_byte().await? != Some(b'<') {
            return Ok(None);
        }

        // HTML5 is rarely well-formed: trust the doctype over whatever root came out
        let is_html5 = starts_with_html_doctype(blob.prefix().await?);
        let candidate = match blob.xml_root().await? {
            Some(root) if root.local_name == "html" => Self::from_root(root),
            _ if is_html5 => Self::html(),
            Some(root) => Self::from_root(root),
            None => return Ok(None),
        };
        Ok(candidate.refines(refining).then_some(candidate))
    }
}

fn starts_with_html_doctype(prefix: &[u8]) -> bool {
    let prefix = prefix.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(prefix);
    let start = prefix
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(prefix.len());
    let doctype = b"<!doctype html";
    prefix[start..]
        .get(..doctype.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(doctype))
}

/// JSON documents, and LCP licenses among them.
pub struct JsonSniffer;

impl JsonSniffer {
    fn json() -> Format {
        Format::new([FormatSpecification::JSON], MediaType::JSON, "json")
    }

    fn lcp_license() -> Format {
        Format::new(
            [FormatSpecification::JSON, FormatSpecification::LCP_LICENSE],
            MediaType::LCP_LICENSE,
            "lcpl",
        )
    }
}

#[async_trait]
impl FormatSniffer for JsonSniffer {
    fn sniff_hints(&self, hints: &FormatHints) -> Option<Format> {
        if hints.has_file_extension(&["lcpl"]) || hints.has_media_type(&[MediaType::LCP_LICENSE]) {
            Some(Self::lcp_license())
        } else if hints.has_file_extension(&["json"]) || hints.has_media_type(&[MediaType::JSON]) {
            Some(Self::json())
        } else {
            None
        }
    }

    async fn sniff_blob(
        &self,
        blob: &FormatSnifferBlob,
        refining: &Format,
    ) -> ReadResult<Option<Format>> {
        if !matches!(blob.first_significant_byte().await?, Some(b'{' | b'[')) {
            return Ok(None);
        }
        let Some(value) = blob.json().await? else {
            return Ok(None);
        };

        let candidate = if is_lcp_license(value) {
            Self::lcp_license()
        } else {
            Self::json()
        };
        Ok(candidate.refines(refining).then_some(candidate))
    }
}

fn is_lcp_license(value: &Value) -> bool {
    let links_to_publication = value["links"].as_array().is_some_and(|links| {
        links
            .iter()
            .any(|link| link["rel"].as_str() == Some("publication"))
    });
    value.get("encryption").is_some_and(Value::is_object) && links_to_publication
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::BufferResource;
    use std::sync::Arc;

    async fn sniff(sniffer: &dyn FormatSniffer, content: &[u8]) -> Option<Format> {
        let blob = FormatSnifferBlob::new(Arc::new(BufferResource::new(content)));
        sniffer.sniff_blob(&blob, &Format::unknown()).await.unwrap()
    }

    #[tokio::test]
    async fn test_pdf_magic() {
        assert_eq!(Some(Format::pdf()), sniff(&PdfSniffer, b"%PDF-1.7\n%\xE2\xE3").await);
        assert_eq!(None, sniff(&PdfSniffer, b"PK\x03\x04").await);
    }

    #[tokio::test]
    async fn test_markup_roots() {
        #[rustfmt::skip]
        let expected = [
            (Some(MarkupSniffer::html()), &b"<!DOCTYPE html>\n<html><body><br></body></html>"[..]),
            (Some(MarkupSniffer::html()), &b"<!doctype html><meta charset=utf-8><p>unclosed"[..]),
            (Some(MarkupSniffer::xhtml()), &br#"<?xml version="1.0"?><html xmlns="http://www.w3.org/1999/xhtml"/>"#[..]),
            (Some(MarkupSniffer::opds1()), &br#"<feed xmlns="http://www.w3.org/2005/Atom"></feed>"#[..]),
            (Some(MarkupSniffer::xml()), &b"<package version=\"3.0\"/>"[..]),
            (None, &b"{\"json\": true}"[..]),
            (None, &b"< not markup"[..]),
        ];

        for (expected, content) in expected {
            assert_eq!(
                expected,
                sniff(&MarkupSniffer, content).await,
                "{}",
                String::from_utf8_lossy(content)
            );
        }
    }

    #[tokio::test]
    async fn test_markup_does_not_repeat_itself() {
        let blob = FormatSnifferBlob::new(Arc::new(BufferResource::new(*b"<root/>")));
        let format = MarkupSniffer.sniff_blob(&blob, &MarkupSniffer::xml()).await.unwrap();
        assert_eq!(None, format);
    }

    #[tokio::test]
    async fn test_json_and_lcp_license() {
        assert_eq!(Some(JsonSniffer::json()), sniff(&JsonSniffer, b" [1, 2, 3]").await);

        let license = br#"{
            "id": "ef15e740",
            "encryption": {"profile": "http://readium.org/lcp/basic-profile"},
            "links": [{"rel": "publication", "href": "https://example.com/book.epub"}]
        }"#;
        assert_eq!(Some(JsonSniffer::lcp_license()), sniff(&JsonSniffer, license).await);
        assert_eq!(None, sniff(&JsonSniffer, b"{ truncated").await);
    }

    #[test]
    fn test_hints() {
        let extension = FormatHints::with_file_extension;
        assert_eq!(Some(MarkupSniffer::html()), MarkupSniffer.sniff_hints(&extension("HTM")));
        assert_eq!(Some(JsonSniffer::lcp_license()), JsonSniffer.sniff_hints(&extension("lcpl")));
        assert_eq!(None, PdfSniffer.sniff_hints(&extension("epub")));

        let xml = FormatHints::with_media_type("text/xml; charset=utf-8");
        assert_eq!(Some(MarkupSniffer::xml()), MarkupSniffer.sniff_hints(&xml));
    }
}
