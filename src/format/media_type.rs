use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A parsed media type such as `application/epub+zip` or `text/html; charset=utf-8`.
///
/// The type, subtype and parameter names are lower-cased on parse. Parameter
/// values keep their case, except `charset` which is normalized to upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediaType {
    maintype: String,
    subtype: String,
    params: Vec<(String, String)>,
}

/// Error returned when a string is not a `type/subtype` media type.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid media type `{0}`")]
pub struct InvalidMediaType(pub String);

impl MediaType {
    pub const ZIP: &'static str = "application/zip";
    pub const RAR: &'static str = "application/vnd.rar";
    pub const EPUB: &'static str = "application/epub+zip";
    pub const PDF: &'static str = "application/pdf";
    pub const HTML: &'static str = "text/html";
    pub const XHTML: &'static str = "application/xhtml+xml";
    pub const XML: &'static str = "application/xml";
    pub const JSON: &'static str = "application/json";
    pub const OPDS1: &'static str = "application/atom+xml;profile=opds-catalog";
    pub const READIUM_WEBPUB_MANIFEST: &'static str = "application/webpub+json";
    pub const READIUM_AUDIOBOOK_MANIFEST: &'static str = "application/audiobook+json";
    pub const READIUM_WEBPUB: &'static str = "application/webpub+zip";
    pub const READIUM_AUDIOBOOK: &'static str = "application/audiobook+zip";
    pub const LCP_PROTECTED_AUDIOBOOK: &'static str = "application/audiobook+lcp";
    pub const LCP_PROTECTED_PDF: &'static str = "application/pdf+lcp";
    pub const LCP_LICENSE: &'static str = "application/vnd.readium.lcp.license.v1.0+json";
    pub const CBZ: &'static str = "application/vnd.comicbook+zip";
    pub const CBR: &'static str = "application/vnd.comicbook-rar";
    pub const PNG: &'static str = "image/png";
    pub const JPEG: &'static str = "image/jpeg";
    pub const GIF: &'static str = "image/gif";
    pub const WEBP: &'static str = "image/webp";
    pub const BMP: &'static str = "image/bmp";
    pub const TIFF: &'static str = "image/tiff";
    pub const BINARY: &'static str = "application/octet-stream";

    /// Parses one of the constants above (or another literal known to be
    /// well-formed), degrading to `application/octet-stream` otherwise.
    pub(crate) fn known(value: &str) -> Self {
        value.parse().unwrap_or_else(|_| Self {
            maintype: "application".to_string(),
            subtype: "octet-stream".to_string(),
            params: Vec::new(),
        })
    }

    pub fn maintype(&self) -> &str {
        &self.maintype
    }

    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// The structured syntax suffix, e.g. `zip` for `application/epub+zip`.
    pub fn suffix(&self) -> Option<&str> {
        self.subtype.rsplit_once('+').map(|(_, suffix)| suffix)
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The media type without its parameters.
    pub fn essence(&self) -> String {
        format!("{}/{}", self.maintype, self.subtype)
    }

    /// Returns true when both media types share the same essence and every
    /// parameter of `other` is also present on `self`.
    ///
    /// Extra parameters on `self` (such as `charset`) are tolerated, which
    /// makes `text/html; charset=utf-8` match `text/html`.
    pub fn matches(&self, other: &MediaType) -> bool {
        self.maintype == other.maintype
            && self.subtype == other.subtype
            && other
                .params
                .iter()
                .all(|(key, value)| self.param(key) == Some(value.as_str()))
    }

    /// [`MediaType::matches`] against a string, `false` when it does not parse.
    pub fn matches_str(&self, other: &str) -> bool {
        other
            .parse::<MediaType>()
            .is_ok_and(|other| self.matches(&other))
    }

    pub fn is_zip(&self) -> bool {
        self.matches_str(Self::ZIP) || self.suffix() == Some("zip")
    }

    pub fn is_json(&self) -> bool {
        self.matches_str(Self::JSON) || self.suffix() == Some("json")
    }

    pub fn is_bitmap(&self) -> bool {
        self.maintype == "image"
            && matches!(
                self.subtype.as_str(),
                "png" | "jpeg" | "gif" | "webp" | "bmp" | "tiff" | "avif" | "jxl"
            )
    }

    pub fn is_audio(&self) -> bool {
        self.maintype == "audio"
    }
}

impl FromStr for MediaType {
    type Err = InvalidMediaType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidMediaType(value.to_string());
        let mut parts = value.split(';');
        let essence = parts.next().unwrap_or_default().trim();
        let (maintype, subtype) = essence.split_once('/').ok_or_else(invalid)?;
        let (maintype, subtype) = (maintype.trim(), subtype.trim());
        if maintype.is_empty() || subtype.is_empty() || subtype.contains('/') {
            return Err(invalid());
        }

        let mut params: Vec<(String, String)> = parts
            .filter_map(|param| param.split_once('='))
            .map(|(key, value)| {
                let key = key.trim().to_ascii_lowercase();
                let value = value.trim().trim_matches('"');
                let value = if key == "charset" {
                    value.to_ascii_uppercase()
                } else {
                    value.to_string()
                };
                (key, value)
            })
            .filter(|(key, _)| !key.is_empty())
            .collect();
        params.sort();

        Ok(Self {
            maintype: maintype.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            params,
        })
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.maintype, self.subtype)?;
        for (key, value) in &self.params {
            write!(f, ";{key}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MediaType;

    #[test]
    fn test_parse_normalizes_case_and_whitespace() {
        let media_type: MediaType = "  Application/EPUB+zip ".parse().unwrap();
        assert_eq!("application", media_type.maintype());
        assert_eq!("epub+zip", media_type.subtype());
        assert_eq!(Some("zip"), media_type.suffix());
        assert_eq!("application/epub+zip", media_type.to_string());
    }

    #[test]
    fn test_matches_tolerates_extra_params() {
        let html: MediaType = "text/html; charset=utf-8".parse().unwrap();
        assert!(html.matches_str("text/html"));
        assert!(html.matches_str("TEXT/HTML;charset=UTF-8"));
        assert!(!html.matches_str("text/html;charset=latin1"));

        let plain: MediaType = "text/html".parse().unwrap();
        assert!(!plain.matches(&html));
    }

    #[test]
    fn test_params_are_order_insensitive() {
        let a: MediaType = "example/test;param=XYZ;param2=ABC".parse().unwrap();
        let b: MediaType = "  example/TEST; PARAM2 = ABC;param = XYZ;;;   ".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_media_types() {
        for value in ["", "text", "/html", "text/", "a/b/c"] {
            assert!(value.parse::<MediaType>().is_err(), "{value}");
        }
    }

    #[test]
    fn test_zip_family() {
        assert!(MediaType::known(MediaType::ZIP).is_zip());
        assert!(MediaType::known(MediaType::EPUB).is_zip());
        assert!(!MediaType::known(MediaType::PDF).is_zip());
        assert!(MediaType::known(MediaType::LCP_LICENSE).is_json());
    }
}
