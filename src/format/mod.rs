//! Value types describing what an asset is, or what we suspect it might be.
//!
//! A [`Format`] carries a set of [`FormatSpecification`] tags. A ZIP-based
//! EPUB conforms to both [`FormatSpecification::ZIP`] and
//! [`FormatSpecification::EPUB`], which is what lets the retriever move from
//! "this is a ZIP" to "this is an EPUB" without losing information.

mod hints;
mod media_type;

pub use hints::FormatHints;
pub use media_type::{InvalidMediaType, MediaType};

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

/// An atomic conformance tag, such as `zip` or `epub`.
///
/// Sniffers outside this crate can declare their own tags with
/// [`FormatSpecification::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FormatSpecification(Cow<'static, str>);

impl FormatSpecification {
    pub const ZIP: Self = Self::from_static("zip");
    pub const RAR: Self = Self::from_static("rar");
    pub const EPUB: Self = Self::from_static("epub");
    pub const PDF: Self = Self::from_static("pdf");
    pub const HTML: Self = Self::from_static("html");
    pub const XML: Self = Self::from_static("xml");
    pub const JSON: Self = Self::from_static("json");
    pub const OPDS1: Self = Self::from_static("opds1");
    /// Readium Web Publication Manifest.
    pub const RWPM: Self = Self::from_static("rwpm");
    /// Readium package: a ZIP holding a `manifest.json`.
    pub const RPF: Self = Self::from_static("rpf");
    pub const AUDIOBOOK: Self = Self::from_static("audiobook");
    /// A ZIP of audio files without any manifest.
    pub const INFORMAL_AUDIOBOOK: Self = Self::from_static("informal-audiobook");
    /// A ZIP of bitmaps without any manifest (CBZ).
    pub const INFORMAL_COMIC: Self = Self::from_static("informal-comic");
    pub const BITMAP: Self = Self::from_static("bitmap");
    /// LCP-protected publication.
    pub const LCP: Self = Self::from_static("lcp");
    /// LCP license document.
    pub const LCP_LICENSE: Self = Self::from_static("lcpl");

    pub const fn from_static(tag: &'static str) -> Self {
        Self(Cow::Borrowed(tag))
    }

    pub fn new(tag: impl Into<String>) -> Self {
        Self(Cow::Owned(tag.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FormatSpecification {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A file extension, lower-cased and without its leading dot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileExtension(String);

impl FileExtension {
    pub fn new(extension: &str) -> Self {
        Self(extension.trim().trim_start_matches('.').to_ascii_lowercase())
    }

    /// Extension of the last path segment of `path`, if any.
    pub fn of_path(path: &str) -> Option<Self> {
        let name = path.rsplit(['/', '\\']).next()?;
        let (stem, extension) = name.rsplit_once('.')?;
        if stem.is_empty() || extension.is_empty() {
            return None;
        }
        Some(Self::new(extension))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for FileExtension {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A resolved content classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    pub specifications: BTreeSet<FormatSpecification>,
    pub media_type: MediaType,
    pub file_extension: FileExtension,
}

impl Format {
    pub fn new<S>(specifications: S, media_type: &str, file_extension: &str) -> Self
    where
        S: IntoIterator<Item = FormatSpecification>,
    {
        Self {
            specifications: specifications.into_iter().collect(),
            media_type: MediaType::known(media_type),
            file_extension: FileExtension::new(file_extension),
        }
    }

    /// The starting point of the refinement loop: conforms to nothing.
    pub fn unknown() -> Self {
        Self {
            specifications: BTreeSet::new(),
            media_type: MediaType::known(MediaType::BINARY),
            file_extension: FileExtension::default(),
        }
    }

    pub fn zip() -> Self {
        Self::new([FormatSpecification::ZIP], MediaType::ZIP, "zip")
    }

    pub fn epub() -> Self {
        Self::new(
            [FormatSpecification::ZIP, FormatSpecification::EPUB],
            MediaType::EPUB,
            "epub",
        )
    }

    pub fn pdf() -> Self {
        Self::new([FormatSpecification::PDF], MediaType::PDF, "pdf")
    }

    pub fn conforms_to(&self, specification: &FormatSpecification) -> bool {
        self.specifications.contains(specification)
    }

    pub fn conforms_to_all<'a, I>(&self, specifications: I) -> bool
    where
        I: IntoIterator<Item = &'a FormatSpecification>,
    {
        specifications
            .into_iter()
            .all(|specification| self.conforms_to(specification))
    }

    pub fn has_specification(&self) -> bool {
        !self.specifications.is_empty()
    }

    /// `self` refines `other` iff its specifications are a strict superset
    /// of `other`'s.
    pub fn refines(&self, other: &Format) -> bool {
        self.specifications.len() > other.specifications.len()
            && self.specifications.is_superset(&other.specifications)
    }

    /// Copy of `self` with `specification` added.
    pub fn adding(mut self, specification: FormatSpecification) -> Self {
        self.specifications.insert(specification);
        self
    }
}

impl Display for Format {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let specifications: Vec<&str> = self.specifications.iter().map(|s| s.as_str()).collect();
        write!(
            f,
            "{} (.{}) [{}]",
            self.media_type,
            self.file_extension,
            specifications.join(", ")
        )
    }
}
