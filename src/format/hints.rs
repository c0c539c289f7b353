use super::{FileExtension, MediaType};
use crate::resource::ResourceProperties;

/// Candidate media types and file extensions gathered about an asset.
///
/// Both lists are ordered most authoritative first: an explicit hint from
/// the caller comes before a property reported by the resource, which comes
/// before a guess derived from a file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatHints {
    pub media_types: Vec<MediaType>,
    pub file_extensions: Vec<FileExtension>,
}

impl FormatHints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_media_type(media_type: &str) -> Self {
        let mut hints = Self::new();
        hints.add_media_type(media_type);
        hints
    }

    pub fn with_file_extension(extension: &str) -> Self {
        let mut hints = Self::new();
        hints.add_file_extension(extension);
        hints
    }

    /// Hints reported by a resource: its media type, then its file name extension.
    pub fn from_properties(properties: &ResourceProperties) -> Self {
        let mut hints = Self::new();
        if let Some(media_type) = &properties.media_type {
            hints.add_media_type(media_type);
        }
        if let Some(extension) = properties.filename.as_deref().and_then(FileExtension::of_path) {
            hints.push_file_extension(extension);
        }
        hints
    }

    /// Appends `media_type` unless it is malformed or already present.
    pub fn add_media_type(&mut self, media_type: &str) -> &mut Self {
        if let Ok(media_type) = media_type.parse::<MediaType>()
            && !self.media_types.contains(&media_type)
        {
            self.media_types.push(media_type);
        }
        self
    }

    /// Appends `extension` unless it is empty or already present.
    pub fn add_file_extension(&mut self, extension: &str) -> &mut Self {
        self.push_file_extension(FileExtension::new(extension));
        self
    }

    fn push_file_extension(&mut self, extension: FileExtension) {
        if !extension.is_empty() && !self.file_extensions.contains(&extension) {
            self.file_extensions.push(extension);
        }
    }

    /// Appends `other` after the hints already gathered, keeping their priority.
    pub fn add_hints(&mut self, other: &FormatHints) -> &mut Self {
        for media_type in &other.media_types {
            if !self.media_types.contains(media_type) {
                self.media_types.push(media_type.clone());
            }
        }
        for extension in &other.file_extensions {
            self.push_file_extension(extension.clone());
        }
        self
    }

    /// Returns true if any hinted media type matches one of `media_types`.
    ///
    /// Comparison ignores case and tolerates extra parameters on the hint.
    pub fn has_media_type(&self, media_types: &[&str]) -> bool {
        self.media_types.iter().any(|hint| {
            media_types
                .iter()
                .any(|media_type| hint.matches_str(media_type))
        })
    }

    /// Returns true if any hinted extension equals one of `extensions`, ignoring case.
    pub fn has_file_extension(&self, extensions: &[&str]) -> bool {
        self.file_extensions.iter().any(|hint| {
            extensions
                .iter()
                .any(|extension| hint.as_str().eq_ignore_ascii_case(extension))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.media_types.is_empty() && self.file_extensions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_media_type_ignores_case_and_params() {
        let hints = FormatHints::with_media_type("Application/EPUB+ZIP; charset=utf-8");
        assert!(hints.has_media_type(&["application/epub+zip"]));
        assert!(hints.has_media_type(&["text/plain", "application/epub+zip"]));
        assert!(!hints.has_media_type(&["application/zip"]));
    }

    #[test]
    fn test_has_file_extension_ignores_case() {
        let hints = FormatHints::with_file_extension(".EPUB");
        assert!(hints.has_file_extension(&["epub"]));
        assert!(hints.has_file_extension(&["EPUB"]));
        assert!(!hints.has_file_extension(&["zip"]));
    }

    #[test]
    fn test_add_hints_keeps_priority_and_deduplicates() {
        let mut hints = FormatHints::with_media_type("application/pdf");
        hints.add_file_extension("pdf");

        let mut guessed = FormatHints::with_media_type("application/octet-stream");
        guessed.add_media_type("application/pdf").add_file_extension("bin");
        hints.add_hints(&guessed);

        let media_types: Vec<String> = hints.media_types.iter().map(|m| m.to_string()).collect();
        assert_eq!(vec!["application/pdf", "application/octet-stream"], media_types);
        assert_eq!(
            vec![FileExtension::new("pdf"), FileExtension::new("bin")],
            hints.file_extensions
        );
    }

    #[test]
    fn test_from_properties() {
        let properties = ResourceProperties {
            filename: Some("Moby Dick.epub".to_string()),
            media_type: Some("application/epub+zip".to_string()),
            ..Default::default()
        };
        let hints = FormatHints::from_properties(&properties);
        assert!(hints.has_media_type(&["application/epub+zip"]));
        assert!(hints.has_file_extension(&["epub"]));
    }

    #[test]
    fn test_malformed_media_type_is_ignored() {
        let hints = FormatHints::with_media_type("not a media type");
        assert!(hints.is_empty());
    }
}
