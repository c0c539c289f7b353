use async_trait::async_trait;

use crate::container::{Container, RelativeUrl};
use crate::error::ReadResult;
use crate::format::{Format, FormatHints, FormatSpecification, MediaType};

use super::FormatSniffer;

pub(crate) const AUDIO_EXTENSIONS: &[&str] = &[
    "aac", "aiff", "alac", "flac", "m4a", "m4b", "mp3", "ogg", "oga", "mogg", "opus", "wav", "webm",
];

const BITMAP_EXTENSIONS: &[&str] = &[
    "avif", "bmp", "dib", "gif", "jif", "jfi", "jfif", "jpg", "jpeg", "jxl", "png", "tif", "tiff",
    "webp",
];

/// Comic metadata files allowed next to the pages.
const COMIC_METADATA_EXTENSIONS: &[&str] = &["acbf", "xml"];

/// Playlists and metadata that may ride along any informal publication.
const IGNORED_EXTENSIONS: &[&str] = &[
    "asx", "bio", "m3u", "m3u8", "pla", "pls", "smil", "txt", "vlc", "wpl", "xspf", "zpl",
];

/// Entry rule of a publication made of loose files in a ZIP.
///
/// Matches when at least one entry has a `required` extension and every
/// entry that isn't ignored has a `required` or `allowed` one.
struct InformalRule {
    required: &'static [&'static str],
    allowed: &'static [&'static str],
}

impl InformalRule {
    fn matches<'a>(&self, entries: impl IntoIterator<Item = &'a RelativeUrl>) -> bool {
        let mut found_required = false;
        for entry in entries {
            if is_ignored(entry) {
                continue;
            }
            let extension = entry.extension().unwrap_or_default();
            if self.required.contains(&extension.as_str()) {
                found_required = true;
            } else if !self.allowed.contains(&extension.as_str()) {
                return false;
            }
        }
        found_required
    }
}

fn is_ignored(entry: &RelativeUrl) -> bool {
    let filename = entry.filename();
    filename.starts_with('.')
        || filename == "Thumbs.db"
        || entry
            .extension()
            .is_some_and(|extension| IGNORED_EXTENSIONS.contains(&extension.as_str()))
}

/// Only a plain ZIP can turn out to be an informal publication.
fn is_plain_zip(format: &Format) -> bool {
    format.conforms_to(&FormatSpecification::ZIP) && format.specifications.len() == 1
}

/// ZIP archives of audio files without any manifest, possibly with cover
/// images.
pub struct InformalAudiobookSniffer;

impl InformalAudiobookSniffer {
    const RULE: InformalRule = InformalRule {
        required: AUDIO_EXTENSIONS,
        allowed: BITMAP_EXTENSIONS,
    };

    fn format() -> Format {
        Format::new(
            [
                FormatSpecification::ZIP,
                FormatSpecification::INFORMAL_AUDIOBOOK,
            ],
            MediaType::ZIP,
            "zip",
        )
    }
}

#[async_trait]
impl FormatSniffer for InformalAudiobookSniffer {
    async fn sniff_container(
        &self,
        container: &dyn Container,
        refining: &Format,
    ) -> ReadResult<Option<Format>> {
        if !is_plain_zip(refining) {
            return Ok(None);
        }
        Ok(Self::RULE
            .matches(container.entries())
            .then(Self::format))
    }
}

/// ZIP archives of bitmap pages without any manifest (CBZ).
pub struct InformalComicSniffer;

impl InformalComicSniffer {
    const RULE: InformalRule = InformalRule {
        required: BITMAP_EXTENSIONS,
        allowed: COMIC_METADATA_EXTENSIONS,
    };

    fn format() -> Format {
        Format::new(
            [FormatSpecification::ZIP, FormatSpecification::INFORMAL_COMIC],
            MediaType::CBZ,
            "cbz",
        )
    }
}

#[async_trait]
impl FormatSniffer for InformalComicSniffer {
    fn sniff_hints(&self, hints: &FormatHints) -> Option<Format> {
        (hints.has_file_extension(&["cbz"]) || hints.has_media_type(&[MediaType::CBZ]))
            .then(Self::format)
    }

    async fn sniff_container(
        &self,
        container: &dyn Container,
        refining: &Format,
    ) -> ReadResult<Option<Format>> {
        if !is_plain_zip(refining) {
            return Ok(None);
        }
        Ok(Self::RULE
            .matches(container.entries())
            .then(Self::format))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(paths: &[&str]) -> Vec<RelativeUrl> {
        paths.iter().filter_map(|path| RelativeUrl::new(path)).collect()
    }

    #[test]
    fn test_audiobook_rule() {
        let rule = InformalAudiobookSniffer::RULE;
        #[rustfmt::skip]
        let expected = [
            (true, &["01.mp3", "02.MP3"][..]),
            (true, &["disc1/01.flac", "playlist.m3u", ".DS_Store", "Thumbs.db", "notes.txt"][..]),
            (true, &["01.mp3", "cover.jpg", "back.PNG"][..]),
            (false, &["cover.jpg"][..]),
            (false, &["01.mp3", "booklet.pdf"][..]),
            (false, &["playlist.m3u", "notes.txt"][..]),
            (false, &["README"][..]),
            (false, &[][..]),
        ];

        for (expected, paths) in expected {
            assert_eq!(expected, rule.matches(&entries(paths)), "{paths:?}");
        }
    }

    #[test]
    fn test_comic_rule() {
        let rule = InformalComicSniffer::RULE;
        assert!(rule.matches(&entries(&["001.jpg", "002.png", "ComicInfo.xml"])));
        assert!(!rule.matches(&entries(&["ComicInfo.xml"])));
        assert!(!rule.matches(&entries(&["001.jpg", "chapter.html"])));
    }

    #[test]
    fn test_only_plain_zips_qualify() {
        assert!(is_plain_zip(&Format::zip()));
        assert!(!is_plain_zip(&Format::epub()));
        assert!(!is_plain_zip(&Format::unknown()));
    }
}
