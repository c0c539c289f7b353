use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use url::Url;

use crate::format::FormatHints;

#[derive(Parser, Debug)]
#[command(name = "asset-retriever")]
#[command(version)]
#[command(about = "Identify local or remote publications and read their entries", long_about = None)]
#[command(after_help = "Examples:\n  \
  asset-retriever book.epub                      print the format of book.epub\n  \
  asset-retriever -l https://example.com/a.zip   list entries of a remote archive\n  \
  asset-retriever -p OEBPS/toc.xhtml book.epub   send one entry to stdout\n  \
  asset-retriever --media-type application/pdf download.bin")]
pub struct Cli {
    /// File path or URL (file, http, https)
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Media type hint, trusted over the file name
    #[arg(long = "media-type", value_name = "TYPE")]
    pub media_type: Option<String>,

    /// File extension hint, trusted over the file name
    #[arg(long = "extension", value_name = "EXT")]
    pub extension: Option<String>,

    /// List container entries
    #[arg(short = 'l')]
    pub list: bool,

    /// Write ENTRY to stdout, or the whole resource when ENTRY is omitted
    #[arg(short = 'p', value_name = "ENTRY", num_args = 0..=1, default_missing_value = "")]
    pub pipe: Option<String>,

    /// Log retrieval steps to stderr
    #[arg(short = 'v')]
    pub verbose: bool,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.file.starts_with("http://") || self.file.starts_with("https://")
    }

    pub fn is_quiet(&self) -> bool {
        self.pipe.is_some()
    }

    /// `file` as a URL: URLs are parsed, anything else is a local path.
    pub fn url(&self) -> Result<Url> {
        if self.is_http_url() || self.file.starts_with("file://") {
            return Url::parse(&self.file).with_context(|| format!("invalid URL {}", self.file));
        }

        let path = std::path::absolute(Path::new(&self.file))
            .with_context(|| format!("invalid path {}", self.file))?;
        Url::from_file_path(&path)
            .map_err(|()| anyhow::anyhow!("cannot make a URL of {}", path.display()))
    }

    /// The explicit hints given on the command line.
    pub fn hints(&self) -> FormatHints {
        let mut hints = FormatHints::new();
        if let Some(media_type) = &self.media_type {
            hints.add_media_type(media_type);
        }
        if let Some(extension) = &self.extension {
            hints.add_file_extension(extension);
        }
        hints
    }
}
