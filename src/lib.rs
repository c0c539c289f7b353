//! # asset-retriever
//!
//! Turns a local file or a remote HTTP object into a typed [`Asset`]: a
//! resolved [`Format`] paired with either a single [`Resource`] or a
//! [`Container`] of named resources, such as the entries of a ZIP.
//!
//! Retrieval is iterative. Hints (media types, file extensions) suggest a
//! first format, sniffers refine it from the content, and archives are
//! promoted to containers so that container sniffers can tell, for instance,
//! an EPUB from a plain ZIP. Refinement stops as soon as a sniff no longer
//! adds a specification.
//!
//! Remote archives are read with HTTP Range requests. Their end, which holds
//! the ZIP central directory, is cached in memory, so listing entries and
//! reading one of them never downloads the whole file.
//!
//! ## Features
//!
//! - `file://`, `http://` and `https://` sources
//! - ZIP and ZIP64 archives, STORED and DEFLATE entries, ranged entry reads
//! - EPUB, Readium packages and manifests, informal audiobooks and comics,
//!   PDF, HTML, XML, OPDS 1, JSON, LCP licenses and bitmaps
//!
//! ## Example
//!
//! ```no_run
//! use asset_retriever::{AssetRetriever, FormatHints};
//! use url::Url;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let retriever = AssetRetriever::default();
//!     let url = Url::parse("https://example.com/moby-dick.epub")?;
//!     let asset = retriever.retrieve(&url, FormatHints::new()).await?;
//!     println!("{}", asset.format());
//!
//!     if let Some(container) = asset.container() {
//!         for entry in container.entries() {
//!             println!("{entry}");
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod asset;
pub mod cli;
pub mod container;
pub mod error;
pub mod format;
pub mod io;
pub mod logging;
pub mod resource;
pub mod sniffer;
pub mod zip;

#[cfg(test)]
mod testing;

pub use asset::{Asset, AssetRetrieveError, AssetRetriever};
pub use cli::Cli;
pub use container::{Container, RelativeUrl};
pub use error::{HttpError, ReadError, ReadResult};
pub use format::{FileExtension, Format, FormatHints, FormatSpecification, MediaType};
pub use io::{HttpRangeReader, LocalFileReader, ReadAt};
pub use resource::{
    BufferResource, DefaultResourceFactory, FileResource, HttpResource, Resource,
    ResourceFactory, ResourceProperties,
};
pub use sniffer::{DefaultFormatSniffer, FormatSniffer, FormatSnifferBlob};
pub use zip::{ArchiveOpener, ZipArchiveOpener, ZipContainer};
