//! Typed assets and the retriever resolving them.

mod retriever;

pub use retriever::{AssetRetriever, MAX_REFINEMENT_STEPS};

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use crate::container::Container;
use crate::error::ReadError;
use crate::format::Format;
use crate::resource::{Resource, ResourceFactoryError};

/// A resolved [`Format`] with the bytes it describes.
#[derive(Clone)]
pub enum Asset {
    /// A single stream of bytes, such as a PDF.
    Resource {
        resource: Arc<dyn Resource>,
        format: Format,
    },
    /// Many named resources, such as the entries of an EPUB.
    Container {
        container: Arc<dyn Container>,
        format: Format,
    },
}

impl Asset {
    pub fn format(&self) -> &Format {
        match self {
            Asset::Resource { format, .. } | Asset::Container { format, .. } => format,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Asset::Container { .. })
    }

    pub fn resource(&self) -> Option<&Arc<dyn Resource>> {
        match self {
            Asset::Resource { resource, .. } => Some(resource),
            Asset::Container { .. } => None,
        }
    }

    pub fn container(&self) -> Option<&Arc<dyn Container>> {
        match self {
            Asset::Container { container, .. } => Some(container),
            Asset::Resource { .. } => None,
        }
    }
}

impl Debug for Asset {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Resource { resource, format } => f
                .debug_struct("Resource")
                .field("source_url", &resource.source_url())
                .field("format", format)
                .finish(),
            Asset::Container { container, format } => f
                .debug_struct("Container")
                .field("source_url", &container.source_url())
                .field("entries", &container.entries().len())
                .field("format", format)
                .finish(),
        }
    }
}

/// Failure to retrieve an [`Asset`].
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum AssetRetrieveError {
    /// No sniffer recognized the content. More hints may help.
    #[error("format not supported")]
    FormatNotSupported,

    /// No resource can be made for URLs of this scheme.
    #[error("URL scheme not supported: {0}")]
    SchemeNotSupported(String),

    #[error("cannot read asset: {0}")]
    Reading(#[from] ReadError),
}

impl From<ResourceFactoryError> for AssetRetrieveError {
    fn from(error: ResourceFactoryError) -> Self {
        match error {
            ResourceFactoryError::SchemeNotSupported(scheme) => Self::SchemeNotSupported(scheme),
        }
    }
}
