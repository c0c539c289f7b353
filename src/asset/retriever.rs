use std::sync::Arc;
use url::Url;

use crate::container::Container;
use crate::error::ReadResult;
use crate::format::{FileExtension, Format, FormatHints};
use crate::resource::{DefaultResourceFactory, Resource, ResourceFactory};
use crate::sniffer::{DefaultFormatSniffer, FormatSniffer, FormatSnifferBlob};
use crate::zip::{ArchiveOpenError, ArchiveOpener, ZipArchiveOpener};

use super::{Asset, AssetRetrieveError};

/// Refinement stops after this many steps even if sniffers keep refining.
pub const MAX_REFINEMENT_STEPS: usize = 16;

/// Resolves URLs, resources and containers into typed [`Asset`]s.
///
/// Retrieval starts from the format suggested by the hints, then alternates
/// between sniffing the content and promoting archives to containers, for
/// as long as each sniff strictly refines the format.
#[derive(Clone)]
pub struct AssetRetriever {
    resource_factory: Arc<dyn ResourceFactory>,
    sniffer: Arc<dyn FormatSniffer>,
    archive_opener: Arc<dyn ArchiveOpener>,
}

impl Default for AssetRetriever {
    fn default() -> Self {
        Self::new(
            Arc::new(DefaultResourceFactory::default()),
            Arc::new(DefaultFormatSniffer::default()),
            Arc::new(ZipArchiveOpener::default()),
        )
    }
}

/// What the refinement loop currently holds.
enum Subject {
    Resource {
        resource: Arc<dyn Resource>,
        blob: FormatSnifferBlob,
    },
    Container(Arc<dyn Container>),
}

struct Refinement {
    subject: Subject,
    format: Format,
}

impl Refinement {
    fn finish(self) -> Result<Asset, AssetRetrieveError> {
        let format = self.format;
        resolved(match self.subject {
            Subject::Resource { resource, .. } => Asset::Resource { resource, format },
            Subject::Container(container) => Asset::Container { container, format },
        })
    }
}

/// An asset is only resolved once something is known of its format.
fn resolved(asset: Asset) -> Result<Asset, AssetRetrieveError> {
    if asset.format().has_specification() {
        Ok(asset)
    } else {
        Err(AssetRetrieveError::FormatNotSupported)
    }
}

enum Step {
    Continue(Refinement),
    Done(Result<Asset, AssetRetrieveError>),
}

impl AssetRetriever {
    pub fn new(
        resource_factory: Arc<dyn ResourceFactory>,
        sniffer: Arc<dyn FormatSniffer>,
        archive_opener: Arc<dyn ArchiveOpener>,
    ) -> Self {
        Self {
            resource_factory,
            sniffer,
            archive_opener,
        }
    }

    /// Open `url` and sniff what it is, starting from `hints`.
    ///
    /// The resource properties and the URL extension are appended to
    /// `hints`, with lower priority.
    pub async fn retrieve(
        &self,
        url: &Url,
        hints: FormatHints,
    ) -> Result<Asset, AssetRetrieveError> {
        let resource = self.resource_factory.make(url).await?;
        self.retrieve_resource(resource, hints).await
    }

    pub async fn retrieve_with_media_type(
        &self,
        url: &Url,
        media_type: &str,
    ) -> Result<Asset, AssetRetrieveError> {
        self.retrieve(url, FormatHints::with_media_type(media_type))
            .await
    }

    /// Open `url` as an asset of a known `format`, without sniffing.
    ///
    /// Archive formats are still opened as containers.
    pub async fn retrieve_with_format(
        &self,
        url: &Url,
        format: Format,
    ) -> Result<Asset, AssetRetrieveError> {
        let resource = self.resource_factory.make(url).await?;
        match self.archive_opener.open(resource.clone(), &format).await {
            Ok(container) => Ok(Asset::Container { container, format }),
            Err(ArchiveOpenError::FormatNotSupported) => Ok(Asset::Resource { resource, format }),
            Err(ArchiveOpenError::Reading(error)) => Err(error.into()),
        }
    }

    pub async fn retrieve_resource(
        &self,
        resource: Arc<dyn Resource>,
        hints: FormatHints,
    ) -> Result<Asset, AssetRetrieveError> {
        let hints = resource_hints(resource.as_ref(), hints).await?;
        let blob = FormatSnifferBlob::new(resource.clone());
        self.refine(Subject::Resource { resource, blob }, &hints)
            .await
    }

    pub async fn retrieve_container(
        &self,
        container: Arc<dyn Container>,
        hints: FormatHints,
    ) -> Result<Asset, AssetRetrieveError> {
        let mut hints = hints;
        if let Some(extension) = container.source_url().and_then(url_extension) {
            hints.add_file_extension(extension.as_str());
        }
        self.refine(Subject::Container(container), &hints).await
    }

    pub async fn sniff_format(
        &self,
        url: &Url,
        hints: FormatHints,
    ) -> Result<Format, AssetRetrieveError> {
        Ok(self.retrieve(url, hints).await?.format().clone())
    }

    pub async fn sniff_resource_format(
        &self,
        resource: Arc<dyn Resource>,
        hints: FormatHints,
    ) -> Result<Format, AssetRetrieveError> {
        Ok(self
            .retrieve_resource(resource, hints)
            .await?
            .format()
            .clone())
    }

    pub async fn sniff_container_format(
        &self,
        container: Arc<dyn Container>,
        hints: FormatHints,
    ) -> Result<Format, AssetRetrieveError> {
        Ok(self
            .retrieve_container(container, hints)
            .await?
            .format()
            .clone())
    }

    async fn refine(
        &self,
        subject: Subject,
        hints: &FormatHints,
    ) -> Result<Asset, AssetRetrieveError> {
        let format = self.sniffer.sniff_hints(hints).unwrap_or_else(Format::unknown);
        tracing::debug!(%format, ?hints, "starting format refinement");

        let mut state = Refinement { subject, format };
        for _ in 0..MAX_REFINEMENT_STEPS {
            match self.step(state).await {
                Step::Continue(next) => state = next,
                Step::Done(result) => return result,
            }
        }

        tracing::warn!(
            format = %state.format,
            "format refinement did not settle after {MAX_REFINEMENT_STEPS} steps"
        );
        state.finish()
    }

    async fn step(&self, state: Refinement) -> Step {
        let Refinement { subject, format } = state;

        let sniffed = match &subject {
            Subject::Resource { blob, .. } => self.sniffer.sniff_blob(blob, &format).await,
            Subject::Container(container) => {
                self.sniffer
                    .sniff_container(container.as_ref(), &format)
                    .await
            }
        };
        match sniffed {
            Err(error) => return Step::Done(Err(error.into())),
            Ok(Some(candidate)) if candidate.refines(&format) => {
                tracing::debug!(from = %format, to = %candidate, "refined format");
                return Step::Continue(Refinement {
                    subject,
                    format: candidate,
                });
            }
            Ok(_) => {}
        }

        let resource = match subject {
            Subject::Resource { resource, .. } => resource,
            Subject::Container(container) => {
                return Step::Done(resolved(Asset::Container { container, format }));
            }
        };

        match self.archive_opener.open(resource.clone(), &format).await {
            Ok(container) => {
                tracing::debug!(%format, entries = container.entries().len(), "opened archive");
                Step::Continue(Refinement {
                    subject: Subject::Container(container),
                    format,
                })
            }
            Err(ArchiveOpenError::FormatNotSupported) => {
                Step::Done(resolved(Asset::Resource { resource, format }))
            }
            Err(ArchiveOpenError::Reading(error)) => {
                tracing::debug!(%format, %error, "failed to open archive");
                Step::Done(Err(error.into()))
            }
        }
    }
}

/// `hints`, then the resource properties, then the extension of its URL.
async fn resource_hints(resource: &dyn Resource, hints: FormatHints) -> ReadResult<FormatHints> {
    let mut hints = hints;
    let properties = resource.properties().await?;
    hints.add_hints(&FormatHints::from_properties(&properties));
    if let Some(extension) = resource.source_url().and_then(url_extension) {
        hints.add_file_extension(extension.as_str());
    }
    Ok(hints)
}

fn url_extension(url: &Url) -> Option<FileExtension> {
    FileExtension::of_path(url.path())
}
