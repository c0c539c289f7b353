//! Named collections of [`Resource`]s.

mod path;

pub use path::RelativeUrl;

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::resource::Resource;
use url::Url;

/// A set of resources addressed by relative paths, such as the entries of a ZIP.
///
/// The entry set never changes after construction. Looking up a path that
/// is not an entry returns `None`: absence is not an error.
pub trait Container: Send + Sync {
    /// URL of the source the container was opened from, if any.
    fn source_url(&self) -> Option<&Url> {
        None
    }

    fn entries(&self) -> &BTreeSet<RelativeUrl>;

    /// A fresh resource for the entry at `url`.
    fn get(&self, url: &RelativeUrl) -> Option<Arc<dyn Resource>>;

    /// [`Container::get`] from a string, normalized first.
    fn get_path(&self, path: &str) -> Option<Arc<dyn Resource>> {
        self.get(&RelativeUrl::new(path)?)
    }
}

/// A container exposing a single resource under a single path.
pub struct SingleResourceContainer {
    entries: BTreeSet<RelativeUrl>,
    resource: Arc<dyn Resource>,
}

impl SingleResourceContainer {
    pub fn new(path: RelativeUrl, resource: Arc<dyn Resource>) -> Self {
        Self {
            entries: BTreeSet::from([path]),
            resource,
        }
    }
}

impl Container for SingleResourceContainer {
    fn source_url(&self) -> Option<&Url> {
        self.resource.source_url()
    }

    fn entries(&self) -> &BTreeSet<RelativeUrl> {
        &self.entries
    }

    fn get(&self, url: &RelativeUrl) -> Option<Arc<dyn Resource>> {
        self.entries
            .contains(url)
            .then(|| self.resource.clone())
    }
}
