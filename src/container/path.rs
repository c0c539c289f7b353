use std::borrow::Borrow;
use std::fmt::{self, Display, Formatter};

/// A normalized path relative to the root of a [`Container`](super::Container).
///
/// Normalization turns `\` into `/`, drops empty and `.` segments, and
/// resolves `..` without ever climbing above the root. A path that
/// normalizes to nothing is not a valid `RelativeUrl`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelativeUrl(String);

impl RelativeUrl {
    pub fn new(path: &str) -> Option<Self> {
        let normalized = normalize(path);
        (!normalized.is_empty()).then_some(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last path segment.
    pub fn filename(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Lower-cased extension of the last segment, if any.
    pub fn extension(&self) -> Option<String> {
        let (stem, extension) = self.filename().rsplit_once('.')?;
        (!stem.is_empty() && !extension.is_empty()).then(|| extension.to_ascii_lowercase())
    }
}

impl Display for RelativeUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for RelativeUrl {
    fn borrow(&self) -> &str {
        &self.0
    }
}

fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut stack: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                // Popping an empty stack keeps us at the root
                stack.pop();
            }
            _ => stack.push(segment),
        }
    }

    stack.join("/")
}
