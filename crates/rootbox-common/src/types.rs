//! Domain primitive types used across the rootbox workspace.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_REPOSITORY, DEFAULT_TAG};

/// A parsed `[repository/]name[:tag]` image reference.
///
/// Parsing never fails. Character sets are not validated; a malformed
/// reference is left for the registry to reject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef {
    repository: String,
    name: String,
    tag: String,
}

impl ImageRef {
    /// Parses an image reference, applying the `library` and `latest` defaults.
    #[must_use]
    pub fn parse(reference: &str) -> Self {
        let (repository, rest) = reference
            .split_once('/')
            .unwrap_or((DEFAULT_REPOSITORY, reference));
        let (name, tag) = match rest.rsplit_once(':') {
            Some((name, tag)) if !tag.is_empty() => (name, tag),
            Some((name, _)) => (name, DEFAULT_TAG),
            None => (rest, DEFAULT_TAG),
        };
        Self {
            repository: repository.to_string(),
            name: name.to_string(),
            tag: tag.to_string(),
        }
    }

    /// Registry namespace, `library` for official images.
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Image name within the repository.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tag, never empty.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Path component used by the registry API, `<repository>/<name>`.
    #[must_use]
    pub fn path(&self) -> String {
        format!("{}/{}", self.repository, self.name)
    }

    /// Token scope granting pull access to this image.
    #[must_use]
    pub fn pull_scope(&self) -> String {
        format!("repository:{}:pull", self.path())
    }
}

impl FromStr for ImageRef {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.repository, self.name, self.tag)
    }
}
