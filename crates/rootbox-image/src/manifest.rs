//! Docker image manifest, schema version 2.

use rootbox_common::constants::MANIFEST_V2_MEDIA_TYPE;
use rootbox_common::error::{Result, RootboxError};
use serde::{Deserialize, Serialize};

/// One layer entry of a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDescriptor {
    /// Media type of the layer blob.
    #[serde(default)]
    pub media_type: String,
    /// Content digest, used as the blob locator.
    pub digest: String,
    /// Declared blob size in bytes.
    #[serde(default)]
    pub size: i64,
}

/// Registry document listing the layers of an image, bottom to top.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Schema media type declared by the document.
    #[serde(default)]
    pub media_type: String,
    /// Layers in application order.
    #[serde(default)]
    pub layers: Vec<LayerDescriptor>,
}

impl Manifest {
    /// Decodes a manifest and rejects any schema other than Docker v2.
    ///
    /// # Errors
    ///
    /// Returns `RootboxError::Serialization` for malformed JSON and
    /// `RootboxError::UnsupportedMediaType` for a foreign schema.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let manifest: Self = serde_json::from_slice(bytes)?;
        manifest.ensure_supported()?;
        Ok(manifest)
    }

    /// Checks that the declared media type is the one rootbox models.
    ///
    /// # Errors
    ///
    /// Returns `RootboxError::UnsupportedMediaType` on any mismatch.
    pub fn ensure_supported(&self) -> Result<()> {
        if self.media_type == MANIFEST_V2_MEDIA_TYPE {
            return Ok(());
        }
        Err(RootboxError::UnsupportedMediaType {
            expected: MANIFEST_V2_MEDIA_TYPE.into(),
            actual: self.media_type.clone(),
        })
    }

    /// Sum of the declared layer sizes.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.layers
            .iter()
            .map(|l| u64::try_from(l.size).unwrap_or(0))
            .sum()
    }
}
