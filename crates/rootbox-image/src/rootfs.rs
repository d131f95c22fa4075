//! Root filesystem assembly.
//!
//! Layers are applied strictly one after another, in manifest order: a layer
//! is downloaded, verified when requested, extracted, and its archive deleted
//! before the next layer is fetched. Nothing is rolled back on failure; the
//! partially built directory is left in place for inspection.

use std::fs;
use std::path::{Path, PathBuf};

use rootbox_common::constants::ROOTFS_DIR_PREFIX;
use rootbox_common::error::{Result, RootboxError};
use rootbox_common::types::ImageRef;

use crate::layer::extract_layer;
use crate::manifest::{LayerDescriptor, Manifest};
use crate::registry::{AuthToken, BlobSource};

/// Creates a fresh, process-unique directory for one run's root filesystem.
///
/// The directory is not removed automatically; the caller decides whether
/// to clean it up.
///
/// # Errors
///
/// Returns `RootboxError::Io` if the directory cannot be created.
pub fn create_rootfs_dir(parent: Option<&Path>) -> Result<PathBuf> {
    let mut builder = tempfile::Builder::new();
    let _ = builder.prefix(ROOTFS_DIR_PREFIX);
    let dir = match parent {
        Some(parent) => builder.tempdir_in(parent),
        None => builder.tempdir(),
    }
    .map_err(|e| RootboxError::Io {
        path: parent.map_or_else(std::env::temp_dir, Path::to_path_buf),
        source: e,
    })?;
    let path = dir.keep();
    tracing::info!(path = %path.display(), "created root filesystem directory");
    Ok(path)
}

/// Applies an image's layers onto a directory.
pub struct RootfsBuilder<'a, S: BlobSource + ?Sized> {
    source: &'a S,
    verify: bool,
}

impl<'a, S: BlobSource + ?Sized> RootfsBuilder<'a, S> {
    /// Creates a builder that downloads blobs from `source`.
    pub const fn new(source: &'a S) -> Self {
        Self {
            source,
            verify: false,
        }
    }

    /// Enables size and digest checks of every downloaded layer.
    #[must_use]
    pub const fn verify_blobs(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Materializes the image into `root_dir`.
    ///
    /// # Errors
    ///
    /// Returns the first download, verification, or extraction error. Layers
    /// before the failing one remain applied; no later layer is touched.
    pub fn build(
        &self,
        image: &ImageRef,
        manifest: &Manifest,
        token: &AuthToken,
        root_dir: &Path,
    ) -> Result<()> {
        let total = manifest.layers.len();
        for (index, layer) in manifest.layers.iter().enumerate() {
            tracing::info!(
                layer = index + 1,
                total,
                digest = %layer.digest,
                size = layer.size,
                "applying layer"
            );
            self.apply_layer(image, layer, token, root_dir)?;
        }
        tracing::info!(
            image = %image,
            layers = total,
            root = %root_dir.display(),
            "root filesystem ready"
        );
        Ok(())
    }

    fn apply_layer(
        &self,
        image: &ImageRef,
        layer: &LayerDescriptor,
        token: &AuthToken,
        root_dir: &Path,
    ) -> Result<()> {
        let archive = self
            .source
            .download_layer_to_temp(image, token, &layer.digest, root_dir)?;

        if self.verify {
            if let Err(e) = crate::hash::verify_layer_file(&archive, layer) {
                let _ = fs::remove_file(&archive);
                return Err(e);
            }
        }

        let _ = extract_layer(&archive, root_dir)?;

        fs::remove_file(&archive).map_err(|e| RootboxError::Io {
            path: archive.clone(),
            source: e,
        })
    }
}
