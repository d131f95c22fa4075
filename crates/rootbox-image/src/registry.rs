//! Docker Registry v2 API client.
//!
//! Every call is single-shot: no retries, no resumption. The bearer token is
//! acquired once per run and shared read-only by the manifest and blob calls.

use std::fmt;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header;
use rootbox_common::config::RegistryConfig;
use rootbox_common::constants::{
    APP_NAME, LAYER_FILE_PREFIX, LAYER_FILE_SUFFIX, MANIFEST_V2_MEDIA_TYPE,
};
use rootbox_common::error::{Result, RootboxError};
use rootbox_common::types::ImageRef;
use serde::Deserialize;

use crate::manifest::Manifest;

/// Opaque bearer credential scoped to one image's pull access.
///
/// Lives in memory for one run and is never written anywhere.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wraps a raw token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token for use in an `Authorization` header.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Token response envelope from the token service.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

/// Anything that can stream a layer blob into a writer.
///
/// [`RegistryClient`] is the production implementation; the trait lets the
/// root filesystem builder run against other sources.
pub trait BlobSource {
    /// Streams the blob `digest` of `image` into `dest`, returning the number
    /// of bytes written.
    ///
    /// # Errors
    ///
    /// Returns `RootboxError::Blob` if the request or the copy fails.
    fn fetch_blob(
        &self,
        image: &ImageRef,
        token: &AuthToken,
        digest: &str,
        dest: &mut dyn Write,
    ) -> Result<u64>;

    /// Downloads a blob into a fresh `layer-*.tar.gz` file inside `dir` and
    /// returns its path. The file is closed before this returns.
    ///
    /// A failed download removes the partial file.
    ///
    /// # Errors
    ///
    /// Returns an error if the temp file cannot be created or kept, or if
    /// [`BlobSource::fetch_blob`] fails.
    fn download_layer_to_temp(
        &self,
        image: &ImageRef,
        token: &AuthToken,
        digest: &str,
        dir: &Path,
    ) -> Result<PathBuf> {
        let mut file = tempfile::Builder::new()
            .prefix(LAYER_FILE_PREFIX)
            .suffix(LAYER_FILE_SUFFIX)
            .tempfile_in(dir)
            .map_err(|e| RootboxError::Io {
                path: dir.to_path_buf(),
                source: e,
            })?;

        let written = self.fetch_blob(image, token, digest, file.as_file_mut())?;

        let (handle, path) = file.keep().map_err(|e| RootboxError::Io {
            path: e.file.path().to_path_buf(),
            source: e.error,
        })?;
        drop(handle);

        tracing::debug!(digest, bytes = written, path = %path.display(), "layer downloaded");
        Ok(path)
    }
}

/// Blocking client for the Docker Registry v2 API.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: Client,
    config: RegistryConfig,
}

impl RegistryClient {
    /// Creates a client for the configured registry.
    ///
    /// The HTTP client has no overall request timeout: blob downloads block
    /// until they complete or the connection fails.
    ///
    /// # Errors
    ///
    /// Returns `RootboxError::Config` if the HTTP client cannot be built.
    pub fn new(config: RegistryConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("rootbox/", env!("CARGO_PKG_VERSION")))
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| RootboxError::Config {
                message: format!("failed to build {APP_NAME} HTTP client: {e}"),
            })?;
        Ok(Self { http, config })
    }

    /// Exchanges the image identity for an anonymous pull token.
    ///
    /// # Errors
    ///
    /// Returns `RootboxError::Auth` if the request fails, the service answers
    /// with an error status, or the body is not a `{"token": ...}` envelope.
    pub fn authenticate(&self, image: &ImageRef) -> Result<AuthToken> {
        let scope = image.pull_scope();
        tracing::info!(scope = %scope, "requesting registry token");

        let auth_err = |message: String| RootboxError::Auth {
            scope: scope.clone(),
            message,
        };

        let response = self
            .http
            .get(&self.config.auth_url)
            .query(&[
                ("client_id", self.config.client_id.as_str()),
                ("service", self.config.service.as_str()),
                ("scope", scope.as_str()),
            ])
            .send()
            .and_then(Response::error_for_status)
            .map_err(|e| auth_err(e.to_string()))?;

        let envelope: TokenResponse = serde_json::from_reader(response)
            .map_err(|e| auth_err(format!("invalid token response: {e}")))?;
        Ok(AuthToken(envelope.token))
    }

    /// Fetches the image manifest for the reference's tag.
    ///
    /// # Errors
    ///
    /// Returns `RootboxError::Manifest` if the request or decoding fails and
    /// `RootboxError::UnsupportedMediaType` if the registry answered with any
    /// schema other than Docker v2.
    pub fn fetch_manifest(&self, image: &ImageRef, token: &AuthToken) -> Result<Manifest> {
        let url = self.manifest_url(image);
        tracing::info!(url = %url, "fetching manifest");

        let manifest_err = |message: String| RootboxError::Manifest {
            image: image.to_string(),
            message,
        };

        let mut response = self
            .http
            .get(&url)
            .bearer_auth(token.secret())
            .header(header::ACCEPT, MANIFEST_V2_MEDIA_TYPE)
            .send()
            .and_then(Response::error_for_status)
            .map_err(|e| manifest_err(e.to_string()))?;

        let mut body = Vec::new();
        let _ = response
            .read_to_end(&mut body)
            .map_err(|e| manifest_err(format!("failed to read body: {e}")))?;

        let manifest = Manifest::from_slice(&body).map_err(|e| match e {
            RootboxError::Serialization { source } => {
                manifest_err(format!("invalid manifest body: {source}"))
            }
            other => other,
        })?;

        tracing::info!(
            layers = manifest.layers.len(),
            bytes = manifest.total_size(),
            "manifest accepted"
        );
        Ok(manifest)
    }

    fn manifest_url(&self, image: &ImageRef) -> String {
        format!("{}/v2/{}/manifests/{}", self.base_url(), image.path(), image.tag())
    }

    fn blob_url(&self, image: &ImageRef, digest: &str) -> String {
        format!("{}/v2/{}/blobs/{digest}", self.base_url(), image.path())
    }

    fn base_url(&self) -> &str {
        self.config.registry_url.trim_end_matches('/')
    }
}

impl BlobSource for RegistryClient {
    fn fetch_blob(
        &self,
        image: &ImageRef,
        token: &AuthToken,
        digest: &str,
        dest: &mut dyn Write,
    ) -> Result<u64> {
        let url = self.blob_url(image, digest);
        tracing::debug!(url = %url, "fetching blob");

        let blob_err = |message: String| RootboxError::Blob {
            digest: digest.to_string(),
            message,
        };

        let mut response = self
            .http
            .get(&url)
            .bearer_auth(token.secret())
            .send()
            .and_then(Response::error_for_status)
            .map_err(|e| blob_err(e.to_string()))?;

        response
            .copy_to(dest)
            .map_err(|e| blob_err(format!("download interrupted: {e}")))
    }
}
