//! Loopback registry fixture shared by integration tests.
//!
//! An `axum` router serves the token, manifest, and blob endpoints from a
//! table of canned responses and records every request it sees, so tests can
//! assert on what the client actually sent. The server runs on its own
//! thread with a current-thread Tokio runtime; the blocking client under test
//! never touches it.

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use rootbox_common::config::RegistryConfig;
use sha2::{Digest, Sha256};
use tokio::net::TcpListener;

/// Media type of a Docker v2 manifest.
pub const V2_MEDIA_TYPE: &str = "application/vnd.docker.distribution.manifest.v2+json";

/// One request as seen by the fixture.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Path without the query string.
    pub path: String,
    /// Raw query string, empty when absent.
    pub query: String,
    /// Header names lowercased.
    pub headers: HashMap<String, String>,
}

#[derive(Clone)]
struct Canned {
    status: u16,
    body: Vec<u8>,
}

#[derive(Default)]
struct RegistryState {
    responses: Mutex<HashMap<String, Canned>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

type Shared = Arc<RegistryState>;

/// A registry running on an ephemeral loopback port.
pub struct FakeRegistry {
    addr: SocketAddr,
    state: Shared,
}

impl FakeRegistry {
    /// Binds a listener and serves requests on a background thread.
    pub fn start() -> Self {
        let state = Shared::default();
        let router = router(Arc::clone(&state));
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();

        let _ = std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("build fixture runtime");
            runtime.block_on(async move {
                let listener = TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind loopback");
                let addr = listener.local_addr().expect("local addr");
                ready_tx.send(addr).expect("report addr");
                serve(listener, router).await;
            });
        });

        let addr = ready_rx.recv().expect("registry fixture failed to start");
        Self { addr, state }
    }

    /// Base URL of the fixture, without a trailing slash.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client configuration pointing both endpoints at this fixture.
    pub fn config(&self) -> RegistryConfig {
        RegistryConfig {
            registry_url: self.base_url(),
            auth_url: format!("{}/token", self.base_url()),
            ..RegistryConfig::default()
        }
    }

    /// Registers a response for `path`.
    pub fn route(&self, path: &str, status: u16, body: impl Into<Vec<u8>>) {
        let _ = self.state.responses.lock().unwrap().insert(
            path.to_string(),
            Canned {
                status,
                body: body.into(),
            },
        );
    }

    /// Serves a token, a manifest with `media_type`, and every layer blob for
    /// `repository/name:tag`. Returns the layer digests in manifest order.
    pub fn publish(
        &self,
        path: &str,
        tag: &str,
        media_type: &str,
        layers: &[Vec<u8>],
    ) -> Vec<String> {
        self.route("/token", 200, r#"{"token":"fixture-token"}"#);
        let digests: Vec<String> = layers.iter().map(|blob| digest_of(blob)).collect();
        let descriptors: Vec<String> = layers
            .iter()
            .zip(&digests)
            .map(|(blob, digest)| {
                format!(
                    concat!(
                        r#"{{"mediaType":"application/vnd.docker.image.rootfs.diff.tar.gzip","#,
                        r#""size":{},"digest":"{}"}}"#
                    ),
                    blob.len(),
                    digest
                )
            })
            .collect();
        let manifest = format!(
            r#"{{"schemaVersion":2,"mediaType":"{media_type}","layers":[{}]}}"#,
            descriptors.join(",")
        );
        self.route(&format!("/v2/{path}/manifests/{tag}"), 200, manifest);
        for (blob, digest) in layers.iter().zip(&digests) {
            self.route(&format!("/v2/{path}/blobs/{digest}"), 200, blob.clone());
        }
        digests
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Requests whose path contains `/blobs/`.
    pub fn blob_requests(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path.contains("/blobs/"))
            .collect()
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/token", get(token))
        .route("/v2/:repo/:name/manifests/:tag", get(manifest))
        .route("/v2/:repo/:name/blobs/:digest", get(blob))
        .fallback(unrouted)
        .with_state(state)
}

async fn serve(listener: TcpListener, router: Router) {
    loop {
        let Ok((stream, _)) = listener.accept().await else {
            break;
        };
        let router = router.clone();
        let _ = tokio::spawn(async move {
            let io = hyper_util::rt::TokioIo::new(stream);
            let service = hyper_util::service::TowerToHyperService::new(router);
            let _ = hyper::server::conn::http1::Builder::new()
                .serve_connection(io, service)
                .await;
        });
    }
}

async fn token(State(state): State<Shared>, uri: Uri, headers: HeaderMap) -> Response {
    respond(&state, &uri, &headers, "/token")
}

async fn manifest(
    State(state): State<Shared>,
    Path((repo, name, tag)): Path<(String, String, String)>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let key = format!("/v2/{repo}/{name}/manifests/{tag}");
    respond(&state, &uri, &headers, &key)
}

async fn blob(
    State(state): State<Shared>,
    Path((repo, name, digest)): Path<(String, String, String)>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let key = format!("/v2/{repo}/{name}/blobs/{digest}");
    respond(&state, &uri, &headers, &key)
}

async fn unrouted(State(state): State<Shared>, uri: Uri, headers: HeaderMap) -> Response {
    respond(&state, &uri, &headers, uri.path())
}

/// Logs the request and answers with the canned response for `key`, or a
/// registry-style 404 when none is registered.
fn respond(state: &RegistryState, uri: &Uri, headers: &HeaderMap, key: &str) -> Response {
    state.requests.lock().unwrap().push(RecordedRequest {
        path: uri.path().to_string(),
        query: uri.query().unwrap_or_default().to_string(),
        headers: headers
            .iter()
            .map(|(name, value)| {
                let value = value.to_str().unwrap_or_default().to_string();
                (name.as_str().to_string(), value)
            })
            .collect(),
    });

    let canned = state.responses.lock().unwrap().get(key).cloned();
    match canned {
        Some(canned) => {
            let status =
                StatusCode::from_u16(canned.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, canned.body).into_response()
        }
        None => {
            let body = r#"{"errors":[{"code":"NOT_FOUND"}]}"#;
            (StatusCode::NOT_FOUND, body).into_response()
        }
    }
}

/// `sha256:<hex>` digest of a blob.
pub fn digest_of(blob: &[u8]) -> String {
    format!("sha256:{:x}", Sha256::digest(blob))
}

/// Builds a gzip-compressed tar layer from `(path, contents, mode)` entries.
pub fn layer(files: &[(&str, &str, u32)]) -> Vec<u8> {
    let entries: Vec<(String, Vec<u8>, u32)> = files
        .iter()
        .map(|(path, contents, mode)| {
            ((*path).to_string(), contents.as_bytes().to_vec(), *mode)
        })
        .collect();
    layer_from(&entries)
}

/// Like [`layer`] for arbitrary binary contents.
pub fn layer_from(files: &[(String, Vec<u8>, u32)]) -> Vec<u8> {
    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, contents, mode) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(*mode);
        header.set_cksum();
        builder
            .append_data(&mut header, path, contents.as_slice())
            .expect("append layer entry");
    }
    builder
        .into_inner()
        .expect("finish tar")
        .finish()
        .expect("finish gzip")
}
