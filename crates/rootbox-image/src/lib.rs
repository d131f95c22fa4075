//! # rootbox-image
//!
//! Image retrieval and root filesystem assembly for rootbox.
//!
//! Handles:
//! - **Registry**: token exchange, manifest fetch, and streaming blob download.
//! - **Manifest**: the Docker v2 schema 2 manifest model.
//! - **Layers**: gzip tar extraction with last-writer-wins link handling.
//! - **Rootfs**: ordered, sequential application of layers into one directory.
//! - **Hashing**: optional SHA-256 and size verification of downloaded blobs.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod hash;
pub mod layer;
pub mod manifest;
pub mod registry;
pub mod rootfs;
