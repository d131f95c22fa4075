//! # rootbox-core
//!
//! Low-level Linux isolation primitives for rootbox.
//!
//! This crate provides safe abstractions over:
//! - **Namespaces**: PID, mount, and UTS isolation via `unshare(2)`.
//! - **Filesystem**: switching the process root with `chroot(2)`.
//!
//! Non-Linux builds compile against stubs that always report an error.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod filesystem;
pub mod namespace;
