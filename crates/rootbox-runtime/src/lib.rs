//! Pull-and-run pipeline for rootbox.
//!
//! The [`engine::Engine`] pulls an image into a fresh root filesystem and
//! hands it to the [`launcher::Launcher`], which re-executes the current
//! binary in new namespaces. The re-executed process plays the
//! [`child::ContainerChild`] role: it chroots and runs the target command.

#![allow(unsafe_code)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod child;
pub mod engine;
pub mod launcher;
pub mod process;
pub mod relay;
