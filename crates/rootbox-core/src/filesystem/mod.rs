//! Filesystem management for container isolation.

pub mod chroot;
