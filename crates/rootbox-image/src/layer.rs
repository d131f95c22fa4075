//! Filesystem layer extraction.
//!
//! Layers are applied onto the same directory, so later layers overwrite
//! files from earlier ones. Regular files are overwritten by the unpacker
//! itself; for hard links and symlinks any existing path is removed first so
//! that the newest layer always wins.

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use rootbox_common::error::{Result, RootboxError};

/// Counters reported after a layer is unpacked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Entries written into the destination.
    pub entries: usize,
    /// Existing paths removed to make room for a link entry.
    pub replaced_links: usize,
}

/// Extracts a layer archive into the target directory.
///
/// Gzip-compressed archives are detected by their magic bytes; plain tar
/// archives are accepted as well. Entries that would land outside `target`
/// are skipped.
///
/// # Errors
///
/// Returns `RootboxError::Extract` if the archive is corrupt or truncated, or
/// if any entry cannot be written. Entries unpacked before the failure stay
/// on disk.
pub fn extract_layer(archive_path: &Path, target: &Path) -> Result<ExtractSummary> {
    tracing::info!(
        archive = %archive_path.display(),
        target = %target.display(),
        "extracting layer"
    );

    fs::create_dir_all(target).map_err(|e| RootboxError::Io {
        path: target.to_path_buf(),
        source: e,
    })?;

    let extract_err = |e| RootboxError::Extract {
        path: archive_path.to_path_buf(),
        source: e,
    };

    let mut file = File::open(archive_path).map_err(extract_err)?;
    let summary = if is_gzip(&mut file).map_err(extract_err)? {
        unpack(GzDecoder::new(BufReader::new(file)), target)
    } else {
        unpack(BufReader::new(file), target)
    }
    .map_err(extract_err)?;

    tracing::info!(
        entries = summary.entries,
        replaced_links = summary.replaced_links,
        "layer extracted"
    );
    Ok(summary)
}

fn unpack<R: Read>(reader: R, target: &Path) -> io::Result<ExtractSummary> {
    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);

    let root = target.canonicalize()?;
    let mut summary = ExtractSummary::default();
    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_type = entry.header().entry_type();

        if entry_type.is_symlink() || entry_type.is_hard_link() {
            let relative = entry.path()?.into_owned();
            let dest = contained_path(&root, &relative).and_then(|p| resolve_in(&root, &p));
            if let Some(dest) = dest {
                if remove_existing(&dest)? {
                    tracing::debug!(path = %dest.display(), "replaced existing path with link");
                    summary.replaced_links += 1;
                }
            }
        }

        if entry.unpack_in(target)? {
            summary.entries += 1;
        } else {
            tracing::warn!(entry_type = ?entry_type, "skipped entry outside destination");
        }
    }
    Ok(summary)
}

/// Joins an archive path onto `root`, refusing paths that climb out of it.
fn contained_path(root: &Path, relative: &Path) -> Option<PathBuf> {
    let mut dest = root.to_path_buf();
    let mut depth = 0usize;
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                dest.push(part);
                depth += 1;
            }
            Component::ParentDir => return None,
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    (depth > 0).then_some(dest)
}

/// Resolves the parent of `path` through any symlinks and keeps the result
/// only if it still lies inside `root`.
///
/// Returns `None` when the parent is missing or escapes `root`; nothing may
/// be removed in either case.
fn resolve_in(root: &Path, path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?;
    let parent = path.parent()?.canonicalize().ok()?;
    if parent.starts_with(root) {
        Some(parent.join(name))
    } else {
        tracing::warn!(path = %path.display(), "link parent resolves outside destination");
        None
    }
}

/// Removes whatever occupies `path` without following symlinks.
///
/// Returns whether something was removed.
fn remove_existing(path: &Path) -> io::Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path).map(|()| true),
        Ok(_) => fs::remove_file(path).map(|()| true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Sniffs the gzip magic number and rewinds the file.
fn is_gzip(file: &mut File) -> io::Result<bool> {
    let mut magic = [0u8; 2];
    let mut read = 0;
    while read < magic.len() {
        match file.read(&mut magic[read..])? {
            0 => break,
            n => read += n,
        }
    }
    file.rewind()?;
    Ok(read == magic.len() && magic == [0x1f, 0x8b])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn append_file(
        builder: &mut tar::Builder<impl std::io::Write>,
        path: &str,
        data: &[u8],
        mode: u32,
    ) {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(mode);
        header.set_cksum();
        builder
            .append_data(&mut header, path, data)
            .expect("failed to append data");
    }

    fn append_link(
        builder: &mut tar::Builder<impl std::io::Write>,
        kind: tar::EntryType,
        path: &str,
        target: &str,
    ) {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(kind);
        header.set_size(0);
        header.set_mode(0o777);
        builder
            .append_link(&mut header, path, target)
            .expect("failed to append link");
    }

    fn write_tar_gz(
        path: &Path,
        fill: impl FnOnce(&mut tar::Builder<flate2::write::GzEncoder<File>>),
    ) {
        let file = File::create(path).expect("failed to create tar.gz");
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        fill(&mut builder);
        let encoder = builder.into_inner().expect("failed to finish tar");
        let _ = encoder.finish().expect("failed to finish gzip");
    }

    #[test]
    fn extract_gzip_layer_preserves_paths_and_modes() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let archive = dir.path().join("layer.tar.gz");
        write_tar_gz(&archive, |b| {
            append_file(b, "bin/tool", b"#!/bin/sh\n", 0o755);
            append_file(b, "etc/motd", b"welcome", 0o644);
        });
        let target = dir.path().join("rootfs");

        let summary = extract_layer(&archive, &target).expect("extract failed");
        assert_eq!(summary.entries, 2);
        assert_eq!(fs::read_to_string(target.join("etc/motd")).unwrap(), "welcome");
        let mode = fs::metadata(target.join("bin/tool")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn extract_plain_tar_is_accepted() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let archive = dir.path().join("layer.tar");
        let mut builder = tar::Builder::new(File::create(&archive).unwrap());
        append_file(&mut builder, "hello.txt", b"hello from layer", 0o644);
        builder.finish().unwrap();
        let target = dir.path().join("rootfs");

        let _ = extract_layer(&archive, &target).expect("extract failed");
        assert_eq!(fs::read_to_string(target.join("hello.txt")).unwrap(), "hello from layer");
    }

    #[test]
    fn later_layer_overwrites_regular_file() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let lower = dir.path().join("lower.tar.gz");
        let upper = dir.path().join("upper.tar.gz");
        write_tar_gz(&lower, |b| append_file(b, "etc/os-release", b"lower", 0o644));
        write_tar_gz(&upper, |b| append_file(b, "etc/os-release", b"upper", 0o644));
        let target = dir.path().join("rootfs");

        let _ = extract_layer(&lower, &target).expect("lower failed");
        let _ = extract_layer(&upper, &target).expect("upper failed");
        assert_eq!(fs::read_to_string(target.join("etc/os-release")).unwrap(), "upper");
    }

    #[test]
    fn symlink_replaces_existing_regular_file() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let target = dir.path().join("rootfs");
        fs::create_dir_all(target.join("bin")).unwrap();
        fs::write(target.join("bin/sh"), b"old shell").unwrap();

        let archive = dir.path().join("layer.tar.gz");
        write_tar_gz(&archive, |b| {
            append_link(b, tar::EntryType::Symlink, "bin/sh", "busybox");
        });

        let summary = extract_layer(&archive, &target).expect("extract failed");
        assert_eq!(summary.replaced_links, 1);
        let meta = fs::symlink_metadata(target.join("bin/sh")).unwrap();
        assert!(meta.file_type().is_symlink());
        assert_eq!(fs::read_link(target.join("bin/sh")).unwrap(), Path::new("busybox"));
    }

    #[test]
    fn reextracting_links_is_idempotent() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let archive = dir.path().join("layer.tar.gz");
        write_tar_gz(&archive, |b| {
            append_file(b, "bin/busybox", b"binary", 0o755);
            append_link(b, tar::EntryType::Link, "bin/ls", "bin/busybox");
            append_link(b, tar::EntryType::Symlink, "bin/sh", "busybox");
        });
        let target = dir.path().join("rootfs");

        let first = extract_layer(&archive, &target).expect("first extract failed");
        assert_eq!(first.replaced_links, 0);
        let second = extract_layer(&archive, &target).expect("second extract failed");
        assert_eq!(second.replaced_links, 2);

        assert_eq!(fs::read(target.join("bin/ls")).unwrap(), b"binary");
        assert!(fs::symlink_metadata(target.join("bin/sh")).unwrap().file_type().is_symlink());
    }

    #[test]
    fn symlink_replaces_existing_directory() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let target = dir.path().join("rootfs");
        fs::create_dir_all(target.join("lib/modules")).unwrap();
        fs::write(target.join("lib/modules/dep"), b"x").unwrap();

        let archive = dir.path().join("layer.tar.gz");
        write_tar_gz(&archive, |b| {
            append_link(b, tar::EntryType::Symlink, "lib", "usr/lib");
        });

        let _ = extract_layer(&archive, &target).expect("extract failed");
        assert!(fs::symlink_metadata(target.join("lib")).unwrap().file_type().is_symlink());
    }

    #[test]
    fn link_under_symlinked_parent_never_touches_outside_paths() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let outside = dir.path().join("host");
        fs::create_dir_all(outside.join("victim")).unwrap();
        fs::write(outside.join("victim/precious"), b"keep me").unwrap();
        let target = dir.path().join("rootfs");

        let lower = dir.path().join("lower.tar.gz");
        let outside_str = outside.to_string_lossy().into_owned();
        write_tar_gz(&lower, |b| {
            append_link(b, tar::EntryType::Symlink, "escape", &outside_str);
        });
        let upper = dir.path().join("upper.tar.gz");
        write_tar_gz(&upper, |b| {
            append_link(b, tar::EntryType::Symlink, "escape/victim", "/etc/passwd");
        });

        let _ = extract_layer(&lower, &target).expect("lower failed");
        let err = extract_layer(&upper, &target).unwrap_err();

        assert!(matches!(err, RootboxError::Extract { .. }));
        assert_eq!(fs::read(outside.join("victim/precious")).unwrap(), b"keep me");
    }

    #[test]
    fn truncated_archive_returns_extract_error() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let archive = dir.path().join("layer.tar.gz");
        let mut state = 0x2545_f491_u32;
        let noise: Vec<u8> = (0..64 * 1024)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                state.to_be_bytes()[0]
            })
            .collect();
        write_tar_gz(&archive, |b| append_file(b, "big", &noise, 0o644));
        let bytes = fs::read(&archive).unwrap();
        fs::write(&archive, &bytes[..bytes.len() / 2]).unwrap();

        let err = extract_layer(&archive, &dir.path().join("rootfs")).unwrap_err();
        assert!(matches!(err, RootboxError::Extract { .. }));
    }

    #[test]
    fn extract_nonexistent_archive_returns_error() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let result = extract_layer(&dir.path().join("missing.tar.gz"), &dir.path().join("out"));
        assert!(result.is_err());
    }

    #[test]
    fn contained_path_rejects_parent_components() {
        let root = Path::new("/rootfs");
        assert_eq!(
            contained_path(root, Path::new("./usr/bin/env")),
            Some(PathBuf::from("/rootfs/usr/bin/env"))
        );
        assert_eq!(
            contained_path(root, Path::new("/etc/passwd")),
            Some(PathBuf::from("/rootfs/etc/passwd"))
        );
        assert_eq!(contained_path(root, Path::new("../escape")), None);
        assert_eq!(contained_path(root, Path::new(".")), None);
    }
}
