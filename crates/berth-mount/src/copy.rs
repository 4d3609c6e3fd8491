//! Seeding of new volumes from the content they shadow.

use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::path::Path;

use berth_common::error::{BerthError, Result};
use nix::sys::stat::{Mode, SFlag, mknod};
use nix::unistd::{Gid, Uid, mkfifo};
use walkdir::WalkDir;

/// File-tree primitives used to seed volumes.
pub trait ContentCopier {
    /// Recursively copies the contents of `source` into `destination`.
    ///
    /// # Errors
    ///
    /// Returns an error if any entry cannot be copied.
    fn copy_tree(&self, source: &Path, destination: &Path) -> Result<()>;

    /// Gives `destination` the owner, group and mode of `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if ownership or permissions cannot be changed.
    fn copy_ownership(&self, source: &Path, destination: &Path) -> Result<()>;
}

/// Copies `source` into `destination` when there is something to copy and
/// `destination` is still empty, then aligns ownership.
///
/// # Errors
///
/// Returns an error if either directory cannot be listed or the copier fails.
pub fn copy_existing_contents(
    source: &Path,
    destination: &Path,
    copier: &dyn ContentCopier,
) -> Result<()> {
    if !is_empty_dir(source)? && is_empty_dir(destination)? {
        copier.copy_tree(source, destination)?;
    }
    copier.copy_ownership(source, destination)
}

fn is_empty_dir(path: &Path) -> Result<bool> {
    let mut entries = std::fs::read_dir(path).map_err(|e| BerthError::io(path, e))?;
    Ok(entries.next().is_none())
}

/// [`ContentCopier`] operating directly on the host filesystem.
///
/// Symlinks are recreated rather than followed. FIFOs and device nodes are
/// recreated with `mkfifo`/`mknod` and never opened; sockets are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostCopier;

impl ContentCopier for HostCopier {
    fn copy_tree(&self, source: &Path, destination: &Path) -> Result<()> {
        let mut dirs = Vec::new();

        for entry in WalkDir::new(source).min_depth(1).follow_links(false) {
            let entry = entry.map_err(|e| BerthError::io(source, e.into()))?;
            let from = entry.path();
            let Ok(relative) = from.strip_prefix(source) else {
                continue;
            };
            let to = destination.join(relative);
            let file_type = entry.file_type();

            if file_type.is_dir() {
                std::fs::create_dir_all(&to).map_err(|e| BerthError::io(&to, e))?;
                dirs.push((from.to_path_buf(), to));
            } else if file_type.is_symlink() {
                let target = std::fs::read_link(from).map_err(|e| BerthError::io(from, e))?;
                std::os::unix::fs::symlink(&target, &to).map_err(|e| BerthError::io(&to, e))?;
            } else if file_type.is_file() {
                let _ = std::fs::copy(from, &to).map_err(|e| BerthError::io(from, e))?;
                self.copy_ownership(from, &to)?;
            } else {
                let meta = entry
                    .metadata()
                    .map_err(|e| BerthError::io(from, e.into()))?;
                if make_special(from, &to, &meta)? {
                    self.copy_ownership(from, &to)?;
                }
            }
        }

        // Directory modes go last so read-only directories can still be filled.
        for (from, to) in dirs.iter().rev() {
            self.copy_ownership(from, to)?;
        }
        Ok(())
    }

    fn copy_ownership(&self, source: &Path, destination: &Path) -> Result<()> {
        let meta = std::fs::metadata(source).map_err(|e| BerthError::io(source, e))?;
        let dest_meta =
            std::fs::metadata(destination).map_err(|e| BerthError::io(destination, e))?;

        if meta.uid() != dest_meta.uid() || meta.gid() != dest_meta.gid() {
            nix::unistd::chown(
                destination,
                Some(Uid::from_raw(meta.uid())),
                Some(Gid::from_raw(meta.gid())),
            )
            .map_err(|e| BerthError::io(destination, e.into()))?;
        }

        let mode = meta.permissions().mode() & 0o7777;
        std::fs::set_permissions(destination, std::fs::Permissions::from_mode(mode))
            .map_err(|e| BerthError::io(destination, e))
    }
}

/// Recreates a FIFO or device node at `to`. Returns `false` for sockets,
/// which are not copied.
fn make_special(from: &Path, to: &Path, meta: &std::fs::Metadata) -> Result<bool> {
    let file_type = meta.file_type();
    let perm = Mode::from_bits_truncate(meta.mode() & 0o7777);
    let made = if file_type.is_fifo() {
        mkfifo(to, perm)
    } else if file_type.is_char_device() {
        mknod(to, SFlag::S_IFCHR, perm, meta.rdev())
    } else if file_type.is_block_device() {
        mknod(to, SFlag::S_IFBLK, perm, meta.rdev())
    } else {
        tracing::debug!(path = %from.display(), "skipping socket");
        return Ok(false);
    };
    made.map_err(|e| BerthError::io(to, e.into()))?;
    Ok(true)
}
