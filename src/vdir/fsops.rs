//! Filesystem collaborators used internally by [`super::VDir`].
//!
//! spec.md §6 frames these as "out-of-scope, interface only" — the core
//! doesn't care how bytes get to and from disk, only that something does it.
//! These are thin `std::fs` wrappers, same shape as the teacher's own
//! `io/file_io.rs`, kept private since callers only ever go through
//! [`super::VDir`]'s methods.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Read a file's entire contents, wrapping any I/O failure with its path.
pub(super) fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `data` to `path`, overwriting any existing file.
pub(super) fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    fs::write(path, data).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Create every missing ancestor directory of `path`.
pub(super) fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| Error::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    Ok(())
}

/// Delete a file, treating "already gone" as success.
pub(super) fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(Error::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
