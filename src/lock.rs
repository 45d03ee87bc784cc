//! The filesystem lock primitive: atomic exclusive creation of a marker file.
//!
//! This is the single atomicity primitive the claim protocol in [`crate::claim`] relies
//! on. It is deliberately *not* emulated with a check-then-create sequence: correctness
//! depends on the OS honoring `O_CREAT | O_EXCL` (exposed on all platforms Rust targets
//! via [`std::fs::OpenOptions::create_new`]).

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;

/// Errors raised by [`exclusive_create`].
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// The marker file already exists; some other process holds (or held) this lock.
    #[error("lock file already exists: {0}")]
    Exists(std::path::PathBuf),

    /// Any other I/O failure while creating the marker file.
    #[error("i/o error creating lock file {path}: {source}")]
    Io {
        /// The path that was being created.
        path: std::path::PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Atomically creates `path`, failing if it already exists.
///
/// The returned [`File`] handle is released when it is dropped; deleting the file is
/// the caller's responsibility and is done separately (see [`crate::claim`]).
pub fn exclusive_create(path: &Path) -> Result<File, LockError> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => Ok(file),
        Err(source) if source.kind() == io::ErrorKind::AlreadyExists => {
            Err(LockError::Exists(path.to_owned()))
        }
        Err(source) => Err(LockError::Io {
            path: path.to_owned(),
            source,
        }),
    }
}

/// Removes `path` if it exists; a missing file is not an error (some other step may
/// already have cleared it).
pub fn remove_if_present(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}
