//! Single-instance guard scoped to a watch directory.
//!
//! Each watch directory maps to one marker file named `blendpdf-<hash>.lock`,
//! where `<hash>` is the first 8 hex characters of the MD5 digest of the
//! absolute, case-folded, slash-normalized directory path. Two processes
//! watching the same folder collide on the marker; different folders never do.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use thiserror::Error;

/// Prefix shared by every lock marker.
pub const LOCK_FILE_PREFIX: &str = "blendpdf";

/// Errors raised while taking the directory lock.
#[derive(Error, Debug)]
pub enum LockError {
    #[error("Another instance is already running (lock file: {0})")]
    AlreadyRunning(Utf8PathBuf),

    #[error("Failed to resolve watch directory {path}: {source}")]
    InvalidPath {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create lock file {path}: {source}")]
    Create {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Hands out directory locks.
///
/// On Windows markers live inside the watched directory itself; everywhere
/// else they go to the system temp directory.
#[derive(Debug, Clone)]
pub struct LockManager {
    lock_dir: Option<Utf8PathBuf>,
}

impl LockManager {
    /// Lock manager using the platform default marker location.
    pub fn new() -> Self {
        Self { lock_dir: None }
    }

    /// Lock manager that keeps every marker in `lock_dir`.
    pub fn with_lock_dir(lock_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            lock_dir: Some(lock_dir.into()),
        }
    }

    /// Where the marker for `watch_dir` lives.
    pub fn lock_path(&self, watch_dir: &Utf8Path) -> Result<Utf8PathBuf, LockError> {
        let file_name = format!("{}-{}.lock", LOCK_FILE_PREFIX, directory_hash(watch_dir)?);

        let dir = match &self.lock_dir {
            Some(dir) => dir.clone(),
            None if cfg!(windows) => watch_dir.to_path_buf(),
            None => Utf8PathBuf::try_from(std::env::temp_dir())
                .unwrap_or_else(|_| Utf8PathBuf::from("/tmp")),
        };

        Ok(dir.join(file_name))
    }

    /// Take the lock for `watch_dir`.
    ///
    /// The marker is created with `create_new`, so the existence check and the
    /// creation are a single filesystem step. The payload is the process id.
    pub fn acquire(&self, watch_dir: &Utf8Path) -> Result<DirectoryLock, LockError> {
        let path = self.lock_path(watch_dir)?;

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                tracing::warn!("Lock file exists: {}", path);
                return Err(LockError::AlreadyRunning(path));
            }
            Err(source) => return Err(LockError::Create { path, source }),
        };

        if let Err(source) = write!(file, "{}", std::process::id()) {
            drop(file);
            if let Err(e) = fs::remove_file(&path) {
                tracing::error!("Failed to remove lock file {}: {}", path, e);
            }
            return Err(LockError::Create { path, source });
        }

        tracing::info!("Created lock file: {}", path);

        Ok(DirectoryLock {
            path,
            released: false,
        })
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}

/// A held directory lock. The marker is removed on [`release`](Self::release)
/// or when the value is dropped.
#[derive(Debug)]
pub struct DirectoryLock {
    path: Utf8PathBuf,
    released: bool,
}

impl DirectoryLock {
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Remove the marker. Calling this more than once is a no-op.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        match fs::remove_file(&self.path) {
            Ok(()) => tracing::info!("Removed lock file: {}", self.path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove lock file {}: {}", self.path, e),
        }
    }
}

impl Drop for DirectoryLock {
    fn drop(&mut self) {
        self.release();
    }
}

/// Absolute, lexically cleaned, lower-cased path with forward slashes.
pub fn normalize_directory_path(watch_dir: &Utf8Path) -> Result<String, LockError> {
    let absolute = std::path::absolute(watch_dir).map_err(|source| LockError::InvalidPath {
        path: watch_dir.to_path_buf(),
        source,
    })?;
    let absolute = Utf8PathBuf::try_from(absolute).map_err(|e| LockError::InvalidPath {
        path: watch_dir.to_path_buf(),
        source: e.into_io_error(),
    })?;

    let mut cleaned = Utf8PathBuf::new();
    for component in absolute.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                cleaned.pop();
            }
            other => cleaned.push(other.as_str()),
        }
    }

    Ok(cleaned.as_str().replace('\\', "/").to_lowercase())
}

/// First 8 hex characters of the MD5 digest of the normalized path.
pub fn directory_hash(watch_dir: &Utf8Path) -> Result<String, LockError> {
    let normalized = normalize_directory_path(watch_dir)?;
    let digest = md5::compute(normalized.as_bytes());
    let mut hash = format!("{:x}", digest);
    hash.truncate(8);
    Ok(hash)
}
