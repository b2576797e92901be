//! Final disposal of source files once an operation has succeeded or failed.
//!
//! Routing problems are collected as warnings. They never trigger another
//! round of error routing.

use crate::services::placement::place;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Where routed sources ended up, plus anything that went wrong on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Routed {
    pub placed: Vec<Utf8PathBuf>,
    pub warnings: Vec<String>,
}

impl Routed {
    pub fn is_complete(&self, expected: usize) -> bool {
        self.warnings.is_empty() && self.placed.len() == expected
    }
}

/// Dispose of successfully processed sources.
///
/// With archive mode on, each source is moved into `archive_dir` and the
/// archived paths are returned in source order. With archive mode off the
/// sources are deleted and `placed` stays empty.
pub fn route_success(files: &[Utf8PathBuf], archive_dir: &Utf8Path, archive_mode: bool) -> Routed {
    let mut routed = Routed::default();

    for file in files {
        if archive_mode {
            match place(file, archive_dir) {
                Ok(archived) => {
                    tracing::info!("Archived: {}", archived);
                    routed.placed.push(archived);
                }
                Err(e) => {
                    tracing::warn!("Failed to archive {}: {}", file, e);
                    routed.warnings.push(format!("Failed to archive {}: {}", file, e));
                }
            }
        } else {
            match fs::remove_file(file) {
                Ok(()) => tracing::info!("Deleted source (archive mode off): {}", file),
                Err(e) => {
                    tracing::warn!("Failed to delete {}: {}", file, e);
                    routed.warnings.push(format!("Failed to delete {}: {}", file, e));
                }
            }
        }
    }

    routed
}

/// Move every implicated source into `error_dir`.
///
/// The caller counts the failed operation once, however many files are routed.
pub fn route_failure(files: &[Utf8PathBuf], error_dir: &Utf8Path) -> Routed {
    let mut routed = Routed::default();

    for file in files {
        match place(file, error_dir) {
            Ok(moved) => {
                tracing::info!("Moved to error folder: {}", moved);
                routed.placed.push(moved);
            }
            Err(e) => {
                tracing::error!("Failed to move {} to error folder: {}", file, e);
                routed
                    .warnings
                    .push(format!("Failed to move {} to error folder: {}", file, e));
            }
        }
    }

    routed
}
