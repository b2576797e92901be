use camino::Utf8PathBuf;
use chrono::{DateTime, Local};
use std::fmt;

/// What kind of processing produced an [`Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Single,
    Merge,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Single => write!(f, "single"),
            OperationKind::Merge => write!(f, "merge"),
        }
    }
}

/// The last reversible piece of work, as needed by undo.
///
/// `actual_files` has exactly one slot per entry of `output_folders`; a slot is
/// `None` when placement into that folder failed. `archive_files` holds the
/// archived sources in the same order as `original_files`, and is empty when
/// archive mode was off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub kind: OperationKind,
    pub original_files: Vec<Utf8PathBuf>,
    pub actual_files: Vec<Option<Utf8PathBuf>>,
    pub output_folders: Vec<Utf8PathBuf>,
    pub archive_files: Vec<Utf8PathBuf>,
    pub timestamp: DateTime<Local>,
}

impl Operation {
    pub fn single(
        original: Utf8PathBuf,
        actual_files: Vec<Option<Utf8PathBuf>>,
        output_folders: Vec<Utf8PathBuf>,
        archive_files: Vec<Utf8PathBuf>,
    ) -> Self {
        Self {
            kind: OperationKind::Single,
            original_files: vec![original],
            actual_files,
            output_folders,
            archive_files,
            timestamp: Local::now(),
        }
    }

    pub fn merge(
        first: Utf8PathBuf,
        second: Utf8PathBuf,
        actual_files: Vec<Option<Utf8PathBuf>>,
        output_folders: Vec<Utf8PathBuf>,
        archive_files: Vec<Utf8PathBuf>,
    ) -> Self {
        Self {
            kind: OperationKind::Merge,
            original_files: vec![first, second],
            actual_files,
            output_folders,
            archive_files,
            timestamp: Local::now(),
        }
    }

    /// Output files that were actually written, skipping failed slots.
    pub fn placed_outputs(&self) -> impl Iterator<Item = &Utf8PathBuf> {
        self.actual_files.iter().flatten()
    }
}
