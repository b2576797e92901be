use crate::models::{Operation, OperationKind};
use crate::services::placement::{PlacementError, move_file};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use thiserror::Error;

/// Why an undo could not be carried out.
#[derive(Error, Debug)]
pub enum UndoError {
    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Cannot undo: no output copy of {original} remains")]
    RestoreSourceMissing { original: Utf8PathBuf },

    #[error("Cannot undo merge: source files were not archived")]
    SourcesNotArchived,

    #[error("Failed to restore {original}: {source}")]
    Restore {
        original: Utf8PathBuf,
        #[source]
        source: PlacementError,
    },

    #[error("No source file could be restored: {}", .0.join("; "))]
    NothingRestored(Vec<String>),
}

/// What an undo did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoReport {
    pub kind: OperationKind,
    /// Files put back in the intake folder.
    pub restored: Vec<Utf8PathBuf>,
    /// Output and archive copies that were deleted.
    pub removed: Vec<Utf8PathBuf>,
    pub warnings: Vec<String>,
}

impl UndoReport {
    pub fn description(&self) -> String {
        let names: Vec<&str> = self.restored.iter().filter_map(|p| p.file_name()).collect();
        format!(
            "Undid {} operation: restored {} ({} copies removed)",
            self.kind,
            names.join(", "),
            self.removed.len()
        )
    }
}

/// Revert `operation` on disk. Restored files are never re-validated.
pub fn revert(operation: &Operation) -> Result<UndoReport, UndoError> {
    tracing::info!(
        "Undoing {} operation from {}",
        operation.kind,
        operation.timestamp.format("%Y-%m-%d %H:%M:%S")
    );

    match operation.kind {
        OperationKind::Single => revert_single(operation),
        OperationKind::Merge => revert_merge(operation),
    }
}

/// Move the first surviving output copy back to the original location, then
/// delete every other output copy and the archived source.
fn revert_single(operation: &Operation) -> Result<UndoReport, UndoError> {
    let Some(original) = operation.original_files.first() else {
        return Err(UndoError::NothingToUndo);
    };

    let source = operation
        .placed_outputs()
        .find(|path| path.exists())
        .ok_or_else(|| UndoError::RestoreSourceMissing {
            original: original.clone(),
        })?;

    let restored = move_file(source, original).map_err(|source| UndoError::Restore {
        original: original.clone(),
        source,
    })?;
    if &restored != original {
        tracing::warn!("Original location occupied, restored as {}", restored);
    }

    let mut report = UndoReport {
        kind: operation.kind,
        restored: vec![restored],
        removed: Vec::new(),
        warnings: Vec::new(),
    };

    let leftovers = operation
        .placed_outputs()
        .filter(|path| *path != source)
        .chain(operation.archive_files.iter());
    for path in leftovers {
        remove_copy(path, &mut report);
    }

    Ok(report)
}

/// Move the archived sources back, best effort, then delete the merged outputs.
fn revert_merge(operation: &Operation) -> Result<UndoReport, UndoError> {
    if operation.archive_files.is_empty() {
        return Err(UndoError::SourcesNotArchived);
    }

    let mut report = UndoReport {
        kind: operation.kind,
        restored: Vec::new(),
        removed: Vec::new(),
        warnings: Vec::new(),
    };

    for (archived, original) in operation.archive_files.iter().zip(&operation.original_files) {
        match move_file(archived, original) {
            Ok(restored) => {
                tracing::info!("Restored {} -> {}", archived, restored);
                report.restored.push(restored);
            }
            Err(e) => {
                tracing::warn!("Failed to restore {}: {}", archived, e);
                report.warnings.push(format!("Failed to restore {}: {}", archived, e));
            }
        }
    }

    if report.restored.is_empty() {
        return Err(UndoError::NothingRestored(report.warnings));
    }

    for path in operation.placed_outputs() {
        remove_copy(path, &mut report);
    }

    Ok(report)
}

fn remove_copy(path: &Utf8Path, report: &mut UndoReport) {
    if !path.exists() {
        return;
    }
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!("Removed {}", path);
            report.removed.push(path.to_path_buf());
        }
        Err(e) => {
            tracing::warn!("Failed to remove {}: {}", path, e);
            report.warnings.push(format!("Failed to remove {}: {}", path, e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_utf8() -> (TempDir, Utf8PathBuf) {
        let temp = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
        (temp, path)
    }

    fn write(path: &Utf8Path, content: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_single_restores_and_cleans_up() {
        let (_temp, dir) = temp_utf8();
        let outputs = vec![dir.join("out/a"), dir.join("out/b")];
        write(&outputs[0].join("scan.pdf"), b"pdf");
        write(&outputs[1].join("scan.pdf"), b"pdf");
        write(&dir.join("archive/scan.pdf"), b"pdf");

        let op = Operation::single(
            dir.join("scan.pdf"),
            vec![Some(outputs[0].join("scan.pdf")), Some(outputs[1].join("scan.pdf"))],
            outputs.clone(),
            vec![dir.join("archive/scan.pdf")],
        );

        let report = revert(&op).unwrap();

        assert_eq!(report.restored, vec![dir.join("scan.pdf")]);
        assert_eq!(report.removed.len(), 2);
        assert!(dir.join("scan.pdf").exists());
        assert!(!outputs[0].join("scan.pdf").exists());
        assert!(!outputs[1].join("scan.pdf").exists());
        assert!(!dir.join("archive/scan.pdf").exists());
    }

    #[test]
    fn test_single_skips_missing_and_failed_slots() {
        let (_temp, dir) = temp_utf8();
        let outputs = vec![dir.join("out/a"), dir.join("out/b"), dir.join("out/c")];
        // Slot a failed at placement time, slot b was deleted by hand since
        write(&outputs[2].join("scan.pdf"), b"pdf");

        let op = Operation::single(
            dir.join("scan.pdf"),
            vec![None, Some(outputs[1].join("scan.pdf")), Some(outputs[2].join("scan.pdf"))],
            outputs,
            Vec::new(),
        );

        let report = revert(&op).unwrap();
        assert_eq!(report.restored, vec![dir.join("scan.pdf")]);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_single_restore_never_overwrites() {
        let (_temp, dir) = temp_utf8();
        write(&dir.join("scan.pdf"), b"newer");
        write(&dir.join("out/scan.pdf"), b"older");

        let op = Operation::single(
            dir.join("scan.pdf"),
            vec![Some(dir.join("out/scan.pdf"))],
            vec![dir.join("out")],
            Vec::new(),
        );

        let report = revert(&op).unwrap();

        assert_eq!(report.restored, vec![dir.join("scan_1.pdf")]);
        assert_eq!(fs::read(dir.join("scan.pdf")).unwrap(), b"newer");
    }

    #[test]
    fn test_merge_without_archive_is_refused() {
        let (_temp, dir) = temp_utf8();
        write(&dir.join("out/a-b.pdf"), b"merged");

        let op = Operation::merge(
            dir.join("a.pdf"),
            dir.join("b.pdf"),
            vec![Some(dir.join("out/a-b.pdf"))],
            vec![dir.join("out")],
            Vec::new(),
        );

        assert!(matches!(revert(&op), Err(UndoError::SourcesNotArchived)));
        assert!(dir.join("out/a-b.pdf").exists());
    }

    #[test]
    fn test_merge_best_effort() {
        let (_temp, dir) = temp_utf8();
        write(&dir.join("archive/a.pdf"), b"a");
        // archive/b.pdf is gone
        write(&dir.join("out/a-b.pdf"), b"merged");

        let op = Operation::merge(
            dir.join("a.pdf"),
            dir.join("b.pdf"),
            vec![Some(dir.join("out/a-b.pdf"))],
            vec![dir.join("out")],
            vec![dir.join("archive/a.pdf"), dir.join("archive/b.pdf")],
        );

        let report = revert(&op).unwrap();

        assert_eq!(report.restored, vec![dir.join("a.pdf")]);
        assert_eq!(report.warnings.len(), 1);
        assert!(!dir.join("out/a-b.pdf").exists());
    }

    #[test]
    fn test_merge_nothing_restored_keeps_outputs() {
        let (_temp, dir) = temp_utf8();
        write(&dir.join("out/a-b.pdf"), b"merged");

        let op = Operation::merge(
            dir.join("a.pdf"),
            dir.join("b.pdf"),
            vec![Some(dir.join("out/a-b.pdf"))],
            vec![dir.join("out")],
            vec![dir.join("archive/a.pdf"), dir.join("archive/b.pdf")],
        );

        assert!(matches!(revert(&op), Err(UndoError::NothingRestored(_))));
        assert!(dir.join("out/a-b.pdf").exists());
    }
}
