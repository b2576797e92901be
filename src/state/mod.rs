// Operation tracking module
//
// This module provides the OperationTracker which owns the single pending
// Operation and hands it to the undo logic in `undo.rs`.

pub mod undo;

pub use undo::{UndoError, UndoReport};

use crate::models::Operation;

/// Holder for the last reversible operation.
///
/// Undo history is exactly one entry deep: recording a new operation discards
/// the previous one, and a successful undo clears the slot.
///
/// # Usage
///
/// - [`record()`](Self::record) after every successful single-file or merge run
/// - [`undo()`](Self::undo) to revert it, at most once
/// - [`peek()`](Self::peek) to show what would be undone
///
/// The tracker is owned by [`crate::session::Session`] and only touched from
/// the command loop, so it needs no locking.
#[derive(Debug, Default)]
pub struct OperationTracker {
    last: Option<Operation>,
}

impl OperationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `operation`, replacing any earlier one.
    pub fn record(&mut self, operation: Operation) {
        if let Some(previous) = &self.last {
            tracing::debug!(
                "Discarding undo record for {} operation from {}",
                previous.kind,
                previous.timestamp.format("%H:%M:%S")
            );
        }
        tracing::debug!(
            "Recorded {} operation: {:?}",
            operation.kind,
            operation.original_files
        );
        self.last = Some(operation);
    }

    pub fn peek(&self) -> Option<&Operation> {
        self.last.as_ref()
    }

    pub fn has_pending(&self) -> bool {
        self.last.is_some()
    }

    /// Remove and return the pending operation.
    pub fn take(&mut self) -> Option<Operation> {
        self.last.take()
    }

    /// Revert the pending operation.
    ///
    /// The slot is cleared when the undo succeeds, fully or best-effort. When
    /// it fails outright the operation stays pending so the user can fix the
    /// problem and try again.
    pub fn undo(&mut self) -> Result<UndoReport, UndoError> {
        let operation = self.take().ok_or(UndoError::NothingToUndo)?;

        match undo::revert(&operation) {
            Ok(report) => Ok(report),
            Err(e) => {
                tracing::warn!("Undo failed, keeping operation: {}", e);
                self.last = Some(operation);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    fn op(name: &str) -> Operation {
        Operation::single(
            Utf8PathBuf::from(format!("/scans/{}", name)),
            vec![None],
            vec![Utf8PathBuf::from("/scans/output")],
            Vec::new(),
        )
    }

    #[test]
    fn test_new_tracker_is_empty() {
        let mut tracker = OperationTracker::new();
        assert!(!tracker.has_pending());
        assert!(matches!(tracker.undo(), Err(UndoError::NothingToUndo)));
    }

    #[test]
    fn test_record_replaces_previous() {
        let mut tracker = OperationTracker::new();
        tracker.record(op("first.pdf"));
        tracker.record(op("second.pdf"));

        let pending = tracker.peek().unwrap();
        assert_eq!(pending.original_files, vec![Utf8PathBuf::from("/scans/second.pdf")]);

        assert!(tracker.take().is_some());
        assert!(tracker.take().is_none());
    }

    #[test]
    fn test_failed_undo_keeps_operation() {
        let mut tracker = OperationTracker::new();
        // No output slot was ever written, so there is nothing to restore from
        tracker.record(op("ghost.pdf"));

        assert!(matches!(
            tracker.undo(),
            Err(UndoError::RestoreSourceMissing { .. })
        ));
        assert!(tracker.has_pending());
    }
}
