// Session - the explicit context for one watch folder
//
// Owns the directory set, the archive toggle, the PDF engine, the undo slot
// and the counters, and exposes them to the menu through FileOps.

use crate::metrics::SessionStats;
use crate::models::{CandidateFile, WatchedDirectorySet};
use crate::services::{
    self, MergeOrchestrator, PdfEngine, ProcessContext, ProcessError, ProcessOutcome,
};
use crate::state::{OperationTracker, UndoError, UndoReport};
use crate::ui::bridge::FileOps;
use anyhow::Result;
use camino::Utf8Path;

/// State of one running session.
///
/// Everything the workflow mutates lives here rather than in globals, so a
/// test can build a session over a temporary directory and drive it directly.
pub struct Session<E: PdfEngine> {
    dirs: WatchedDirectorySet,
    archive_mode: bool,
    engine: E,
    tracker: OperationTracker,
    stats: SessionStats,
}

impl<E: PdfEngine> Session<E> {
    /// The directories must already be prepared.
    pub fn new(dirs: WatchedDirectorySet, archive_mode: bool, engine: E) -> Self {
        tracing::info!(
            "Session started: main={}, outputs={}, archive_mode={}",
            dirs.main,
            dirs.outputs.len(),
            archive_mode
        );

        Self {
            dirs,
            archive_mode,
            engine,
            tracker: OperationTracker::new(),
            stats: SessionStats::new(),
        }
    }

    pub fn tracker(&self) -> &OperationTracker {
        &self.tracker
    }

    fn context(&self) -> ProcessContext<'_, E> {
        ProcessContext {
            engine: &self.engine,
            dirs: &self.dirs,
            archive_mode: self.archive_mode,
        }
    }

    /// Count the result and remember the operation for undo.
    fn finish(
        &mut self,
        result: Result<ProcessOutcome, ProcessError>,
    ) -> Result<ProcessOutcome, ProcessError> {
        match &result {
            Ok(outcome) => {
                self.stats.record_success();
                self.tracker.record(outcome.operation.clone());
            }
            Err(e) if e.is_failure() => self.stats.record_error(),
            Err(_) => {}
        }
        result
    }
}

impl<E: PdfEngine> FileOps for Session<E> {
    fn find_candidates(&self) -> Result<Vec<CandidateFile>> {
        services::list_candidates(&self.dirs.main)
    }

    fn count_candidates(&self, dir: &Utf8Path) -> usize {
        services::count_candidates(dir)
    }

    fn human_size(&self, path: &Utf8Path) -> String {
        services::human_size(path)
    }

    fn process_single(&mut self) -> Result<ProcessOutcome, ProcessError> {
        let result = services::process_single_file(&self.context());
        self.finish(result)
    }

    fn process_merge(&mut self) -> Result<ProcessOutcome, ProcessError> {
        let result = MergeOrchestrator::new(self.context()).merge_first_available();
        self.finish(result)
    }

    fn undo(&mut self) -> Result<UndoReport, UndoError> {
        self.tracker.undo()
    }

    fn toggle_archive_mode(&mut self) -> bool {
        self.archive_mode = !self.archive_mode;
        tracing::info!("Archive mode: {}", if self.archive_mode { "ON" } else { "OFF" });
        self.archive_mode
    }

    fn archive_mode(&self) -> bool {
        self.archive_mode
    }

    fn directories(&self) -> &WatchedDirectorySet {
        &self.dirs
    }

    fn stats(&self) -> &SessionStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::pdf::{MockPdfEngine, PdfError};
    use camino::Utf8PathBuf;
    use std::fs;
    use tempfile::TempDir;

    fn session(engine: MockPdfEngine) -> (TempDir, Session<MockPdfEngine>) {
        let temp = TempDir::new().unwrap();
        let main = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
        let dirs = WatchedDirectorySet::new(main, &["output".to_string()]);
        dirs.prepare().unwrap();
        (temp, Session::new(dirs, true, engine))
    }

    #[test]
    fn test_counters_and_undo_slot() {
        let mut engine = MockPdfEngine::new();
        engine.expect_validate().returning(|_| Ok(()));
        let (_temp, mut session) = session(engine);
        fs::write(session.directories().main.join("a.pdf"), b"%PDF").unwrap();

        session.process_single().unwrap();
        assert_eq!(session.stats().success_count, 1);
        assert!(session.tracker().has_pending());

        // Nothing left: idle, not an error
        assert!(matches!(session.process_single(), Err(ProcessError::NoFiles)));
        assert_eq!(session.stats().error_count, 0);

        session.undo().unwrap();
        assert!(!session.tracker().has_pending());
        assert!(session.directories().main.join("a.pdf").exists());
    }

    #[test]
    fn test_failure_counts_once_and_records_nothing() {
        let mut engine = MockPdfEngine::new();
        engine.expect_validate().returning(|_| Ok(()));
        engine.expect_page_count().returning(|p| {
            if p.as_str().ends_with("a.pdf") { Ok(2) } else { Err(PdfError::NoPages(p.to_path_buf())) }
        });
        let (_temp, mut session) = session(engine);
        fs::write(session.directories().main.join("a.pdf"), b"%PDF").unwrap();
        fs::write(session.directories().main.join("b.pdf"), b"%PDF").unwrap();

        assert!(session.process_merge().is_err());

        assert_eq!(session.stats().error_count, 1);
        assert_eq!(session.stats().success_count, 0);
        assert!(!session.tracker().has_pending());
    }

    #[test]
    fn test_toggle_archive_mode() {
        let (_temp, mut session) = session(MockPdfEngine::new());
        assert!(session.archive_mode());
        assert!(!session.toggle_archive_mode());
        assert!(session.toggle_archive_mode());
    }
}
