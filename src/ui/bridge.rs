// FileOps - the capability set the interactive shell drives
//
// The menu never touches the services directly. It talks to this trait,
// which the Session implements, so the shell can be exercised against any
// implementation without rebinding anything at runtime.

use crate::metrics::SessionStats;
use crate::models::{CandidateFile, WatchedDirectorySet};
use crate::services::{ProcessError, ProcessOutcome};
use crate::state::{UndoError, UndoReport};
use anyhow::Result;
use camino::Utf8Path;

/// Operations exposed to the menu.
///
/// # Related Types
///
/// - [`crate::session::Session`]: The implementation used by the binary
/// - [`crate::ui::controller::MenuController`]: The consumer
pub trait FileOps {
    /// PDFs in the intake folder, in processing order.
    fn find_candidates(&self) -> Result<Vec<CandidateFile>>;

    /// Number of PDFs in any directory, zero when it cannot be read.
    fn count_candidates(&self, dir: &Utf8Path) -> usize;

    fn human_size(&self, path: &Utf8Path) -> String;

    /// Process the first candidate on its own.
    fn process_single(&mut self) -> Result<ProcessOutcome, ProcessError>;

    /// Merge the first two candidates.
    fn process_merge(&mut self) -> Result<ProcessOutcome, ProcessError>;

    /// Revert the last successful operation.
    fn undo(&mut self) -> Result<UndoReport, UndoError>;

    /// Flip archive mode for this session and return the new value.
    fn toggle_archive_mode(&mut self) -> bool;

    fn archive_mode(&self) -> bool;

    fn directories(&self) -> &WatchedDirectorySet;

    fn stats(&self) -> &SessionStats;
}
