// Refresh watcher - advisory "folder changed" signal for the menu
//
// Runs on the debouncer's own thread and only ever sets a flag. It never
// touches files and never blocks the command loop.

use crate::services::discovery::has_pdf_extension;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{DebouncedEvent, Debouncer, RecommendedCache, new_debouncer};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Debounce window; scanners write files in bursts.
const DEBOUNCE: Duration = Duration::from_millis(500);

/// Watches the intake folder and raises a coalesced refresh flag.
pub struct RefreshWatcher {
    _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
    flag: Arc<AtomicBool>,
}

impl RefreshWatcher {
    pub fn start(dir: &Utf8Path) -> Result<Self> {
        let flag = Arc::new(AtomicBool::new(false));
        let sink = Arc::clone(&flag);

        let mut debouncer = new_debouncer(
            DEBOUNCE,
            None,
            move |result: Result<Vec<DebouncedEvent>, Vec<notify::Error>>| match result {
                Ok(events) => {
                    if events.iter().any(|event| is_refresh_event(event)) {
                        sink.store(true, Ordering::Relaxed);
                    }
                }
                Err(errors) => {
                    for error in errors {
                        tracing::warn!("Watcher error: {:?}", error);
                    }
                }
            },
        )
        .context("Failed to create file watcher")?;

        debouncer
            .watch(dir.as_std_path(), RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch directory: {}", dir))?;

        tracing::debug!("Watching {} for changes", dir);

        Ok(Self {
            _debouncer: debouncer,
            flag,
        })
    }

    /// Shared flag, set whenever a PDF appears, disappears or is renamed.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

/// Whether `event` can change the candidate list.
pub fn is_refresh_event(event: &Event) -> bool {
    let relevant_kind = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_))
    );

    relevant_kind
        && event.paths.iter().any(|path| {
            Utf8PathBuf::try_from(path.clone()).is_ok_and(|path| has_pdf_extension(&path))
        })
}
