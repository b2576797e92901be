// Session metrics module
//
// Counts successful and failed operations for the end-of-session summary

use std::time::{Duration, Instant};

/// Process-lifetime counters.
///
/// Only the command loop updates these, so plain fields are enough. Counters
/// only ever go up; a restart is the only reset.
#[derive(Debug)]
pub struct SessionStats {
    /// Operations that completed (partial output placement included)
    pub success_count: usize,

    /// Failed operations; a failed merge counts once, not per file
    pub error_count: usize,

    start_time: Instant,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            success_count: 0,
            error_count: 0,
            start_time: Instant::now(),
        }
    }

    pub fn record_success(&mut self) {
        self.success_count += 1;
    }

    pub fn record_error(&mut self) {
        self.error_count += 1;
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Summary lines shown on exit
    pub fn summary_lines(&self) -> Vec<String> {
        vec![
            format!("Successful operations: {}", self.success_count),
            format!("Errors: {}", self.error_count),
            format!("Session time: {}", format_elapsed(self.uptime())),
        ]
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!("=== Session Summary ===");
        for line in self.summary_lines() {
            tracing::info!("{}", line);
        }
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// `Xm Ys` from one minute up, `Ys` below.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}
