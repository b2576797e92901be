// Menu Controller - single-threaded command loop over FileOps
//
// This module contains the MenuController which coordinates between:
// - The terminal (any AsyncBufRead input, any Write output)
// - FileOps (the Session in production)
// - The refresh flag raised by the folder watcher
// - The log level handle for the runtime debug toggle
//
// One command runs to completion before the next line is read. The only
// things that can end the loop besides Q are end of input, Ctrl-C, SIGTERM
// and the idle timeout.

use crate::logging::LogLevelHandle;
use crate::services::{ProcessError, ProcessOutcome};
use crate::state::UndoError;
use crate::ui::bridge::FileOps;
use anyhow::{Context, Result};
use crossterm::style::{Color, Stylize};
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// How many candidates the verbose preview lists.
const PREVIEW_LIMIT: usize = 5;

/// Why the command loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Quit,
    EndOfInput,
    Interrupted,
    IdleTimeout,
}

/// Display and loop settings.
#[derive(Debug, Clone, Default)]
pub struct MenuOptions {
    pub verbose: bool,
    pub debug: bool,
    /// `None` waits for input forever.
    pub idle_timeout: Option<Duration>,
    /// Emit ANSI colors.
    pub color: bool,
}

/// Interactive menu driving a [`FileOps`] implementation.
///
/// # Example
/// ```ignore
/// let mut controller = MenuController::new(session, options)
///     .with_refresh_flag(watcher.flag());
/// let stdin = tokio::io::BufReader::new(tokio::io::stdin());
/// let reason = controller.run(stdin, &mut std::io::stdout()).await?;
/// ```
pub struct MenuController<F: FileOps> {
    ops: F,
    options: MenuOptions,
    refresh: Option<Arc<AtomicBool>>,
    log_level: Option<LogLevelHandle>,
}

impl<F: FileOps> MenuController<F> {
    pub fn new(ops: F, options: MenuOptions) -> Self {
        Self {
            ops,
            options,
            refresh: None,
            log_level: None,
        }
    }

    /// Consume `flag` on every redraw and mention when it was set.
    pub fn with_refresh_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.refresh = Some(flag);
        self
    }

    pub fn with_log_level(mut self, handle: LogLevelHandle) -> Self {
        self.log_level = Some(handle);
        self
    }

    pub fn ops(&self) -> &F {
        &self.ops
    }

    pub fn options(&self) -> &MenuOptions {
        &self.options
    }

    /// Run the menu until quit, end of input, Ctrl-C, SIGTERM or idle timeout.
    pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> Result<ExitReason>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();
        let mut interrupt = std::pin::pin!(tokio::signal::ctrl_c());
        let mut interrupts_enabled = true;
        let mut terminate = std::pin::pin!(terminate_signal());
        let mut terminate_enabled = true;

        tracing::info!("Menu started");

        loop {
            self.render_status(out)?;
            out.flush()?;

            let idle_timeout = self.options.idle_timeout;
            let line = tokio::select! {
                line = lines.next_line() => line.context("Failed to read input")?,
                result = &mut interrupt, if interrupts_enabled => {
                    match result {
                        Ok(()) => {
                            writeln!(out, "\n{}", self.paint("Shutting down gracefully...", Color::Yellow))?;
                            tracing::info!("Interrupted by user");
                            return Ok(ExitReason::Interrupted);
                        }
                        Err(e) => {
                            tracing::warn!("Ctrl-C handler unavailable: {}", e);
                            interrupts_enabled = false;
                            continue;
                        }
                    }
                }
                result = &mut terminate, if terminate_enabled => {
                    match result {
                        Ok(()) => {
                            writeln!(out, "\n{}", self.paint("Terminated, shutting down...", Color::Yellow))?;
                            tracing::info!("Termination signal received");
                            return Ok(ExitReason::Interrupted);
                        }
                        Err(e) => {
                            tracing::warn!("Termination handler unavailable: {}", e);
                            terminate_enabled = false;
                            continue;
                        }
                    }
                }
                _ = tokio::time::sleep(idle_timeout.unwrap_or_default()), if idle_timeout.is_some() => {
                    let secs = idle_timeout.map(|t| t.as_secs()).unwrap_or_default();
                    writeln!(
                        out,
                        "\n{}",
                        self.paint(&format!("No input for {}s. Exiting...", secs), Color::Yellow)
                    )?;
                    tracing::info!("Idle timeout after {}s", secs);
                    return Ok(ExitReason::IdleTimeout);
                }
            };

            let Some(line) = line else {
                writeln!(out, "\n{}", self.paint("End of input reached. Exiting...", Color::Yellow))?;
                return Ok(ExitReason::EndOfInput);
            };

            let choice = line.trim().to_uppercase();
            if choice.is_empty() {
                continue;
            }

            if let Some(reason) = self.dispatch(&choice, out)? {
                return Ok(reason);
            }
        }
    }

    /// Execute one menu choice. Returns the exit reason when the loop should end.
    fn dispatch<W: Write>(&mut self, choice: &str, out: &mut W) -> Result<Option<ExitReason>> {
        tracing::debug!("Menu choice: {}", choice);

        match choice {
            "S" => {
                let result = self.ops.process_single();
                self.report_process(result, out)?;
            }
            "M" => {
                let result = self.ops.process_merge();
                self.report_process(result, out)?;
            }
            "U" => self.undo(out)?,
            "A" => {
                let on = self.ops.toggle_archive_mode();
                self.success(out, &format!("Archive mode: {}", on_off(on)))?;
            }
            "V" => {
                self.options.verbose = !self.options.verbose;
                if !self.options.verbose && self.options.debug {
                    self.set_debug(false);
                }
                self.success(out, &format!("Verbose mode: {}", on_off(self.options.verbose)))?;
            }
            "D" => {
                let debug = !self.options.debug;
                self.set_debug(debug);
                if debug {
                    self.options.verbose = true;
                }
                self.success(out, &format!("Debug mode: {}", on_off(debug)))?;
            }
            "H" => self.print_help(out)?,
            "Q" => {
                writeln!(out, "{}", self.paint("Exiting program...", Color::Yellow))?;
                return Ok(Some(ExitReason::Quit));
            }
            _ => self.warning(out, "Invalid choice. Please enter S, M, U, A, H, V, D, or Q.")?,
        }

        Ok(None)
    }

    fn set_debug(&mut self, debug: bool) {
        self.options.debug = debug;
        if let Some(handle) = &self.log_level {
            if let Err(e) = handle.set_debug(debug) {
                tracing::warn!("{:#}", e);
            }
        }
    }

    fn report_process<W: Write>(
        &self,
        result: Result<ProcessOutcome, ProcessError>,
        out: &mut W,
    ) -> Result<()> {
        match result {
            Ok(outcome) => {
                self.success(out, &outcome.description)?;
                for warning in &outcome.warnings {
                    self.warning(out, warning)?;
                }
            }
            Err(e) if !e.is_failure() => self.warning(out, &e.to_string())?,
            Err(e) => {
                self.error(out, &e.to_string())?;
                writeln!(out, "Check the error folder: {}", self.ops.directories().error)?;
            }
        }
        Ok(())
    }

    fn undo<W: Write>(&mut self, out: &mut W) -> Result<()> {
        match self.ops.undo() {
            Ok(report) => {
                self.success(out, &report.description())?;
                for warning in &report.warnings {
                    self.warning(out, warning)?;
                }
            }
            Err(UndoError::NothingToUndo) => self.warning(out, "No operation to undo")?,
            Err(e) => self.error(out, &e.to_string())?,
        }
        Ok(())
    }

    fn render_status<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out)?;

        let changed = self
            .refresh
            .as_ref()
            .is_some_and(|flag| flag.swap(false, Ordering::Relaxed));
        if changed {
            writeln!(out, "{}", self.paint("Folder contents changed", Color::DarkGrey))?;
        }

        let dirs = self.ops.directories();
        let output_count: usize = dirs
            .outputs
            .iter()
            .map(|dir| self.ops.count_candidates(dir))
            .sum();
        writeln!(
            out,
            "Files: Main({}) Archive({}) Output({}) Error({})",
            self.ops.count_candidates(&dirs.main),
            self.ops.count_candidates(&dirs.archive),
            output_count,
            self.ops.count_candidates(&dirs.error)
        )?;

        if self.options.verbose {
            self.render_preview(out)?;
        }

        writeln!(
            out,
            "Options: {}ingle, {}erge, {}ndo, {}rchive:{}, {}elp, {}erbose, {}ebug, {}uit",
            self.key("S"),
            self.key("M"),
            self.key("U"),
            self.key("A"),
            on_off(self.ops.archive_mode()),
            self.key("H"),
            self.key("V"),
            self.key("D"),
            self.key("Q"),
        )?;
        write!(out, "Enter choice (S/M/U/A/H/V/D/Q): ")?;
        Ok(())
    }

    fn render_preview<W: Write>(&self, out: &mut W) -> Result<()> {
        let candidates = match self.ops.find_candidates() {
            Ok(candidates) => candidates,
            Err(e) => return self.warning(out, &format!("{:#}", e)),
        };

        for (index, file) in candidates.iter().take(PREVIEW_LIMIT).enumerate() {
            writeln!(
                out,
                "  {}. {} ({})",
                index + 1,
                file.name,
                self.ops.human_size(&file.path)
            )?;
        }
        if candidates.len() > PREVIEW_LIMIT {
            writeln!(out, "  ... and {} more", candidates.len() - PREVIEW_LIMIT)?;
        }
        Ok(())
    }

    pub fn print_help<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "Interactive options:")?;
        writeln!(out, "  S - Move a single PDF file to the output directories")?;
        writeln!(out, "  M - Merge two PDF files (first file + reversed second file)")?;
        writeln!(out, "  U - Undo the last operation")?;
        writeln!(out, "  A - Toggle archive mode")?;
        writeln!(out, "  H - Show this help information")?;
        writeln!(out, "  V - Toggle verbose mode")?;
        writeln!(out, "  D - Toggle debug mode")?;
        writeln!(out, "  Q - Quit the program")?;
        Ok(())
    }

    /// Session summary shown on exit.
    pub fn print_summary<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "\n=== Session Summary ===")?;
        for line in self.ops.stats().summary_lines() {
            writeln!(out, "{}", line)?;
        }
        self.ops.stats().log_summary();
        Ok(())
    }

    fn success<W: Write>(&self, out: &mut W, message: &str) -> Result<()> {
        writeln!(out, "{}", self.paint(message, Color::Green))?;
        Ok(())
    }

    fn warning<W: Write>(&self, out: &mut W, message: &str) -> Result<()> {
        writeln!(out, "{}", self.paint(&format!("Warning: {}", message), Color::Yellow))?;
        Ok(())
    }

    fn error<W: Write>(&self, out: &mut W, message: &str) -> Result<()> {
        writeln!(out, "{}", self.paint(&format!("Error: {}", message), Color::Red))?;
        Ok(())
    }

    fn key(&self, key: &str) -> String {
        self.paint(&format!("[{}]", key), Color::Yellow)
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.options.color {
            text.with(color).to_string()
        } else {
            text.to_string()
        }
    }
}

fn on_off(value: bool) -> &'static str {
    if value { "ON" } else { "OFF" }
}

/// Resolves on SIGTERM. Never resolves where there is no such signal.
#[cfg(unix)]
async fn terminate_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut stream = signal(SignalKind::terminate())?;
    stream.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn terminate_signal() -> std::io::Result<()> {
    std::future::pending().await
}
