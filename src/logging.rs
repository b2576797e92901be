use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{
    EnvFilter, Registry, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

/// Prefix of the daily log files, e.g. `blendpdf.2026-10-19`.
pub const LOG_FILE_PREFIX: &str = "blendpdf";

/// Lets the menu switch between info and debug level at runtime.
#[derive(Clone)]
pub struct LogLevelHandle {
    handle: reload::Handle<EnvFilter, Registry>,
}

impl LogLevelHandle {
    pub fn set_debug(&self, debug_mode: bool) -> Result<()> {
        self.handle
            .reload(EnvFilter::new(level_for(debug_mode)))
            .context("Failed to change log level")?;
        tracing::info!("Log level changed: debug={}", debug_mode);
        Ok(())
    }
}

/// Keeps logging alive. Dropping it flushes and stops the file writer, so it
/// must be held for the duration of the program.
pub struct LoggingGuard {
    _worker: WorkerGuard,
    pub level: LogLevelHandle,
}

fn level_for(debug_mode: bool) -> &'static str {
    if debug_mode { "debug" } else { "info" }
}

/// Setup logging with a rotating file appender and optional console output.
///
/// Logs are written to `log_dir` with daily rotation. With `console_output`
/// the same events also go to stderr, which keeps them apart from the menu
/// on stdout.
///
/// # Arguments
/// * `log_dir` - Directory for log files (e.g., `<watch folder>/logs`)
/// * `log_prefix` - Prefix for log files (e.g., "blendpdf")
/// * `debug_mode` - If true, use debug level; otherwise use info level
/// * `console_output` - If true, also log to stderr
pub fn setup_logging(
    log_dir: &Utf8Path,
    log_prefix: &str,
    debug_mode: bool,
    console_output: bool,
) -> Result<LoggingGuard> {
    // Create log directory if it doesn't exist
    if !log_dir.exists() {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir))?;
    }

    // Create daily rotating file appender
    let file_appender = rolling::daily(log_dir, log_prefix);
    let (non_blocking, worker) = tracing_appender::non_blocking(file_appender);

    let (env_filter, handle) = reload::Layer::new(EnvFilter::new(level_for(debug_mode)));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false) // No ANSI codes in log files
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let console_layer = console_output.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!(
        "Logging initialized: dir={}, prefix={}, debug={}, console={}",
        log_dir,
        log_prefix,
        debug_mode,
        console_output
    );

    Ok(LoggingGuard {
        _worker: worker,
        level: LogLevelHandle { handle },
    })
}
