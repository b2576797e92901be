//! BlendPDF - watch a folder for scanned PDFs and merge duplex scan pairs
//!
//! Main entry point for the interactive terminal application.
//!
//! # Execution Flow
//!
//! 1. Parse the command line and resolve the watch folder to an absolute path
//! 2. Take the per-folder lock (exit code 6 when another instance holds it,
//!    before anything in the folder is touched)
//! 3. Load settings (defaults → `blendpdf.yaml`/`blendpdf.json` → `BLENDPDF_*` → flags)
//! 4. Initialize logging → `<watch folder>/logs/blendpdf.<date>`
//! 5. Create and check archive/, error/ and every output folder
//! 6. Start the refresh watcher (advisory, a failure only warns)
//! 7. Run the menu on a current-thread tokio runtime until quit, EOF, Ctrl-C,
//!    SIGTERM or idle timeout
//! 8. Print the session summary and release the lock
//!
//! # Exit codes
//!
//! - `0`: clean exit
//! - `1`: startup failure
//! - `6`: another instance is already watching the folder

use anyhow::{Context, Result};
use blendpdf::cli::Cli;
use blendpdf::logging::{LOG_FILE_PREFIX, setup_logging};
use blendpdf::services::LockError;
use blendpdf::ui::{FileOps, MenuController, RefreshWatcher};
use blendpdf::{APP_NAME, App, LockManager, VERSION};
use clap::Parser;
use std::io::IsTerminal;
use std::process::ExitCode;

const EXIT_STARTUP_FAILURE: u8 = 1;
const EXIT_ALREADY_RUNNING: u8 = 6;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            tracing::error!("Startup failed: {:#}", e);

            let already_running = e
                .downcast_ref::<LockError>()
                .is_some_and(|e| matches!(e, LockError::AlreadyRunning(_)));

            if already_running {
                ExitCode::from(EXIT_ALREADY_RUNNING)
            } else {
                ExitCode::from(EXIT_STARTUP_FAILURE)
            }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let app = App::start(&cli, &LockManager::new())?;
    let watch_dir = app.watch_dir().to_path_buf();
    let debug_mode = app.settings().debug_mode;

    // Held until the end of run(); dropping it flushes the file writer
    let logging = setup_logging(&watch_dir.join("logs"), LOG_FILE_PREFIX, debug_mode, debug_mode)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);
    tracing::info!("Watch folder: {} (lock: {})", watch_dir, app.lock_path());

    let session = app.session()?;

    let mut stdout = std::io::stdout();
    let color = stdout.is_terminal();

    println!("{} v{}", APP_NAME, VERSION);
    println!("Watching: {}", watch_dir);
    for output in &session.directories().outputs {
        println!("Output:   {}", output);
    }
    println!(
        "Archive mode: {}",
        if app.settings().archive_mode { "ON" } else { "OFF" }
    );

    let mut controller =
        MenuController::new(session, app.menu_options(color)).with_log_level(logging.level.clone());

    // Keep the watcher alive for the whole menu loop
    let watcher = match RefreshWatcher::start(&watch_dir) {
        Ok(watcher) => {
            controller = controller.with_refresh_flag(watcher.flag());
            Some(watcher)
        }
        Err(e) => {
            tracing::warn!("Folder watcher unavailable: {:#}", e);
            None
        }
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(async {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        app.run_menu(&mut controller, stdin, &mut stdout).await
    })?;

    drop(watcher);
    // Stdin may still be blocked in a reader thread; don't wait for it
    runtime.shutdown_background();

    tracing::info!("Application shutdown complete");

    Ok(())
}
