// App - startup and shutdown around the menu loop
//
// Startup takes the folder lock before anything else. A refused start leaves
// the watch folder exactly as it was: no settings writes, no log files, no
// directories. Shutdown prints the summary and releases the lock on every
// exit path of the menu, signals included.

use crate::cli::Cli;
use crate::config::ConfigManager;
use crate::models::{Settings, WatchedDirectorySet};
use crate::services::{DirectoryLock, LockManager, LopdfEngine};
use crate::session::Session;
use crate::ui::{ExitReason, FileOps, MenuController, MenuOptions};
use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use std::io::Write;
use std::time::Duration;
use tokio::io::AsyncBufRead;

/// A started instance: the locked watch folder and its resolved settings.
///
/// # Usage
///
/// 1. [`start()`](Self::start) - lock the folder, load settings
/// 2. Set up logging from [`settings()`](Self::settings)
/// 3. [`session()`](Self::session) - create the directories, build the session
/// 4. [`run_menu()`](Self::run_menu) - run until exit, print the summary, unlock
#[derive(Debug)]
pub struct App {
    watch_dir: Utf8PathBuf,
    settings: Settings,
    lock: DirectoryLock,
}

impl App {
    /// Lock the watch folder named by `cli`, then load and overlay settings.
    ///
    /// Fails with [`crate::services::LockError::AlreadyRunning`] (inside the
    /// `anyhow` error) when another instance holds the folder.
    pub fn start(cli: &Cli, locks: &LockManager) -> Result<Self> {
        let watch_dir = cli.watch_folder()?;
        let lock = locks.acquire(&watch_dir)?;

        let config_manager = ConfigManager::new(&watch_dir)?;
        let mut settings = config_manager.load_settings()?;
        cli.apply_to(&mut settings);
        settings.normalize();

        Ok(Self {
            watch_dir,
            settings,
            lock,
        })
    }

    pub fn watch_dir(&self) -> &Utf8Path {
        &self.watch_dir
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn lock_path(&self) -> &Utf8Path {
        self.lock.path()
    }

    /// Create archive/, error/ and the outputs, and open a session over them.
    pub fn session(&self) -> Result<Session<LopdfEngine>> {
        let dirs = WatchedDirectorySet::new(self.watch_dir.clone(), &self.settings.output_folders);
        dirs.prepare()?;
        Ok(Session::new(
            dirs,
            self.settings.archive_mode,
            LopdfEngine::new(),
        ))
    }

    pub fn menu_options(&self, color: bool) -> MenuOptions {
        let idle_secs = self.settings.idle_timeout_secs;
        MenuOptions {
            verbose: self.settings.verbose_mode,
            debug: self.settings.debug_mode,
            idle_timeout: (idle_secs > 0).then(|| Duration::from_secs(idle_secs)),
            color,
        }
    }

    /// Run the menu, then print the session summary and release the lock.
    ///
    /// The lock is released even when the menu fails with an I/O error.
    pub async fn run_menu<F, R, W>(
        mut self,
        controller: &mut MenuController<F>,
        input: R,
        out: &mut W,
    ) -> Result<ExitReason>
    where
        F: FileOps,
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let result = controller.run(input, out).await;
        let summary = controller.print_summary(out);

        self.lock.release();

        let reason = result?;
        summary?;
        tracing::info!("Menu ended: {:?}", reason);
        Ok(reason)
    }
}
