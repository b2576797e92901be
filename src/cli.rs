//! Command-line interface.
//!
//! Flags override whatever the settings file and environment provided.

use crate::models::Settings;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{ArgAction, Parser};

#[derive(Debug, Parser)]
#[command(
    name = "blendpdf",
    version,
    about = "Watch a folder for scanned PDFs and move or interleave-merge duplex scan pairs",
    disable_version_flag = true
)]
pub struct Cli {
    /// Folder to watch (defaults to the current directory)
    pub folder: Option<Utf8PathBuf>,

    /// Show file previews and more detail
    #[arg(short = 'V', long)]
    pub verbose: bool,

    /// Debug logging (implies --verbose)
    #[arg(short = 'D', long)]
    pub debug: bool,

    /// Delete processed sources instead of moving them to archive/
    #[arg(long)]
    pub no_archive: bool,

    /// Output folder(s), comma-separated
    #[arg(short = 'o', long = "output", value_name = "DIR", value_delimiter = ',')]
    pub outputs: Vec<String>,

    /// Seconds without input before exiting (0 waits forever)
    #[arg(long, value_name = "SECS")]
    pub idle_timeout: Option<u64>,

    /// Print version
    #[arg(long = "version", action = ArgAction::Version)]
    _version: Option<bool>,
}

impl Cli {
    /// Overlay the flags that were given onto `settings`.
    pub fn apply_to(&self, settings: &mut Settings) {
        if self.verbose {
            settings.verbose_mode = true;
        }
        if self.debug {
            settings.debug_mode = true;
        }
        if self.no_archive {
            settings.archive_mode = false;
        }
        if !self.outputs.is_empty() {
            settings.output_folders = self.outputs.clone();
        }
        if let Some(secs) = self.idle_timeout {
            settings.idle_timeout_secs = secs;
        }
    }

    /// The watch folder as an absolute path. It must exist.
    pub fn watch_folder(&self) -> Result<Utf8PathBuf> {
        let folder = self
            .folder
            .as_deref()
            .unwrap_or_else(|| Utf8Path::new("."));

        let canonical = folder
            .canonicalize_utf8()
            .with_context(|| format!("Watch folder not found: {}", folder))?;

        if !canonical.is_dir() {
            anyhow::bail!("Watch folder is not a directory: {}", canonical);
        }

        Ok(canonical)
    }
}
