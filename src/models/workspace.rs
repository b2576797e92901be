use anyhow::{Context, Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Name of the archive directory inside the watch folder.
pub const ARCHIVE_DIR_NAME: &str = "archive";

/// Name of the error directory inside the watch folder.
pub const ERROR_DIR_NAME: &str = "error";

/// The four locations a session works with.
///
/// `main` is the intake folder the user drops scans into. Processed sources
/// end up in `archive` (or are deleted when archive mode is off), results are
/// fanned out to every entry of `outputs`, and anything that fails validation
/// or placement lands in `error`.
///
/// All four must exist and be writable before any operation runs; call
/// [`prepare`](Self::prepare) once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedDirectorySet {
    pub main: Utf8PathBuf,
    pub archive: Utf8PathBuf,
    pub outputs: Vec<Utf8PathBuf>,
    pub error: Utf8PathBuf,
}

impl WatchedDirectorySet {
    /// Build the directory set for a watch folder.
    ///
    /// Relative output folders are resolved against `main`. An empty list
    /// falls back to `main/output`.
    pub fn new(main: impl Into<Utf8PathBuf>, output_folders: &[String]) -> Self {
        let main = main.into();

        let mut outputs: Vec<Utf8PathBuf> = output_folders
            .iter()
            .map(|folder| {
                let folder = Utf8Path::new(folder);
                if folder.is_absolute() {
                    folder.to_path_buf()
                } else {
                    main.join(folder)
                }
            })
            .collect();

        if outputs.is_empty() {
            outputs.push(main.join("output"));
        }

        Self {
            archive: main.join(ARCHIVE_DIR_NAME),
            error: main.join(ERROR_DIR_NAME),
            outputs,
            main,
        }
    }

    /// Create every directory and check that each one accepts new files.
    pub fn prepare(&self) -> Result<()> {
        for dir in self.all() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir))?;

            let probe = tempfile::Builder::new()
                .prefix(".blendpdf-probe")
                .tempfile_in(dir)
                .with_context(|| format!("Directory is not writable: {}", dir))?;
            drop(probe);

            tracing::debug!("Directory ready: {}", dir);
        }

        if !self.main.is_dir() {
            bail!("Watch folder is not a directory: {}", self.main);
        }

        Ok(())
    }

    /// Every directory in the set, intake first.
    pub fn all(&self) -> impl Iterator<Item = &Utf8PathBuf> {
        std::iter::once(&self.main)
            .chain(std::iter::once(&self.archive))
            .chain(self.outputs.iter())
            .chain(std::iter::once(&self.error))
    }
}

/// A PDF discovered in the intake folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: Utf8PathBuf,
    pub name: String,
    pub size: u64,
}

impl CandidateFile {
    /// File name without the extension, used to name merge results.
    pub fn stem(&self) -> &str {
        self.path.file_stem().unwrap_or(self.name.as_str())
    }
}
