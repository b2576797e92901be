use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Session settings loaded from `blendpdf.yaml` (or the legacy `blendpdf.json`).
///
/// Field aliases accept the camelCase keys used by the legacy JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Keep processed sources in `archive/` instead of deleting them.
    #[serde(alias = "archiveMode")]
    pub archive_mode: bool,

    /// Output destinations; relative entries are resolved against the watch folder.
    #[serde(alias = "outputFolders")]
    pub output_folders: Vec<String>,

    #[serde(alias = "verboseMode")]
    pub verbose_mode: bool,

    #[serde(alias = "debugMode")]
    pub debug_mode: bool,

    /// Seconds without input before the menu exits. Zero disables the timeout.
    #[serde(alias = "idleTimeoutSecs")]
    pub idle_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            archive_mode: true,
            output_folders: vec![default_output_folder()],
            verbose_mode: false,
            debug_mode: false,
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

fn default_output_folder() -> String {
    "output".to_string()
}

fn default_idle_timeout() -> u64 {
    300
}

impl Settings {
    /// Normalize the settings in place.
    ///
    /// Blank output entries are dropped, duplicates removed (first one wins) and
    /// an empty list falls back to `output`. Debug mode implies verbose.
    pub fn normalize(&mut self) {
        let folders: IndexSet<String> = self
            .output_folders
            .iter()
            .map(|folder| folder.trim())
            .filter(|folder| !folder.is_empty())
            .map(str::to_string)
            .collect();

        self.output_folders = folders.into_iter().collect();

        if self.output_folders.is_empty() {
            self.output_folders.push(default_output_folder());
        }

        if self.debug_mode {
            self.verbose_mode = true;
        }
    }
}
