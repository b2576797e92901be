use crate::models::Settings;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use std::fs;

/// Settings file kept in the watch folder.
pub const CONFIG_FILE_NAME: &str = "blendpdf.yaml";

/// Older JSON settings file, read only when no YAML file exists.
pub const LEGACY_CONFIG_FILE_NAME: &str = "blendpdf.json";

/// Prefix of environment overrides such as `BLENDPDF_ARCHIVE_MODE`.
pub const ENV_PREFIX: &str = "BLENDPDF";

/// Configuration manager for loading and saving the session settings.
///
/// Sources are layered, later ones winning:
/// 1. Built-in defaults
/// 2. `blendpdf.yaml`, or the legacy `blendpdf.json` when there is no YAML file
/// 3. `BLENDPDF_*` environment variables (`BLENDPDF_OUTPUT_FOLDERS` is comma-separated)
///
/// Command-line flags are applied on top by the binary.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    config_path: Utf8PathBuf,
    legacy_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager for `config_dir` (normally the watch folder).
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        // Create config directory if it doesn't exist
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            config_path: config_dir.join(CONFIG_FILE_NAME),
            legacy_path: config_dir.join(LEGACY_CONFIG_FILE_NAME),
            config_dir,
        })
    }

    /// Load settings from every source, reading the process environment.
    pub fn load_settings(&self) -> Result<Settings> {
        self.load_settings_with_env(None)
    }

    /// Load settings, taking environment overrides from `env` instead of the
    /// process environment when given.
    pub fn load_settings_with_env(
        &self,
        env: Option<config::Map<String, String>>,
    ) -> Result<Settings> {
        let mut builder = Config::builder().add_source(
            Config::try_from(&Settings::default()).context("Failed to build default settings")?,
        );

        if self.config_path.exists() {
            tracing::info!("Loading settings from {}", self.config_path);
            builder = builder.add_source(
                File::from(self.config_path.as_std_path())
                    .format(FileFormat::Yaml)
                    .required(true),
            );
        } else if self.legacy_path.exists() {
            tracing::info!("Using legacy config file: {}", self.legacy_path);
            let legacy = self.load_legacy_settings()?;
            builder = builder.add_source(
                Config::try_from(&legacy).context("Failed to convert legacy settings")?,
            );
        } else {
            tracing::debug!("No settings file in {}, using defaults", self.config_dir);
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("output_folders")
                .source(env),
        );

        let settings: Settings = builder
            .build()
            .and_then(Config::try_deserialize)
            .with_context(|| format!("Failed to load settings from {}", self.config_dir))?;

        tracing::debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    fn load_legacy_settings(&self) -> Result<Settings> {
        let file_contents = fs::read_to_string(&self.legacy_path)
            .with_context(|| format!("Failed to read legacy config: {}", self.legacy_path))?;

        serde_json::from_str(&file_contents)
            .with_context(|| format!("Failed to parse legacy config: {}", self.legacy_path))
    }

    /// Save settings as `blendpdf.yaml`.
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.config_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.config_path))?;

        tracing::info!("Saved settings to {}", self.config_path);
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }
}
