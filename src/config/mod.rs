use crate::models::ScanSettings;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use ::config::{Config, Environment, File, FileFormat};
use std::fs;

/// Settings file name inside the configuration directory
pub const SETTINGS_FILE: &str = "Forbidden Finder.yaml";

/// Prefix of environment variables that override the settings file,
/// e.g. `FORBIDDEN_FINDER_TOP_WORDS=20`
pub const ENV_PREFIX: &str = "FORBIDDEN_FINDER";

/// Configuration manager for loading and saving scan settings.
///
/// Settings are layered, lowest priority first:
/// 1. [`ScanSettings::default`]
/// 2. `Forbidden Finder.yaml` in the configuration directory (optional)
/// 3. `FORBIDDEN_FINDER_*` environment variables
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory holding `Forbidden Finder.yaml`; created if missing
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            settings_path: config_dir.join(SETTINGS_FILE),
            config_dir,
        })
    }

    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }

    /// Load settings from the file and the process environment.
    pub fn load_settings(&self) -> Result<ScanSettings> {
        self.load_with_env(None)
    }

    /// Load settings with an explicit environment instead of the process one.
    ///
    /// Keys are full variable names, e.g. `FORBIDDEN_FINDER_TOP_WORDS`.
    pub fn load_settings_with_env(&self, env: ::config::Map<String, String>) -> Result<ScanSettings> {
        self.load_with_env(Some(env))
    }

    fn load_with_env(&self, env: Option<::config::Map<String, String>>) -> Result<ScanSettings> {
        if self.settings_path.exists() {
            tracing::info!("Loading settings from {}", self.settings_path);
        } else {
            tracing::warn!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
        }

        let layered = Config::builder()
            .add_source(File::new(self.settings_path.as_str(), FileFormat::Yaml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?;

        let settings: ScanSettings = layered
            .try_deserialize()
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        tracing::debug!("Effective settings: {:?}", settings);
        Ok(settings)
    }

    /// Save settings as YAML.
    ///
    /// # Arguments
    /// * `settings` - The ScanSettings to save
    pub fn save_settings(&self, settings: &ScanSettings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Write the default settings file if none exists yet.
    ///
    /// # Returns
    /// `true` if a file was created
    pub fn ensure_settings_file(&self) -> Result<bool> {
        if self.settings_path.exists() {
            return Ok(false);
        }
        self.save_settings(&ScanSettings::default())?;
        Ok(true)
    }
}
