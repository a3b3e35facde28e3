use crate::models::Settings;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use std::fs;

/// File name of the settings file inside the configuration directory.
pub const SETTINGS_FILE_NAME: &str = "Bartender.yaml";

/// Prefix for environment overrides, e.g. `BARTENDER_OVERLAY_DIR`.
pub const DEFAULT_ENV_PREFIX: &str = "BARTENDER";

/// Configuration manager for loading and saving Bartender's settings.
///
/// Settings are layered, later sources winning:
/// 1. Built-in defaults rooted at the user's home directory
/// 2. `Bartender.yaml` in the configuration directory (optional)
/// 3. `BARTENDER_*` environment variables
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
    env_prefix: String,
    defaults: Settings,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory holding `Bartender.yaml`; created if missing
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            settings_path: config_dir.join(SETTINGS_FILE_NAME),
            config_dir,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            defaults: Settings::default(),
        })
    }

    /// The platform configuration directory, e.g. `~/.config/bartender`.
    pub fn default_config_dir() -> Utf8PathBuf {
        dirs::config_dir()
            .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
            .map(|path| path.join("bartender"))
            .unwrap_or_else(|| crate::models::config::home_dir().join(".config").join("bartender"))
    }

    /// Use a different environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Replace the built-in defaults (the lowest settings layer).
    pub fn with_defaults(mut self, defaults: Settings) -> Self {
        self.defaults = defaults;
        self
    }

    /// Load settings from defaults, the YAML file and the environment.
    pub fn load_settings(&self) -> Result<Settings> {
        if self.settings_path.exists() {
            tracing::info!("Loading settings from {}", self.settings_path);
        } else {
            tracing::warn!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
        }

        let defaults =
            Config::try_from(&self.defaults).context("Failed to build default settings")?;

        let settings: Settings = Config::builder()
            .add_source(defaults)
            .add_source(
                File::from(self.settings_path.as_std_path())
                    .format(FileFormat::Yaml)
                    .required(false),
            )
            .add_source(Environment::with_prefix(&self.env_prefix).try_parsing(true))
            .build()
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        tracing::debug!("Effective settings: {:?}", settings);
        Ok(settings)
    }

    /// Save settings to `Bartender.yaml`.
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    /// Get the settings file path.
    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }
}
