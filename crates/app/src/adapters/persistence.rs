use anyhow::{Context, Result};
use directories::ProjectDirs;
use gitpulse_core::error::CoreError;
use gitpulse_core::ports::{AppConfig, ConfigStore};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// File-based configuration store that implements ConfigStore.
///
/// JSON by default; a `.toml` extension switches the parser to TOML.
pub struct FileConfigStore {
    config_path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Result<Self> {
        let config_path = Self::get_default_config_path()?;
        Ok(Self { config_path })
    }

    pub fn with_path<P: AsRef<Path>>(config_path: P) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    fn get_default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("", "", "gitpulse")
            .context("Failed to determine project directories")?;

        Ok(proj_dirs.config_dir().join("config.json"))
    }

    fn is_toml(&self) -> bool {
        self.config_path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
    }

    fn invalid(&self, reason: impl ToString) -> anyhow::Error {
        CoreError::Config {
            path: self.config_path.clone(),
            reason: reason.to_string(),
        }
        .into()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!("No config at {}, using defaults", self.config_path.display());
            return Ok(AppConfig::default());
        }

        let contents = fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read config file: {}", self.config_path.display()))?;

        let config: AppConfig = if self.is_toml() {
            toml::from_str(&contents).map_err(|e| self.invalid(e))?
        } else {
            serde_json::from_str(&contents).map_err(|e| self.invalid(e))?
        };
        config.validate().map_err(|e| self.invalid(e))?;

        info!("Loaded config from {}", self.config_path.display());
        Ok(config)
    }
}
