pub mod schema;

pub use schema::{
    BotConfig, Config, ConfigError, GatewayConfig, SlackConfig, Units, WitConfig, WolframConfig,
    DEFAULT_CONFIDENCE_THRESHOLD,
};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub const ENV_SLACK_TOKEN: &str = "SLACK_ACCESS_TOKEN";
pub const ENV_WIT_TOKEN: &str = "WIT_AI_ACCESS_TOKEN";
pub const ENV_WOLFRAM_APP_ID: &str = "WOLFRAM_APP_ID";

/// `<config dir>/wolfybot/config.toml` for the current platform.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "wolfybot").map(|dirs| dirs.config_dir().join("config.toml"))
}

impl Config {
    /// Load config from `path` (or the default location), then layer the
    /// process environment on top.
    ///
    /// A missing file is not an error: every field has a default and the
    /// credentials usually arrive through the environment.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(PathBuf::from(shellexpand::tilde(p).into_owned())),
            None => default_config_path(),
        };

        let mut config = match path.as_deref() {
            Some(p) if p.exists() => Self::from_file(p)?,
            Some(p) => {
                tracing::debug!("No config file at {}, using defaults", p.display());
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Credentials from the environment win over the file. Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get(ENV_SLACK_TOKEN) {
            self.slack.bot_token = token;
        }
        if let Some(token) = get(ENV_WIT_TOKEN) {
            self.wit.access_token = token;
        }
        if let Some(app_id) = get(ENV_WOLFRAM_APP_ID) {
            self.wolfram.app_id = app_id;
        }
    }
}
