use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Shuffle the study queue at session start (default: true)
    #[serde(default = "default_shuffle_cards")]
    pub shuffle_cards: bool,

    /// Cap on cards per study session; unset studies every due card
    #[serde(default)]
    pub max_session_cards: Option<usize>,

    /// How many completed sessions the stats screen lists (default: 10)
    #[serde(default = "default_recent_sessions")]
    pub recent_sessions: usize,

    /// Path to database file
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_shuffle_cards() -> bool {
    true
}

fn default_recent_sessions() -> usize {
    10
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("mnemo").join("mnemo.db"))
        .unwrap_or_else(|| PathBuf::from("mnemo.db"))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shuffle_cards: default_shuffle_cards(),
            max_session_cards: None,
            recent_sessions: default_recent_sessions(),
            db_path: default_db_path(),
        }
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(suffix) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(suffix);
    }
    path.to_path_buf()
}

impl Config {
    /// Load config from file or return defaults
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.db_path = expand_tilde(&config.db_path);
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Path to config file
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("mnemo").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Ensure the database directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        Ok(())
    }
}
