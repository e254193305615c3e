use anyhow::{Context, Result};
use directories::ProjectDirs;
use log::debug;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::export::DEFAULT_CALENDAR_NAME;
use crate::term::DEFAULT_TERM_WEEKS;

/// Environment override for the working timezone.
pub const TIMEZONE_ENV: &str = "DEFAULT_TIMEZONE";
pub const FALLBACK_TIMEZONE: &str = "UTC";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarConfig {
    pub default_timezone: Option<String>,
    #[serde(default = "default_calendar_name")]
    pub calendar_name: String,
    #[serde(default = "default_term_weeks")]
    pub default_term_weeks: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_calendar_name() -> String {
    DEFAULT_CALENDAR_NAME.to_string()
}

fn default_term_weeks() -> i64 {
    DEFAULT_TERM_WEEKS
}

fn default_bind_address() -> String {
    "127.0.0.1:8001".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string(), "http://127.0.0.1:3000".to_string()]
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            default_timezone: None,
            calendar_name: default_calendar_name(),
            default_term_weeks: default_term_weeks(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: default_bind_address(), allowed_origins: default_allowed_origins() }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = get_config_path()?;

        // If config doesn't exist, create default
        if !config_path.exists() {
            let default_config = Config::default();
            default_config.save_to(&config_path)?;
            return Ok(default_config);
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).context("Failed to write config file")?;
        debug!("Saved config to {}", path.display());
        Ok(())
    }

    /// Timezone to work in: explicit value, then `DEFAULT_TIMEZONE`, then the
    /// config file, then UTC.
    pub fn resolve_timezone(&self, explicit: Option<&str>) -> String {
        let from_env = env::var(TIMEZONE_ENV).ok();
        pick_timezone(explicit, from_env.as_deref(), self.calendar.default_timezone.as_deref())
    }
}

fn pick_timezone(explicit: Option<&str>, from_env: Option<&str>, configured: Option<&str>) -> String {
    [explicit, from_env, configured]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|tz| !tz.is_empty())
        .unwrap_or(FALLBACK_TIMEZONE)
        .to_string()
}

pub fn get_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "schedulify", "schedulify")
        .context("Failed to determine config directory")?;

    Ok(proj_dirs.config_dir().join("config.toml"))
}
