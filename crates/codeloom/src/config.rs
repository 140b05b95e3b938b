//! Explicit runtime configuration.
//!
//! One `Config` value is assembled per command from environment defaults plus
//! CLI overrides, then passed into the client, dispatcher, and review flow.
//! Nothing reads configuration ambiently.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "codellama:13b-instruct";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_BACKUP_DIR: &str = ".codeloom_backups";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Deadline applied to every provider request.
    pub timeout: Duration,
    pub auto_backup: bool,
    pub backup_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl Config {
    /// Defaults plus environment overrides. CLI flags are applied on top via
    /// the `with_*` builders.
    pub fn from_env() -> Self {
        let timeout_secs = std::env::var("CODELOOM_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let backup_dir = std::env::var("CODELOOM_BACKUP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_BACKUP_DIR));

        let cache_dir = std::env::var("CODELOOM_CACHE_DIR")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs_next::cache_dir().map(|dir| dir.join("codeloom")))
            .unwrap_or_else(|| PathBuf::from(".codeloom_cache"));

        Self {
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 2000,
            timeout: Duration::from_secs(timeout_secs),
            auto_backup: std::env::var("CODELOOM_NO_BACKUP").is_err(),
            backup_dir,
            cache_dir,
        }
    }

    pub fn with_connection(mut self, api_url: String, model: String) -> Self {
        self.api_url = api_url;
        self.model = model;
        self
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }
}
