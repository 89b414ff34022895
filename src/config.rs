use crate::api::{RetryPolicy, DEFAULT_INDEX_URL};
use crate::error::{DotupError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub dotup_dir: PathBuf,

    #[serde(skip)]
    pub scripts_dir: PathBuf,

    #[serde(skip)]
    pub config_file: PathBuf,

    /// Releases index consulted when expanding a bare major version
    pub index_url: String,

    /// Maximum attempts for a single index or script fetch
    pub retry_max_attempts: u32,

    /// Base delay between retry attempts, in milliseconds
    pub retry_base_delay_ms: u64,

    /// Verify downloaded installer scripts against `script_sha256`
    pub verify_script_checksum: bool,

    /// Optional SHA-256 pin for the installer script
    pub script_sha256: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let dotup_dir = Self::default_dotup_dir();

        Self {
            scripts_dir: dotup_dir.join("scripts"),
            config_file: dotup_dir.join("config.toml"),
            dotup_dir,
            index_url: DEFAULT_INDEX_URL.to_string(),
            retry_max_attempts: 3,
            retry_base_delay_ms: 1000,
            verify_script_checksum: false,
            script_sha256: None,
        }
    }
}

impl Config {
    fn default_dotup_dir() -> PathBuf {
        // First check DOTUP_DIR environment variable
        if let Ok(dir) = std::env::var("DOTUP_DIR") {
            return PathBuf::from(shellexpand::tilde(&dir).to_string());
        }

        // Then use platform-specific directory
        if let Some(proj_dirs) = ProjectDirs::from("", "", "dotup") {
            return proj_dirs.data_dir().to_path_buf();
        }

        // Fallback to ~/.dotup
        PathBuf::from(shellexpand::tilde("~/.dotup").to_string())
    }

    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Create directories if they don't exist
        std::fs::create_dir_all(&config.dotup_dir)?;
        std::fs::create_dir_all(&config.scripts_dir)?;

        // Load config file if it exists
        if config.config_file.exists() {
            let contents = std::fs::read_to_string(&config.config_file)?;
            let file_config: Config = toml::from_str(&contents)?;

            config.index_url = file_config.index_url;
            config.retry_max_attempts = file_config.retry_max_attempts;
            config.retry_base_delay_ms = file_config.retry_base_delay_ms;
            config.verify_script_checksum = file_config.verify_script_checksum;
            config.script_sha256 = file_config.script_sha256;
        } else {
            // Create default config file
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| DotupError::ConfigError(e.to_string()))?;

        std::fs::write(&self.config_file, contents)?;
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_max_attempts.max(1),
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }

    /// Cache location for a downloaded installer script
    pub fn cached_script_path(&self, script_name: &str) -> PathBuf {
        self.scripts_dir.join(script_name)
    }
}
