use thiserror::Error;

#[derive(Error, Debug)]
pub enum DotupError {
    #[error("Invalid version or version range: {0}")]
    InvalidVersion(String),

    #[error("No release channel found for major version {major} in index {url}")]
    ChannelNotFound { major: String, url: String },

    #[error("Installer exited with code {exit_code}: {stderr}")]
    InstallationFailed { exit_code: i32, stderr: String },

    #[error("No installed SDK satisfies {0}")]
    VersionNotFound(String),

    #[error("Installer script not found: {0}")]
    ScriptNotFound(String),

    #[error("Installer interpreter not found: {0}")]
    InterpreterNotFound(String),

    #[error("Failed to download from {url}: {source}")]
    DownloadFailed {
        url: String,
        source: reqwest::Error,
    },

    #[error("Checksum verification failed for {file}")]
    ChecksumMismatch { file: String },

    #[error("Unsupported platform: {os}")]
    UnsupportedPlatform { os: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Version parse error: {0}")]
    SemverError(#[from] semver::Error),
}

pub type Result<T> = std::result::Result<T, DotupError>;
