use crate::config::Config;
use crate::download::Downloader;
use crate::error::{DotupError, Result};
use crate::platform::PlatformProfile;
use std::path::{Path, PathBuf};

/// Environment variable pointing at a local installer script, bypassing
/// the cache and the download entirely
pub const SCRIPT_ENV_OVERRIDE: &str = "DOTNET_INSTALL_SCRIPT";

/// Locate the platform installer script.
///
/// An explicit override path wins over the cache; a cached copy wins
/// over downloading from the official script URL.
pub async fn resolve_installer_script(
    config: &Config,
    profile: &PlatformProfile,
    override_path: Option<&str>,
) -> Result<PathBuf> {
    if let Some(raw) = override_path {
        let path = PathBuf::from(shellexpand::tilde(raw).to_string());
        if !path.exists() {
            return Err(DotupError::ScriptNotFound(path.display().to_string()));
        }
        return Ok(path);
    }

    let cached = config.cached_script_path(profile.script_name());
    if cached.exists() {
        return Ok(cached);
    }

    tracing::info!(
        "Installer script not cached, fetching {}",
        profile.script_url()
    );
    download_script(config, &profile.script_url(), &cached).await?;
    Ok(cached)
}

async fn download_script(config: &Config, url: &str, dest: &Path) -> Result<()> {
    let downloader = Downloader::new();
    let retry = config.retry_policy();
    let mut attempt = 1;

    loop {
        match downloader.download_with_progress(url, dest).await {
            Ok(()) => break,
            Err(error) => {
                if attempt >= retry.max_attempts {
                    return Err(error);
                }
                tracing::warn!(
                    "Installer script download attempt {} of {} failed: {}",
                    attempt,
                    retry.max_attempts,
                    error
                );
                tokio::time::sleep(retry.delay_for(attempt)).await;
                attempt += 1;
            }
        }
    }

    if config.verify_script_checksum {
        if let Some(expected) = &config.script_sha256 {
            if !Downloader::verify_checksum(dest, expected).await? {
                tokio::fs::remove_file(dest).await?;
                return Err(DotupError::ChecksumMismatch {
                    file: dest.display().to_string(),
                });
            }
        }
    }

    Ok(())
}
