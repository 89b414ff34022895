use crate::error::Result;
use crate::platform::PlatformProfile;
use std::path::PathBuf;

/// Pre-existing value here pins the install directory for the whole run
pub const INSTALL_DIR_ENV: &str = "DOTNET_INSTALL_DIR";

/// Select the SDK install directory.
///
/// A caller-supplied override is authoritative and returned as-is; the
/// major version plays no part in it. Otherwise the platform default root
/// is joined with the major version component. Pure function: the chosen
/// directory is handed to the installer subprocess explicitly rather than
/// written into this process's environment.
pub fn select_install_dir(
    profile: &PlatformProfile,
    major: &str,
    override_dir: Option<&str>,
) -> Result<PathBuf> {
    if let Some(dir) = override_dir {
        return Ok(PathBuf::from(shellexpand::tilde(dir).to_string()));
    }

    Ok(profile.default_install_root()?.join(major))
}
