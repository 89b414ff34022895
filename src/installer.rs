use crate::config::Config;
use crate::error::{DotupError, Result};
use crate::install_dir::{select_install_dir, INSTALL_DIR_ENV};
use crate::models::{DirectiveKind, InstalledSdk, Quality, VersionDirective};
use crate::platform::{OsFamily, PlatformProfile};
use crate::script::{resolve_installer_script, SCRIPT_ENV_OVERRIDE};
use crate::utils::print_warning;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use semver::VersionReq;
use std::path::{Path, PathBuf};
use std::process::Stdio;

/// Proxy values for the Windows installer, copied verbatim from the
/// environment
#[derive(Debug, Clone, Default)]
pub struct ProxySettings {
    pub https_proxy: Option<String>,
    pub no_proxy: Option<String>,
}

impl ProxySettings {
    pub fn from_env() -> Self {
        Self {
            https_proxy: std::env::var("https_proxy").ok(),
            no_proxy: std::env::var("no_proxy").ok(),
        }
    }
}

/// Ambient state consumed by an install run, read once up front and
/// threaded explicitly from there on
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub install_dir: Option<String>,
    pub script: Option<String>,
    pub proxy: ProxySettings,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            install_dir: std::env::var(INSTALL_DIR_ENV).ok(),
            script: std::env::var(SCRIPT_ENV_OVERRIDE).ok(),
            proxy: ProxySettings::from_env(),
        }
    }
}

pub struct SdkInstaller {
    config: Config,
    profile: PlatformProfile,
    env: EnvOverrides,
}

impl SdkInstaller {
    pub fn new(config: Config, profile: PlatformProfile, env: EnvOverrides) -> Self {
        Self {
            config,
            profile,
            env,
        }
    }

    /// Install the SDK described by the directive and report the concrete
    /// version that landed on disk
    pub async fn install(
        &self,
        directive: &VersionDirective,
        quality: Option<Quality>,
    ) -> Result<InstalledSdk> {
        let install_dir = self.install_dir(directive)?;
        let script =
            resolve_installer_script(&self.config, &self.profile, self.env.script.as_deref())
                .await?;
        let args = self.build_args(directive, quality);

        println!(
            "{} .NET SDK {} into {}",
            "Installing".green().bold(),
            directive.to_string().cyan(),
            install_dir.display().to_string().dimmed()
        );

        self.run_installer(&script, &args, &install_dir).await?;

        let version = self.find_installed(&install_dir, directive)?;
        let path = install_dir.join("sdk").join(version.to_string());

        Ok(InstalledSdk {
            version,
            path,
            installed_at: chrono::Utc::now(),
        })
    }

    /// Directory the installer will place the SDK in
    pub fn install_dir(&self, directive: &VersionDirective) -> Result<PathBuf> {
        select_install_dir(
            &self.profile,
            directive.major(),
            self.env.install_dir.as_deref(),
        )
    }

    /// For an exact pin, the directory it would already occupy on disk
    pub fn exact_install_path(&self, directive: &VersionDirective) -> Result<Option<PathBuf>> {
        if directive.kind != DirectiveKind::Exact {
            return Ok(None);
        }

        let path = self.install_dir(directive)?.join("sdk").join(&directive.value);
        if path.exists() {
            Ok(Some(path))
        } else {
            Ok(None)
        }
    }

    /// Assemble the installer's argument list.
    ///
    /// A quality filter on a directive that does not support one is a
    /// recoverable condition: the request is dropped with a warning and
    /// assembly continues.
    pub fn build_args(
        &self,
        directive: &VersionDirective,
        quality: Option<Quality>,
    ) -> Vec<String> {
        let mut args = vec![self.profile.flag("skip-non-versioned-files")];

        let type_flag = match directive.kind {
            DirectiveKind::Exact => self.profile.flag("version"),
            DirectiveKind::Channel => self.profile.flag("channel"),
        };
        args.push(type_flag);
        args.push(directive.value.clone());

        if let Some(quality) = quality {
            if directive.supports_quality {
                args.push(self.profile.flag("quality"));
                args.push(quality.as_str().to_string());
            } else {
                tracing::warn!(
                    "Quality '{}' is not supported for {}; ignoring it",
                    quality,
                    directive
                );
                print_warning(&format!(
                    "Quality '{}' only applies to channel installs of .NET 6 and later; ignoring it",
                    quality
                ));
            }
        }

        if self.profile.os == OsFamily::Windows {
            if let Some(proxy) = &self.env.proxy.https_proxy {
                args.push(self.profile.flag("proxy-address"));
                args.push(proxy.clone());
            }
            if let Some(bypass) = &self.env.proxy.no_proxy {
                args.push(self.profile.flag("proxy-bypass-list"));
                args.push(bypass.clone());
            }
        }

        args
    }

    /// Interpreter used to run the installer script
    fn interpreter(&self) -> Result<(PathBuf, Vec<String>)> {
        match self.profile.os {
            OsFamily::Windows => {
                let shell = which::which("pwsh")
                    .or_else(|_| which::which("powershell"))
                    .map_err(|_| {
                        DotupError::InterpreterNotFound("pwsh or powershell".to_string())
                    })?;
                let args = [
                    "-NoLogo",
                    "-NoProfile",
                    "-NonInteractive",
                    "-ExecutionPolicy",
                    "Unrestricted",
                    "-File",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect();
                Ok((shell, args))
            }
            OsFamily::Linux | OsFamily::MacOs => {
                let bash = which::which("bash")
                    .map_err(|_| DotupError::InterpreterNotFound("bash".to_string()))?;
                Ok((bash, Vec::new()))
            }
        }
    }

    /// Run the installer subprocess: stdout flows through to the terminal,
    /// stderr is captured for the failure message
    async fn run_installer(&self, script: &Path, args: &[String], install_dir: &Path) -> Result<()> {
        let (program, interpreter_args) = self.interpreter()?;

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        pb.set_message(format!("Running {}", self.profile.script_name()));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        let child = tokio::process::Command::new(&program)
            .args(&interpreter_args)
            .arg(script)
            .args(args)
            .env(INSTALL_DIR_ENV, install_dir)
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .spawn()?;

        let output = child.wait_with_output().await?;
        pb.finish_and_clear();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(DotupError::InstallationFailed {
                exit_code: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        Ok(())
    }

    /// Determine which concrete version the installer produced: the
    /// maximum installed version satisfying the directive
    pub fn find_installed(
        &self,
        install_dir: &Path,
        directive: &VersionDirective,
    ) -> Result<semver::Version> {
        let req = directive.version_req()?;

        scan_sdk_dir(&install_dir.join("sdk"))?
            .into_iter()
            .map(|sdk| sdk.version)
            .filter(|version| satisfies(&req, version))
            .max()
            .ok_or_else(|| DotupError::VersionNotFound(directive.value.clone()))
    }

    /// List every SDK under the selected install location, newest first
    pub fn list_installed(&self) -> Result<Vec<InstalledSdk>> {
        let mut installed = Vec::new();

        if let Some(dir) = &self.env.install_dir {
            let root = PathBuf::from(shellexpand::tilde(dir).to_string());
            installed.extend(scan_sdk_dir(&root.join("sdk"))?);
        } else {
            let root = self.profile.default_install_root()?;
            if root.exists() {
                for entry in std::fs::read_dir(&root)? {
                    let entry = entry?;
                    if entry.path().is_dir() {
                        installed.extend(scan_sdk_dir(&entry.path().join("sdk"))?);
                    }
                }
            }
        }

        installed.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(installed)
    }
}

/// Match with prerelease candidates included: a prerelease competes on
/// its release triple, then loses to any release of the same triple in
/// the max comparison by ordinary semver ordering
fn satisfies(req: &VersionReq, version: &semver::Version) -> bool {
    if req.matches(version) {
        return true;
    }

    if version.pre.is_empty() {
        return false;
    }

    let release = semver::Version::new(version.major, version.minor, version.patch);
    req.matches(&release)
}

fn scan_sdk_dir(sdk_dir: &Path) -> Result<Vec<InstalledSdk>> {
    let mut found = Vec::new();

    if !sdk_dir.exists() {
        return Ok(found);
    }

    for entry in std::fs::read_dir(sdk_dir)? {
        let entry = entry?;
        let path = entry.path();

        if !path.is_dir() {
            continue;
        }

        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if let Ok(version) = semver::Version::parse(name) {
                let metadata = std::fs::metadata(&path)?;
                let installed_at = metadata
                    .created()
                    .or_else(|_| metadata.modified())
                    .map(chrono::DateTime::<chrono::Utc>::from)
                    .unwrap_or_else(|_| chrono::Utc::now());

                found.push(InstalledSdk {
                    version,
                    path: path.clone(),
                    installed_at,
                });
            }
        }
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VersionDirective;
    use tempfile::TempDir;

    fn installer_for(os: OsFamily, env: EnvOverrides) -> SdkInstaller {
        SdkInstaller::new(Config::default(), PlatformProfile::new(os), env)
    }

    fn sdk_dirs(root: &Path, versions: &[&str]) {
        for version in versions {
            std::fs::create_dir_all(root.join("sdk").join(version)).unwrap();
        }
    }

    #[test]
    fn test_build_args_exact_pin() {
        let installer = installer_for(OsFamily::Linux, EnvOverrides::default());
        let args = installer.build_args(&VersionDirective::exact("8.0.100"), None);
        assert_eq!(
            args,
            vec!["--skip-non-versioned-files", "--version", "8.0.100"]
        );
    }

    #[test]
    fn test_build_args_channel_with_quality() {
        let installer = installer_for(OsFamily::Linux, EnvOverrides::default());
        let args = installer.build_args(
            &VersionDirective::channel("6.0", 6),
            Some(Quality::Preview),
        );
        assert_eq!(
            args,
            vec![
                "--skip-non-versioned-files",
                "--channel",
                "6.0",
                "--quality",
                "preview"
            ]
        );
    }

    #[test]
    fn test_build_args_drops_unsupported_quality() {
        let installer = installer_for(OsFamily::Linux, EnvOverrides::default());

        // channel below the quality threshold
        let args = installer.build_args(
            &VersionDirective::channel("5.0", 5),
            Some(Quality::Preview),
        );
        assert_eq!(args, vec!["--skip-non-versioned-files", "--channel", "5.0"]);

        // exact pins never take a quality
        let args = installer.build_args(
            &VersionDirective::exact("8.0.100"),
            Some(Quality::Ga),
        );
        assert_eq!(
            args,
            vec!["--skip-non-versioned-files", "--version", "8.0.100"]
        );
    }

    #[test]
    fn test_build_args_windows_flag_style() {
        let installer = installer_for(OsFamily::Windows, EnvOverrides::default());
        let args = installer.build_args(&VersionDirective::channel("7.0", 7), None);
        assert_eq!(args, vec!["-SkipNonVersionedFiles", "-Channel", "7.0"]);
    }

    #[test]
    fn test_build_args_windows_proxy_passthrough() {
        let env = EnvOverrides {
            proxy: ProxySettings {
                https_proxy: Some("http://proxy:8080".to_string()),
                no_proxy: Some("localhost,.internal".to_string()),
            },
            ..Default::default()
        };
        let installer = installer_for(OsFamily::Windows, env);
        let args = installer.build_args(&VersionDirective::channel("8.0", 8), None);
        assert_eq!(
            args,
            vec![
                "-SkipNonVersionedFiles",
                "-Channel",
                "8.0",
                "-ProxyAddress",
                "http://proxy:8080",
                "-ProxyBypassList",
                "localhost,.internal"
            ]
        );
    }

    #[test]
    fn test_proxy_not_forwarded_on_unix() {
        let env = EnvOverrides {
            proxy: ProxySettings {
                https_proxy: Some("http://proxy:8080".to_string()),
                no_proxy: None,
            },
            ..Default::default()
        };
        let installer = installer_for(OsFamily::Linux, env);
        let args = installer.build_args(&VersionDirective::channel("8.0", 8), None);
        assert_eq!(args, vec!["--skip-non-versioned-files", "--channel", "8.0"]);
    }

    #[test]
    fn test_find_installed_selects_max_satisfying() {
        let temp = TempDir::new().unwrap();
        sdk_dirs(temp.path(), &["7.0.100", "7.0.203", "7.0.1-preview"]);

        let installer = installer_for(OsFamily::Linux, EnvOverrides::default());
        let found = installer
            .find_installed(temp.path(), &VersionDirective::channel("7.0", 7))
            .unwrap();
        assert_eq!(found, semver::Version::parse("7.0.203").unwrap());
    }

    #[test]
    fn test_find_installed_ignores_other_channels() {
        let temp = TempDir::new().unwrap();
        sdk_dirs(temp.path(), &["7.1.100", "8.0.100"]);

        let installer = installer_for(OsFamily::Linux, EnvOverrides::default());
        let result = installer.find_installed(temp.path(), &VersionDirective::channel("7.0", 7));
        assert!(matches!(result, Err(DotupError::VersionNotFound(_))));
    }

    #[test]
    fn test_find_installed_exact_pin_does_not_float() {
        let temp = TempDir::new().unwrap();
        sdk_dirs(temp.path(), &["8.0.100", "8.0.204"]);

        let installer = installer_for(OsFamily::Linux, EnvOverrides::default());
        let found = installer
            .find_installed(temp.path(), &VersionDirective::exact("8.0.100"))
            .unwrap();
        assert_eq!(found, semver::Version::parse("8.0.100").unwrap());
    }

    #[test]
    fn test_find_installed_prerelease_as_only_candidate() {
        let temp = TempDir::new().unwrap();
        sdk_dirs(temp.path(), &["9.0.100-preview.7"]);

        let installer = installer_for(OsFamily::Linux, EnvOverrides::default());
        let found = installer
            .find_installed(temp.path(), &VersionDirective::channel("9.0", 9))
            .unwrap();
        assert_eq!(found, semver::Version::parse("9.0.100-preview.7").unwrap());
    }

    #[test]
    fn test_find_installed_empty_dir_fails() {
        let temp = TempDir::new().unwrap();

        let installer = installer_for(OsFamily::Linux, EnvOverrides::default());
        let result = installer.find_installed(temp.path(), &VersionDirective::channel("7.0", 7));
        assert!(matches!(result, Err(DotupError::VersionNotFound(_))));
    }

    #[test]
    fn test_exact_install_path_detection() {
        let temp = TempDir::new().unwrap();
        sdk_dirs(temp.path(), &["8.0.100"]);

        let env = EnvOverrides {
            install_dir: Some(temp.path().to_str().unwrap().to_string()),
            ..Default::default()
        };
        let installer = installer_for(OsFamily::Linux, env);

        let present = installer
            .exact_install_path(&VersionDirective::exact("8.0.100"))
            .unwrap();
        assert!(present.is_some());

        let absent = installer
            .exact_install_path(&VersionDirective::exact("8.0.999"))
            .unwrap();
        assert!(absent.is_none());

        // channels have no single on-disk pin
        let channel = installer
            .exact_install_path(&VersionDirective::channel("8.0", 8))
            .unwrap();
        assert!(channel.is_none());
    }

    #[test]
    fn test_list_installed_newest_first() {
        let temp = TempDir::new().unwrap();
        sdk_dirs(temp.path(), &["6.0.100", "8.0.204", "7.0.100"]);

        let env = EnvOverrides {
            install_dir: Some(temp.path().to_str().unwrap().to_string()),
            ..Default::default()
        };
        let installer = installer_for(OsFamily::Linux, env);

        let versions: Vec<String> = installer
            .list_installed()
            .unwrap()
            .iter()
            .map(|sdk| sdk.version.to_string())
            .collect();
        assert_eq!(versions, vec!["8.0.204", "7.0.100", "6.0.100"]);
    }
}
