use crate::error::{DotupError, Result};
use std::fmt;
use std::path::PathBuf;

/// Supported OS families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Windows,
    Linux,
    MacOs,
}

impl OsFamily {
    pub fn current() -> Result<Self> {
        match std::env::consts::OS {
            "windows" => Ok(OsFamily::Windows),
            "linux" => Ok(OsFamily::Linux),
            "macos" => Ok(OsFamily::MacOs),
            os => Err(DotupError::UnsupportedPlatform { os: os.to_string() }),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            OsFamily::Windows => "windows",
            OsFamily::Linux => "linux",
            OsFamily::MacOs => "macos",
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Platform-dependent installer facts, selected once at startup and
/// passed explicitly instead of re-testing the OS at each call site.
#[derive(Debug, Clone, Copy)]
pub struct PlatformProfile {
    pub os: OsFamily,
}

impl PlatformProfile {
    pub fn current() -> Result<Self> {
        Ok(Self {
            os: OsFamily::current()?,
        })
    }

    pub fn new(os: OsFamily) -> Self {
        Self { os }
    }

    /// File name of the official installer script for this platform
    pub fn script_name(&self) -> &'static str {
        match self.os {
            OsFamily::Windows => "dotnet-install.ps1",
            OsFamily::Linux | OsFamily::MacOs => "dotnet-install.sh",
        }
    }

    /// Canonical download URL for the installer script
    pub fn script_url(&self) -> String {
        format!("https://dot.net/v1/{}", self.script_name())
    }

    /// Render a kebab-case flag name in this platform's installer style:
    /// `--skip-non-versioned-files` for the shell script,
    /// `-SkipNonVersionedFiles` for the PowerShell script.
    pub fn flag(&self, name: &str) -> String {
        match self.os {
            OsFamily::Windows => {
                let pascal: String = name
                    .split('-')
                    .map(|word| {
                        let mut chars = word.chars();
                        match chars.next() {
                            Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                            None => String::new(),
                        }
                    })
                    .collect();
                format!("-{}", pascal)
            }
            OsFamily::Linux | OsFamily::MacOs => format!("--{}", name),
        }
    }

    /// Platform default root under which SDKs are installed
    pub fn default_install_root(&self) -> Result<PathBuf> {
        match self.os {
            OsFamily::Windows => {
                let program_files = std::env::var("ProgramFiles")
                    .or_else(|_| std::env::var("PROGRAMFILES"))
                    .unwrap_or_else(|_| r"C:\Program Files".to_string());
                Ok(PathBuf::from(program_files).join("dotnet"))
            }
            OsFamily::Linux => Ok(PathBuf::from("/usr/share/dotnet")),
            OsFamily::MacOs => {
                let home = dirs::home_dir().ok_or_else(|| {
                    DotupError::ConfigError("Could not determine home directory".to_string())
                })?;
                Ok(home.join(".dotnet"))
            }
        }
    }
}
