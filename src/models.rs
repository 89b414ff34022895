use clap::ValueEnum;
use semver::VersionReq;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a version specifier was classified for the installer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectiveKind {
    /// A full `A.B.C` pin; installed via the installer's version flag
    Exact,
    /// An `A.B` release line; installed via the installer's channel flag
    Channel,
}

/// Resolved, installer-ready form of a version specifier.
///
/// Immutable once built; resolving again produces a new directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDirective {
    pub kind: DirectiveKind,
    pub value: String,
    /// Quality filtering only applies to channel installs of major >= 6
    pub supports_quality: bool,
}

impl VersionDirective {
    pub fn exact<T: Into<String>>(value: T) -> Self {
        Self {
            kind: DirectiveKind::Exact,
            value: value.into(),
            supports_quality: false,
        }
    }

    pub fn channel<T: Into<String>>(value: T, major: u32) -> Self {
        Self {
            kind: DirectiveKind::Channel,
            value: value.into(),
            supports_quality: major >= 6,
        }
    }

    /// Major version component of the directive value
    pub fn major(&self) -> &str {
        self.value.split('.').next().unwrap_or(&self.value)
    }

    /// Render the directive as a semver requirement for the post-install
    /// scan. An exact pin must not float (`=A.B.C`); a channel covers its
    /// whole patch line and nothing newer (`~A.B`).
    pub fn version_req(&self) -> crate::error::Result<VersionReq> {
        let expr = match self.kind {
            DirectiveKind::Exact => format!("={}", self.value),
            DirectiveKind::Channel => format!("~{}", self.value),
        };
        Ok(VersionReq::parse(&expr)?)
    }
}

impl fmt::Display for VersionDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DirectiveKind::Exact => write!(f, "version {}", self.value),
            DirectiveKind::Channel => write!(f, "channel {}", self.value),
        }
    }
}

/// Build quality within a release channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Daily,
    Signed,
    Validated,
    Preview,
    Ga,
}

impl Quality {
    pub fn as_str(&self) -> &str {
        match self {
            Quality::Daily => "daily",
            Quality::Signed => "signed",
            Quality::Validated => "validated",
            Quality::Preview => "preview",
            Quality::Ga => "GA",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Installed SDK information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstalledSdk {
    pub version: semver::Version,
    pub path: std::path::PathBuf,
    pub installed_at: chrono::DateTime<chrono::Utc>,
}
