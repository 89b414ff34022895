use crate::api::ReleasesIndexApi;
use crate::error::{DotupError, Result};
use crate::models::VersionDirective;
use semver::{Version, VersionReq};

/// Classifies a version specifier and, when a bare major is given,
/// expands it to a concrete channel through the releases index.
pub struct VersionResolver {
    api: ReleasesIndexApi,
}

/// Outcome of the purely syntactic classification step
#[derive(Debug, Clone, PartialEq, Eq)]
enum Classification {
    Exact(String),
    Channel { major: u32, minor: u32 },
    MajorOnly(u32),
}

impl VersionResolver {
    pub fn new(api: ReleasesIndexApi) -> Self {
        Self { api }
    }

    /// Resolve a raw specifier into an installer-ready directive.
    ///
    /// Exact `A.B.C` pins and `A.B` channels resolve locally; a bare `A`
    /// or `A.x` costs exactly one index lookup.
    pub async fn resolve(&self, raw: &str) -> Result<VersionDirective> {
        match classify(raw)? {
            Classification::Exact(version) => Ok(VersionDirective::exact(version)),
            Classification::Channel { major, minor } => Ok(VersionDirective::channel(
                format!("{}.{}", major, minor),
                major,
            )),
            Classification::MajorOnly(major) => {
                let channel = self.api.resolve_channel(&major.to_string()).await?;
                Ok(VersionDirective::channel(channel, major))
            }
        }
    }
}

fn classify(raw: &str) -> Result<Classification> {
    let spec = raw.trim();

    // All three components present and numeric: an exact pin.
    if Version::parse(spec).is_ok() {
        return Ok(Classification::Exact(spec.to_string()));
    }

    // Anything else must at least be a valid semver range expression.
    if VersionReq::parse(spec).is_err() {
        return Err(DotupError::InvalidVersion(spec.to_string()));
    }

    let mut parts = spec.split('.');
    let major_part = parts.next().unwrap_or_default();
    let minor_part = parts.next();

    // A non-numeric major passed range validation (e.g. ">=6"): there is
    // no channel to install from such an expression, so fail fast rather
    // than handing the installer a directive with no version at all.
    let major: u32 = major_part
        .parse()
        .map_err(|_| DotupError::InvalidVersion(spec.to_string()))?;

    match minor_part {
        Some(minor_str) if !is_wildcard(minor_str) => {
            let minor: u32 = minor_str
                .parse()
                .map_err(|_| DotupError::InvalidVersion(spec.to_string()))?;
            Ok(Classification::Channel { major, minor })
        }
        _ => Ok(Classification::MajorOnly(major)),
    }
}

fn is_wildcard(s: &str) -> bool {
    matches!(s, "x" | "X" | "*")
}
