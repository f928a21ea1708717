//! Target environment validation
//!
//! The supported environments are a table, not control flow: adding a
//! release means adding a row to [`SUPPORTED_TARGETS`].

use hostkit::Host;
use serde::Serialize;
use std::fmt;

use super::error::ProvisionError;

/// `(distribution, codename, architecture)` triples this tool provisions.
pub const SUPPORTED_TARGETS: &[(&str, &str, &str)] =
    &[("Debian GNU/Linux", "bullseye", "amd64")];

/// Identity reported by the target host. Read once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetDescriptor {
    pub distribution: String,
    pub codename: String,
    pub architecture: String,
}

impl TargetDescriptor {
    pub fn new(distribution: &str, codename: &str, architecture: &str) -> Self {
        Self {
            distribution: distribution.to_string(),
            codename: codename.to_string(),
            architecture: architecture.to_string(),
        }
    }

    /// Whether the triple is in `table`.
    pub fn is_supported_by(&self, table: &[(&str, &str, &str)]) -> bool {
        table.contains(&(
            self.distribution.as_str(),
            self.codename.as_str(),
            self.architecture.as_str(),
        ))
    }
}

impl fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "distribution: {:?}, codename: {:?}, arch: {:?}",
            self.distribution, self.codename, self.architecture
        )
    }
}

/// Read the target's identity. Issues only reads.
pub fn read_target(host: &dyn Host) -> Result<TargetDescriptor, ProvisionError> {
    let release = host.read_os_release()?;
    let architecture = host.read_architecture()?;

    Ok(TargetDescriptor {
        distribution: release.name,
        codename: release.version_codename,
        architecture,
    })
}

/// Check a descriptor against an allow-list.
///
/// The error says whether the release or only the architecture was
/// rejected, and what would have been accepted.
pub fn check_supported(
    target: &TargetDescriptor,
    table: &[(&str, &str, &str)],
) -> Result<(), ProvisionError> {
    if target.is_supported_by(table) {
        return Ok(());
    }

    let release_matches: Vec<&str> = table
        .iter()
        .filter(|(dist, codename, _)| *dist == target.distribution && *codename == target.codename)
        .map(|(_, _, arch)| *arch)
        .collect();

    let reason = if release_matches.is_empty() {
        let expected: Vec<String> = table
            .iter()
            .map(|(dist, codename, _)| format!("{dist} {codename}"))
            .collect();
        format!(
            "distribution/version is unsupported (expected one of: {})",
            expected.join(", ")
        )
    } else {
        format!(
            "architecture {:?} is not supported (expected one of: {})",
            target.architecture,
            release_matches.join(", ")
        )
    };

    Err(ProvisionError::UnsupportedEnvironment {
        reason,
        found: target.clone(),
    })
}

/// Read the target and require it to be supported.
pub fn validate(host: &dyn Host) -> Result<TargetDescriptor, ProvisionError> {
    let target = read_target(host)?;
    log::info!("target reports {target}");
    check_supported(&target, SUPPORTED_TARGETS)?;
    Ok(target)
}
