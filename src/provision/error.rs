//! Error types for a provisioning run.
//!
//! Every variant is fatal to the run. The command surface prints the error
//! once and exits with [`ProvisionError::exit_code`].

use thiserror::Error;

use super::plan::Phase;
use super::validate::TargetDescriptor;

/// Exit status for an unsupported target and for failures with no remote
/// exit status of their own.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Distribution, codename or architecture not in the allow-list
    #[error("unsupported environment: {reason} (host reports {found})")]
    UnsupportedEnvironment {
        reason: String,
        found: TargetDescriptor,
    },

    /// A remote shell step exited non-zero
    #[error("command `{command}` exited with status {exit_code}{}", stderr_suffix(.stderr))]
    RemoteCommandFailure {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// Rendered content could not be delivered
    #[error("cannot write {path}: {source}")]
    WriteError {
        path: String,
        #[source]
        source: hostkit::Error,
    },

    /// Patch target missing, unreadable or without the search text
    #[error("cannot patch {path}: {reason}")]
    PatchError { path: String, reason: String },

    /// The host could not be reached or queried
    #[error(transparent)]
    Transport(#[from] hostkit::Error),

    /// Any of the above, tagged with the phase it happened in
    #[error("phase {}/{} ({}) failed: {source}", .phase.number(), Phase::COUNT, .phase.title())]
    PhaseFailed {
        phase: Phase,
        #[source]
        source: Box<ProvisionError>,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {}", stderr.lines().last().unwrap_or(stderr))
    }
}

impl ProvisionError {
    /// Tag an error with the phase it occurred in (idempotent).
    pub fn in_phase(self, phase: Phase) -> Self {
        match self {
            Self::PhaseFailed { .. } => self,
            other => Self::PhaseFailed {
                phase,
                source: Box::new(other),
            },
        }
    }

    /// The error without any phase tagging.
    pub fn root_cause(&self) -> &ProvisionError {
        match self {
            Self::PhaseFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// The phase the error occurred in, if tagged.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::PhaseFailed { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// The host error behind a transport or write failure.
    pub fn host_error(&self) -> Option<&hostkit::Error> {
        match self.root_cause() {
            Self::Transport(e) | Self::WriteError { source: e, .. } => Some(e),
            _ => None,
        }
    }

    /// Process exit status for this error.
    ///
    /// A failing remote command's own status is passed through (clamped to
    /// 1..=255); everything else exits 1.
    pub fn exit_code(&self) -> i32 {
        match self.root_cause() {
            Self::RemoteCommandFailure { exit_code, .. } => (*exit_code).clamp(1, 255),
            _ => EXIT_FAILURE,
        }
    }
}
