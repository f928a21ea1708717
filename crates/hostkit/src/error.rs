//! Error types for host operations.
//!
//! Errors are categorized so callers can tell a flaky transport (worth
//! retrying) apart from a command that ran and failed on the host.

use std::path::PathBuf;
use thiserror::Error;

/// Exit status `ssh` uses for its own failures, also reachable by a remote command.
pub const SSH_TRANSPORT_EXIT: i32 = 255;

/// Categories of host errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Could not reach the host (transient, retryable)
    Connection,
    /// Permission denied on the host
    Permission,
    /// A command ran on the host and exited non-zero
    Command,
    /// Output from the host could not be understood
    Parse,
    /// Local I/O failure
    Io,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Connection => "Host unreachable",
            Self::Permission => "Permission denied",
            Self::Command => "Remote command failed",
            Self::Parse => "Unexpected output from host",
            Self::Io => "Local I/O error",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Connection => "Check the destination, port and SSH keys, then try again",
            Self::Permission => "Check the SSH key and host key, or sudo rights for the user",
            Self::Command => "Inspect the command's stderr on the target host",
            Self::Parse => "Verify the target runs a supported distribution",
            Self::Io => "Check local disk space and permissions",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur while talking to a host.
#[derive(Debug, Error)]
pub enum Error {
    /// The transport could not reach the host
    #[error("cannot reach {destination}: {message}")]
    Connection {
        /// SSH destination that failed
        destination: String,
        /// stderr reported by the transport
        message: String,
    },

    /// A local program could not be started
    #[error("failed to execute {program}: {source}")]
    Spawn {
        /// Program that failed to start
        program: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Permission denied while touching a path
    #[error("permission denied: {path}: {message}")]
    Permission {
        /// Path on the host
        path: String,
        /// Details from the host
        message: String,
    },

    /// A helper command exited non-zero
    #[error("command `{command}` exited with status {exit_code}: {stderr}")]
    CommandFailed {
        /// Command line that ran
        command: String,
        /// Exit status reported by the host
        exit_code: i32,
        /// Standard error from the command
        stderr: String,
    },

    /// Host output could not be parsed
    #[error("could not parse {what}: {message}")]
    Parse {
        /// What was being parsed
        what: String,
        /// Why parsing failed
        message: String,
    },

    /// Local path without a parent directory
    #[error("invalid path: {0}")]
    InvalidPath(PathBuf),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Get the error category for retry logic.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Connection { .. } => ErrorCategory::Connection,
            Error::Permission { .. } => ErrorCategory::Permission,
            Error::CommandFailed { .. } => ErrorCategory::Command,
            Error::Parse { .. } => ErrorCategory::Parse,
            Error::Spawn { .. } | Error::Io(_) | Error::InvalidPath(_) => ErrorCategory::Io,
            Error::Other(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Classify a failed file operation from the helper script's stderr.
    pub fn from_file_op(path: &str, command: &str, exit_code: i32, stderr: &str) -> Self {
        let stderr_lower = stderr.to_lowercase();

        if stderr_lower.contains("permission denied")
            || stderr_lower.contains("operation not permitted")
            || stderr_lower.contains("read-only file system")
            || stderr_lower.contains("a password is required")
        {
            return Error::Permission {
                path: path.to_string(),
                message: stderr.trim().to_string(),
            };
        }

        Error::CommandFailed {
            command: command.to_string(),
            exit_code,
            stderr: stderr.trim().to_string(),
        }
    }
}

/// Result type for host operations.
pub type Result<T> = std::result::Result<T, Error>;
