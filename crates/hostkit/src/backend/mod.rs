//! Backend abstraction for host operations.
//!
//! The [`Host`] trait is the whole contract a provisioning run needs from a
//! machine: run a shell command, read identity, read and replace files.
//! Implementations:
//! - [`ssh::SshHost`]: a remote machine reached through the `ssh` client
//! - [`local::LocalHost`]: the machine this process runs on

pub mod local;
pub mod ssh;

use crate::error::{Error, Result};
use crate::types::{CommandOutput, OsRelease};

/// Path of the os-release file read by [`Host::read_os_release`].
pub const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Backend trait for host operations.
pub trait Host: Send + Sync {
    /// Human-readable name of the host (destination or "localhost").
    fn name(&self) -> &str;

    /// Run a shell command and wait for it.
    ///
    /// Returns `Ok` with a non-zero `exit_code` when the command itself
    /// failed; `Err` is reserved for failing to run it at all.
    fn run(&self, command: &str) -> Result<CommandOutput>;

    /// Read a file, returning `None` when it does not exist.
    fn read_file(&self, path: &str) -> Result<Option<String>>;

    /// Replace the complete contents of a file.
    ///
    /// On success the file's bytes equal `content` exactly. Readers never
    /// observe a partially written file.
    fn write_file(&self, path: &str, content: &str) -> Result<()>;

    /// Read the distribution name and codename.
    fn read_os_release(&self) -> Result<OsRelease> {
        let content = self.read_file(OS_RELEASE_PATH)?.ok_or_else(|| Error::Parse {
            what: "os-release".to_string(),
            message: format!("{OS_RELEASE_PATH} does not exist"),
        })?;
        OsRelease::parse(&content)
    }

    /// Read the package architecture (e.g. "amd64").
    fn read_architecture(&self) -> Result<String> {
        let command = "dpkg --print-architecture";
        let output = self.run(command)?;
        if !output.success() {
            return Err(Error::CommandFailed {
                command: command.to_string(),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output.stdout.trim().to_string())
    }
}
