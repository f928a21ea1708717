//! # hostkit
//!
//! Run commands and manage files on a single host, local or over SSH.
//!
//! This crate provides:
//! - The [`Host`] trait: run a shell command, read identity, read and
//!   atomically replace files
//! - [`SshHost`] backed by the system `ssh` client, with retry on connection
//!   failures
//! - [`LocalHost`] for the machine the process runs on
//! - `mock::MockHost`, a recording in-memory host for tests (behind the
//!   `mock` feature)
//!
//! ## Example
//!
//! ```no_run
//! use hostkit::{Host, SshHost};
//!
//! let host = SshHost::new("root@bridge.example.org")
//!     .env("DEBIAN_FRONTEND", "noninteractive");
//!
//! let release = host.read_os_release().expect("read os-release");
//! println!("{} ({})", release.name, release.version_codename);
//!
//! let output = host.run("apt-get update").expect("ssh failed");
//! assert!(output.success());
//! ```
//!
//! ## Retry Logic
//!
//! Only transport failures are retried: ssh exit status 255 with ssh's own
//! diagnostics on stderr. A command that runs and fails is reported once,
//! as a [`CommandOutput`] with a non-zero exit code.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod retry;
pub mod shell;
pub mod types;

pub use backend::local::LocalHost;
pub use backend::ssh::SshHost;
pub use backend::Host;
pub use error::{Error, ErrorCategory, Result};
pub use types::{CommandOutput, OsRelease, RetryConfig};
