//! Remote host backend using the system `ssh` client.

use crate::backend::Host;
use crate::error::{Error, Result, SSH_TRANSPORT_EXIT};
use crate::retry::{self, LogCallback};
use crate::shell;
use crate::types::{CommandOutput, RetryConfig};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Backend that executes commands over `ssh`.
///
/// Every call opens its own connection in batch mode, so key-based auth (or
/// an agent) must be available.
///
/// Exit status 255 is shared by `ssh` and the remote command, so stderr
/// decides. `ssh:` diagnostics and dropped connections become
/// [`Error::Connection`] and are retried according to the [`RetryConfig`].
/// A rejected key or host key is [`Error::Permission`]. Any other 255 is the
/// remote command's own status and is returned without a re-run.
#[derive(Debug, Clone)]
pub struct SshHost {
    destination: String,
    port: Option<u16>,
    identity_file: Option<PathBuf>,
    connect_timeout: Option<u64>,
    sudo: bool,
    env: Vec<(String, String)>,
    retry: RetryConfig,
}

impl SshHost {
    /// Create a host for an ssh destination (`host` or `user@host`).
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            port: None,
            identity_file: None,
            connect_timeout: None,
            sudo: false,
            env: Vec::new(),
            retry: RetryConfig::default(),
        }
    }

    /// Connect to a non-default port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Authenticate with a specific private key.
    pub fn identity_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.identity_file = Some(path.into());
        self
    }

    /// Seconds to wait for the TCP connection.
    pub fn connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout = Some(secs);
        self
    }

    /// Run commands and file operations through `sudo -n`.
    pub fn sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }

    /// Set an environment variable for every command.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Retry policy for connection failures.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Arguments passed to `ssh` before the remote command.
    pub fn ssh_args(&self) -> Vec<String> {
        let mut args = vec!["-o".to_string(), "BatchMode=yes".to_string()];

        if let Some(secs) = self.connect_timeout {
            args.push("-o".to_string());
            args.push(format!("ConnectTimeout={secs}"));
        }
        if let Some(port) = self.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        if let Some(identity) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity.display().to_string());
        }

        args.push(self.destination.clone());
        args
    }

    /// Run a remote command line once, feeding `input` on stdin.
    fn exec_once(&self, remote: &str, input: Option<&str>) -> Result<CommandOutput> {
        log::trace!("ssh {} -- {}", self.destination, remote);

        let mut child = Command::new("ssh")
            .args(self.ssh_args())
            .arg(remote)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| Error::Spawn {
                program: "ssh".to_string(),
                source,
            })?;

        if let Some(inp) = input
            && let Some(mut stdin) = child.stdin.take()
        {
            stdin.write_all(inp.as_bytes())?;
        }

        transport_result(&self.destination, child.wait_with_output()?.into())
    }

    fn exec(&self, remote: &str, input: Option<&str>) -> Result<CommandOutput> {
        retry::with_retry(&self.retry, Some(&LogCallback), || {
            self.exec_once(remote, input)
        })
    }
}

impl Host for SshHost {
    fn name(&self) -> &str {
        &self.destination
    }

    fn run(&self, command: &str) -> Result<CommandOutput> {
        log::debug!("[{}] $ {}", self.destination, command);
        self.exec(&shell::wrap(command, &self.env, self.sudo), None)
    }

    fn read_file(&self, path: &str) -> Result<Option<String>> {
        log::debug!("[{}] read {}", self.destination, path);
        let script = shell::read_script(path);
        let output = self.exec(&shell::wrap(&script, &[], self.sudo), None)?;
        shell::read_result(path, output)
    }

    fn write_file(&self, path: &str, content: &str) -> Result<()> {
        log::debug!("[{}] write {} ({} bytes)", self.destination, path, content.len());
        let script = shell::write_script(path);
        let output = self.exec(&shell::wrap(&script, &[], self.sudo), Some(content))?;
        shell::write_result(path, &output)
    }
}

/// stderr fragments `ssh` prints when the connection itself failed.
const CONNECTION_FAILURES: &[&str] = &[
    "kex_exchange_identification",
    "Connection closed by",
    "Connection reset by",
    "Connection timed out",
    "client_loop:",
];

/// stderr fragments for an authentication or host key rejection.
const AUTH_FAILURES: &[&str] = &["Permission denied (", "Host key verification failed"];

/// Separate `ssh`'s own failures from the remote command's exit status.
fn transport_result(destination: &str, output: CommandOutput) -> Result<CommandOutput> {
    if output.exit_code != SSH_TRANSPORT_EXIT {
        return Ok(output);
    }

    let stderr = output.stderr.trim();

    if AUTH_FAILURES.iter().any(|m| stderr.contains(m)) {
        return Err(Error::Permission {
            path: destination.to_string(),
            message: stderr.to_string(),
        });
    }

    let dropped = stderr.lines().any(|line| {
        line.starts_with("ssh:") || CONNECTION_FAILURES.iter().any(|m| line.contains(m))
    });
    if dropped {
        return Err(Error::Connection {
            destination: destination.to_string(),
            message: stderr.to_string(),
        });
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssh_args_minimal() {
        let host = SshHost::new("root@bridge.example.org");
        assert_eq!(
            host.ssh_args(),
            vec!["-o", "BatchMode=yes", "root@bridge.example.org"]
        );
    }

    #[test]
    fn test_ssh_args_full() {
        let host = SshHost::new("admin@203.0.113.7")
            .port(2222)
            .identity_file("/home/ops/.ssh/id_ed25519")
            .connect_timeout(10);

        assert_eq!(
            host.ssh_args(),
            vec![
                "-o",
                "BatchMode=yes",
                "-o",
                "ConnectTimeout=10",
                "-p",
                "2222",
                "-i",
                "/home/ops/.ssh/id_ed25519",
                "admin@203.0.113.7",
            ]
        );
    }

    #[test]
    fn test_name_is_destination() {
        let host = SshHost::new("bridge");
        assert_eq!(host.name(), "bridge");
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            base_delay: std::time::Duration::from_millis(1),
            backoff_factor: 1.0,
            max_delay: std::time::Duration::from_millis(5),
        }
    }

    #[test]
    fn test_connection_refused_is_retryable() {
        let output = CommandOutput::failed(
            SSH_TRANSPORT_EXIT,
            "ssh: connect to host bridge port 22: Connection refused\r\n",
        );
        let err = transport_result("bridge", output).unwrap_err();
        assert!(matches!(&err, Error::Connection { destination, .. } if destination == "bridge"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_dropped_connection_is_retryable() {
        let output = CommandOutput::failed(
            SSH_TRANSPORT_EXIT,
            "kex_exchange_identification: read: Connection reset by peer\r\n",
        );
        assert!(transport_result("bridge", output).unwrap_err().is_retryable());
    }

    #[test]
    fn test_remote_exit_255_is_passed_through() {
        let output = CommandOutput::failed(SSH_TRANSPORT_EXIT, "custom-tool: giving up\n");
        let passed = transport_result("bridge", output.clone()).unwrap();
        assert_eq!(passed, output);
    }

    #[test]
    fn test_other_exit_codes_are_untouched() {
        let output = CommandOutput::failed(100, "E: Unable to locate package tor\n");
        assert_eq!(transport_result("bridge", output.clone()).unwrap(), output);
    }

    #[test]
    fn test_auth_failure_is_not_retried() {
        let calls = std::cell::Cell::new(0);
        let result = retry::with_retry(&fast_retry(), None, || {
            calls.set(calls.get() + 1);
            transport_result(
                "root@bridge",
                CommandOutput::failed(
                    SSH_TRANSPORT_EXIT,
                    "root@bridge: Permission denied (publickey).\r\n",
                ),
            )
        });

        assert!(matches!(result, Err(Error::Permission { .. })));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_transport_failure_retried_then_succeeds() {
        let mut outputs = vec![
            CommandOutput::ok("root\n"),
            CommandOutput::failed(
                SSH_TRANSPORT_EXIT,
                "ssh: connect to host bridge port 22: Connection timed out\r\n",
            ),
        ];
        let calls = std::cell::Cell::new(0);

        let result = retry::with_retry(&fast_retry(), None, || {
            calls.set(calls.get() + 1);
            transport_result("bridge", outputs.pop().unwrap_or_default())
        });

        assert_eq!(result.unwrap().stdout, "root\n");
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_remote_exit_255_runs_once() {
        let calls = std::cell::Cell::new(0);
        let result = retry::with_retry(&fast_retry(), None, || {
            calls.set(calls.get() + 1);
            transport_result("bridge", CommandOutput::failed(SSH_TRANSPORT_EXIT, ""))
        });

        assert_eq!(result.unwrap().exit_code, SSH_TRANSPORT_EXIT);
        assert_eq!(calls.get(), 1);
    }
}
