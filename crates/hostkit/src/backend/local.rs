//! Local host backend: the machine this process runs on.

use crate::backend::Host;
use crate::error::{Error, Result};
use crate::shell;
use crate::types::CommandOutput;
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::process::{Command, Stdio};

/// Backend that runs commands through the local `sh`.
///
/// Without `sudo`, files are read and written directly; writes go through a
/// temporary file in the destination directory followed by a rename.
#[derive(Debug, Clone, Default)]
pub struct LocalHost {
    sudo: bool,
    env: Vec<(String, String)>,
}

impl LocalHost {
    /// Create a local host.
    pub fn new() -> Self {
        Self::default()
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

    fn sh(&self, script: &str, input: Option<&str>) -> Result<CommandOutput> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(script)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| Error::Spawn {
                program: "sh".to_string(),
                source,
            })?;

        if let Some(inp) = input
            && let Some(mut stdin) = child.stdin.take()
        {
            stdin.write_all(inp.as_bytes())?;
        }

        Ok(child.wait_with_output()?.into())
    }

    fn write_direct(path: &str, content: &str) -> Result<()> {
        let target = Path::new(path);
        let parent = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| Error::InvalidPath(target.to_path_buf()))?;

        let mut tmp =
            tempfile::NamedTempFile::new_in(parent).map_err(|e| permission_or_io(path, e))?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o644))?;
        }

        tmp.persist(target)
            .map_err(|e| permission_or_io(path, e.error))?;
        Ok(())
    }
}

fn permission_or_io(path: &str, err: std::io::Error) -> Error {
    if err.kind() == ErrorKind::PermissionDenied {
        Error::Permission {
            path: path.to_string(),
            message: err.to_string(),
        }
    } else {
        Error::Io(err)
    }
}

impl Host for LocalHost {
    fn name(&self) -> &str {
        "localhost"
    }

    fn run(&self, command: &str) -> Result<CommandOutput> {
        log::debug!("[localhost] $ {}", command);
        self.sh(&shell::wrap(command, &self.env, self.sudo), None)
    }

    fn read_file(&self, path: &str) -> Result<Option<String>> {
        log::debug!("[localhost] read {}", path);

        if !self.sudo {
            return match std::fs::read_to_string(path) {
                Ok(content) => Ok(Some(content)),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(permission_or_io(path, e)),
            };
        }

        let output = self.sh(&shell::wrap(&shell::read_script(path), &[], true), None)?;
        shell::read_result(path, output)
    }

    fn write_file(&self, path: &str, content: &str) -> Result<()> {
        log::debug!("[localhost] write {} ({} bytes)", path, content.len());

        if !self.sudo {
            return Self::write_direct(path, content);
        }

        let output = self.sh(
            &shell::wrap(&shell::write_script(path), &[], true),
            Some(content),
        )?;
        shell::write_result(path, &output)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn path_in(dir: &TempDir, name: &str) -> String {
        dir.path().join(name).display().to_string()
    }

    #[test]
    fn test_run_captures_exit_code_and_output() {
        let host = LocalHost::new();

        let ok = host.run("echo hello").unwrap();
        assert!(ok.success());
        assert_eq!(ok.stdout, "hello\n");

        let failed = host.run("echo oops >&2; exit 3").unwrap();
        assert_eq!(failed.exit_code, 3);
        assert_eq!(failed.stderr, "oops\n");
    }

    #[test]
    fn test_run_applies_env() {
        let host = LocalHost::new().env("DEBIAN_FRONTEND", "noninteractive");
        let output = host.run("echo \"$DEBIAN_FRONTEND\"").unwrap();
        assert_eq!(output.stdout, "noninteractive\n");
    }

    #[test]
    fn test_read_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let host = LocalHost::new();
        assert_eq!(host.read_file(&path_in(&dir, "absent")).unwrap(), None);
    }

    #[test]
    fn test_write_then_read_exact_bytes() {
        let dir = TempDir::new().unwrap();
        let host = LocalHost::new();
        let path = path_in(&dir, "torrc");

        host.write_file(&path, "\nBridgeRelay 1\n").unwrap();
        assert_eq!(
            host.read_file(&path).unwrap().as_deref(),
            Some("\nBridgeRelay 1\n")
        );
    }

    #[test]
    fn test_write_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let host = LocalHost::new();
        let path = path_in(&dir, "tor.list");

        std::fs::write(&path, "a much longer stock file body\n").unwrap();
        host.write_file(&path, "short\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "short\n");
        // No temp files left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let host = LocalHost::new();
        let path = path_in(&dir, "missing/torrc");

        assert!(host.write_file(&path, "x").is_err());
    }
}
