//! Core types shared by all host backends.

use crate::error::{Error, Result};
use std::process::Output;
use std::time::Duration;

/// Output of a command executed on a host.
///
/// A non-zero `exit_code` is not an error at this layer: the command ran,
/// and the caller decides what failure means.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status (`-1` when the process was killed by a signal)
    pub exit_code: i32,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl CommandOutput {
    /// A successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed output with the given exit code and stderr.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether the command exited zero.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

/// Distribution identity read from `/etc/os-release`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsRelease {
    /// `NAME`, e.g. "Debian GNU/Linux"
    pub name: String,
    /// `VERSION_CODENAME`, e.g. "bullseye"
    pub version_codename: String,
}

impl OsRelease {
    /// Parse the contents of an os-release file.
    ///
    /// Values may be bare, single-quoted or double-quoted. `NAME` is
    /// required; a missing `VERSION_CODENAME` yields an empty codename so the
    /// caller's allow-list rejects it with a useful message.
    pub fn parse(content: &str) -> Result<Self> {
        let mut name = None;
        let mut codename = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = unquote(value.trim());
            match key.trim() {
                "NAME" => name = Some(value),
                "VERSION_CODENAME" => codename = Some(value),
                _ => {}
            }
        }

        let name = name.ok_or_else(|| Error::Parse {
            what: "os-release".to_string(),
            message: "missing NAME".to_string(),
        })?;

        Ok(Self {
            name,
            version_codename: codename.unwrap_or_default(),
        })
    }
}

fn unquote(value: &str) -> String {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner.replace("\\\"", "\"").replace("\\\\", "\\");
        }
    }
    value.to_string()
}

/// Retry configuration for transport failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first)
    pub max_attempts: u32,
    /// Base delay between retries
    pub base_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_factor: f64,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BULLSEYE: &str = r#"PRETTY_NAME="Debian GNU/Linux 11 (bullseye)"
NAME="Debian GNU/Linux"
VERSION_ID="11"
VERSION="11 (bullseye)"
VERSION_CODENAME=bullseye
ID=debian
HOME_URL="https://www.debian.org/"
"#;

    #[test]
    fn test_parse_os_release_debian() {
        let release = OsRelease::parse(BULLSEYE).unwrap();
        assert_eq!(release.name, "Debian GNU/Linux");
        assert_eq!(release.version_codename, "bullseye");
    }

    #[test]
    fn test_parse_os_release_single_quotes_and_comments() {
        let content = "# comment\nNAME='Ubuntu'\n\nVERSION_CODENAME='focal'\n";
        let release = OsRelease::parse(content).unwrap();
        assert_eq!(release.name, "Ubuntu");
        assert_eq!(release.version_codename, "focal");
    }

    #[test]
    fn test_parse_os_release_missing_codename() {
        let release = OsRelease::parse("NAME=\"Arch Linux\"\nID=arch\n").unwrap();
        assert_eq!(release.name, "Arch Linux");
        assert_eq!(release.version_codename, "");
    }

    #[test]
    fn test_parse_os_release_missing_name() {
        let err = OsRelease::parse("ID=debian\n").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_command_output_success() {
        assert!(CommandOutput::ok("root\n").success());
        assert!(!CommandOutput::failed(100, "E: Unable to locate package").success());
    }

    #[test]
    fn test_retry_config_backoff() {
        let config = RetryConfig {
            max_attempts: 5,
            ..RetryConfig::default()
        };

        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(8));
    }

    #[test]
    fn test_retry_config_max_delay() {
        let config = RetryConfig {
            max_delay: Duration::from_secs(5),
            ..RetryConfig::default()
        };

        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(5));
    }
}
