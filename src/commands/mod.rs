pub mod run;
pub mod status;

use anyhow::{Result, bail};
use hostkit::{Host, LocalHost, RetryConfig, SshHost};
use std::path::PathBuf;

use crate::cli::TargetArgs;
use crate::config::HostConfig;

/// Seconds `ssh` waits for the TCP connection unless configured otherwise.
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 10;

/// Connection attempts unless configured otherwise.
pub const DEFAULT_RETRIES: u32 = 3;

/// Set for every command so package installs never prompt.
const NONINTERACTIVE_ENV: (&str, &str) = ("DEBIAN_FRONTEND", "noninteractive");

/// Where and how to connect, after merging command line over config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSettings {
    pub destination: Option<String>,
    pub port: Option<u16>,
    pub identity_file: Option<PathBuf>,
    pub sudo: bool,
    pub connect_timeout: u64,
    pub retries: u32,
    pub local: bool,
}

impl HostSettings {
    /// Command-line options win over the file. `--host` also overrides a
    /// `local = true` in the file.
    pub fn resolve(file: &HostConfig, args: &TargetArgs) -> Result<Self> {
        let identity_file = match &args.identity {
            Some(path) => Some(path.clone()),
            None => file.identity_path()?,
        };

        Ok(Self {
            destination: args.host.clone().or_else(|| file.destination.clone()),
            port: args.port.or(file.port),
            identity_file,
            sudo: args.sudo || file.sudo.unwrap_or(false),
            connect_timeout: file.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            retries: file.retries.unwrap_or(DEFAULT_RETRIES).max(1),
            local: args.local || (args.host.is_none() && file.local.unwrap_or(false)),
        })
    }

    /// Build the host backend.
    pub fn connect(&self) -> Result<Box<dyn Host>> {
        let (key, value) = NONINTERACTIVE_ENV;

        if self.local {
            log::debug!("using local host (sudo: {})", self.sudo);
            return Ok(Box::new(LocalHost::new().sudo(self.sudo).env(key, value)));
        }

        let Some(destination) = &self.destination else {
            bail!("No target host: pass --host, or set destination in the [host] config section");
        };

        let retry = RetryConfig {
            max_attempts: self.retries,
            ..RetryConfig::default()
        };

        let mut host = SshHost::new(destination.as_str())
            .connect_timeout(self.connect_timeout)
            .sudo(self.sudo)
            .env(key, value)
            .retry(retry);
        if let Some(port) = self.port {
            host = host.port(port);
        }
        if let Some(identity) = &self.identity_file {
            host = host.identity_file(identity.clone());
        }

        log::debug!("ssh {}", host.ssh_args().join(" "));
        Ok(Box::new(host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> HostConfig {
        HostConfig {
            destination: Some("root@from-file".to_string()),
            port: Some(2222),
            identity_file: Some("/keys/file_key".to_string()),
            sudo: Some(false),
            connect_timeout: Some(5),
            retries: Some(0),
            local: None,
        }
    }

    #[test]
    fn test_defaults_without_file_or_flags() {
        let settings =
            HostSettings::resolve(&HostConfig::default(), &TargetArgs::default()).unwrap();
        assert_eq!(
            settings,
            HostSettings {
                destination: None,
                port: None,
                identity_file: None,
                sudo: false,
                connect_timeout: DEFAULT_CONNECT_TIMEOUT,
                retries: DEFAULT_RETRIES,
                local: false,
            }
        );
    }

    #[test]
    fn test_file_values_used_when_no_flags() {
        let settings = HostSettings::resolve(&file(), &TargetArgs::default()).unwrap();
        assert_eq!(settings.destination.as_deref(), Some("root@from-file"));
        assert_eq!(settings.port, Some(2222));
        assert_eq!(settings.identity_file, Some(PathBuf::from("/keys/file_key")));
        assert_eq!(settings.connect_timeout, 5);
        assert_eq!(settings.retries, 1);
    }

    #[test]
    fn test_flags_override_file() {
        let args = TargetArgs {
            host: Some("admin@from-flag".to_string()),
            port: Some(22),
            identity: Some(PathBuf::from("/keys/flag_key")),
            sudo: true,
            ..TargetArgs::default()
        };
        let settings = HostSettings::resolve(&file(), &args).unwrap();
        assert_eq!(settings.destination.as_deref(), Some("admin@from-flag"));
        assert_eq!(settings.port, Some(22));
        assert_eq!(settings.identity_file, Some(PathBuf::from("/keys/flag_key")));
        assert!(settings.sudo);
    }

    #[test]
    fn test_host_flag_overrides_local_in_file() {
        let config = HostConfig {
            local: Some(true),
            ..HostConfig::default()
        };
        let args = TargetArgs {
            host: Some("bridge".to_string()),
            ..TargetArgs::default()
        };
        assert!(!HostSettings::resolve(&config, &args).unwrap().local);
        assert!(HostSettings::resolve(&config, &TargetArgs::default()).unwrap().local);
    }

    #[test]
    fn test_connect_requires_destination() {
        let settings =
            HostSettings::resolve(&HostConfig::default(), &TargetArgs::default()).unwrap();
        let err = settings.connect().err().unwrap();
        assert!(err.to_string().contains("No target host"));
    }

    #[test]
    fn test_connect_builds_ssh_and_local_hosts() {
        let ssh = HostSettings::resolve(&file(), &TargetArgs::default())
            .unwrap()
            .connect()
            .unwrap();
        assert_eq!(ssh.name(), "root@from-file");

        let local = HostSettings::resolve(
            &HostConfig::default(),
            &TargetArgs {
                local: true,
                ..TargetArgs::default()
            },
        )
        .unwrap()
        .connect()
        .unwrap();
        assert_eq!(local.name(), "localhost");
    }
}
