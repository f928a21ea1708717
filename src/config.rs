use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("torbridge"))
}

/// Default config file location
pub fn default_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

// ============================================================================
// Config File
// ============================================================================

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub host: HostConfig,
}

/// `[host]` section. Every key is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    pub destination: Option<String>,
    pub port: Option<u16>,
    pub identity_file: Option<String>,
    pub sudo: Option<bool>,
    pub connect_timeout: Option<u64>,
    pub retries: Option<u32>,
    pub local: Option<bool>,
}

impl HostConfig {
    /// Identity file with `~` and environment variables expanded
    pub fn identity_path(&self) -> Result<Option<PathBuf>> {
        self.identity_file
            .as_deref()
            .map(|raw| {
                shellexpand::full(raw)
                    .map(|expanded| PathBuf::from(expanded.as_ref()))
                    .with_context(|| format!("Invalid identity_file path: {raw}"))
            })
            .transpose()
    }
}

impl Config {
    /// Parse config file contents
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid config format")
    }

    /// Load the config file.
    ///
    /// With an explicit `path` the file must exist. Without one the default
    /// location is tried and a missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = default_path()?;
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    log::debug!("no config at {}, using defaults", path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        log::debug!("loaded config from {}", path.display());
        Self::parse(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }
}
