use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use hcaas_core::{Connection, ConnectionResolver, DEFAULT_SERVICE_NAME, Timeouts, TsuruSession};
use serde::{Deserialize, Serialize};

use crate::cli::{Cli, OutputFormat};

#[derive(Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct ProfileConfig {
    pub host: Option<String>,
    pub token: Option<String>,
    pub service_name: Option<String>,
    /// Operation timeout in seconds
    pub timeout: Option<u64>,
    pub format: Option<String>,
}

pub type ConfigFile = HashMap<String, ProfileConfig>;

pub const CONFIG_KEYS: &str = "host, token, service_name, timeout, format";

fn config_dir() -> Result<PathBuf> {
    let dir = dirs::home_dir()
        .context("Cannot determine home directory")?
        .join(".hcaas");
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

fn load_all_from(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::new());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))
}

fn save_to(path: &Path, profile: &str, config: ProfileConfig) -> Result<()> {
    let mut all = load_all_from(path)?;
    all.insert(profile.to_string(), config);
    fs::write(path, toml::to_string_pretty(&all)?)?;
    Ok(())
}

pub fn load_profile(profile: &str) -> Result<ProfileConfig> {
    let mut all = load_all_from(&config_path()?)?;
    Ok(all.remove(profile).unwrap_or_default())
}

pub fn save_profile(profile: &str, config: ProfileConfig) -> Result<()> {
    save_to(&config_path()?, profile, config)
}

impl ProfileConfig {
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "host" => self.host = Some(value.to_string()),
            "token" => self.token = Some(value.to_string()),
            "service_name" => self.service_name = Some(value.to_string()),
            "timeout" => {
                let secs = value
                    .parse()
                    .with_context(|| format!("timeout must be a number of seconds, got {value:?}"))?;
                self.timeout = Some(secs);
            }
            "format" => {
                OutputFormat::parse_name(value)
                    .with_context(|| format!("Unknown format {value:?}. Valid: json, yaml, table"))?;
                self.format = Some(value.to_string());
            }
            other => anyhow::bail!("Unknown config key: {other}. Valid keys: {CONFIG_KEYS}"),
        }
        Ok(())
    }
}

/// Settings for one invocation after merging flags/env over the profile.
pub struct Settings {
    pub host: Option<String>,
    pub token: Option<String>,
    pub service_name: String,
    pub timeouts: Timeouts,
    pub format: OutputFormat,
}

impl Settings {
    pub fn merge(cli: &Cli, profile: ProfileConfig) -> Self {
        let timeouts = cli
            .timeout
            .or(profile.timeout)
            .map(|secs| Timeouts::uniform(Duration::from_secs(secs)))
            .unwrap_or_default();
        let format = cli
            .format
            .or_else(|| profile.format.as_deref().and_then(OutputFormat::parse_name))
            .unwrap_or_default();
        Self {
            host: cli.host.clone().or(profile.host),
            token: cli.token.clone().or(profile.token),
            service_name: profile
                .service_name
                .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),
            timeouts,
            format,
        }
    }

    /// Falls back to the active tsuru session for anything not configured.
    pub fn connection(&self) -> Result<Connection> {
        let resolver = ConnectionResolver::new(TsuruSession::from_env()?);
        let connection = resolver.resolve(self.host.as_deref(), self.token.as_deref())?;
        Ok(connection)
    }
}
