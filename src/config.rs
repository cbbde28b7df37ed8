//! Configuration management for clusterctl.
use std::{env, fs, path::Path, time::Duration};

use regex::Regex;
use serde::Deserialize;

use crate::ci::CiConfig;
use crate::cleanup::CleanupConfig;
use crate::connector::RetryPolicy;
use crate::control::ControlPlaneConfig;
use crate::db::DbConfig;
use crate::error::MaintenanceError;
use crate::release::BuildConfig;

/// Represents the structure of the configuration file.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Configuration version.
    pub version: String,
    /// Cluster manager connection settings.
    pub control_plane: ControlPlaneConfig,
    /// Metadata database connection settings.
    pub database: DbConfig,
    /// Build-and-release settings.
    pub build: BuildConfig,
    /// CI platform settings.
    pub ci: CiConfig,
    /// Image registry that tags are promoted into.
    pub registry: String,
    /// Retry discipline for external waits.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Metadata-table lists for cleanup.
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

/// Interval/deadline pair for the bounded-retry connector.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RetryConfig {
    /// Seconds between acquisition attempts.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Total wall-clock budget in seconds.
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
}

fn default_interval_secs() -> u64 {
    15
}

fn default_deadline_secs() -> u64 {
    30 * 60
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            deadline_secs: default_deadline_secs(),
        }
    }
}

impl From<RetryConfig> for RetryPolicy {
    fn from(config: RetryConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_secs),
            deadline: Duration::from_secs(config.deadline_secs),
        }
    }
}

/// Expands `${VAR}` / `$VAR` references within a string from the process
/// environment. Unset variables are an error, not a silent empty string.
fn expand_env_vars(input: &str) -> Result<String, MaintenanceError> {
    let re = Regex::new(r"\$\{?([A-Za-z_][A-Za-z0-9_]*)\}?").expect("static regex");
    let mut missing: Vec<String> = Vec::new();
    let result = re.replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        match env::var(var_name) {
            Ok(value) => value,
            Err(_) => {
                missing.push(var_name.to_string());
                String::new()
            }
        }
    });

    if missing.is_empty() {
        Ok(result.to_string())
    } else {
        Err(MaintenanceError::ConfigRead(std::io::Error::other(
            format!("missing environment variable(s): {}", missing.join(", ")),
        )))
    }
}

/// Loads and parses the configuration file, expanding environment variables.
pub fn load_config(config_path: Option<&str>) -> Result<Config, MaintenanceError> {
    let config_path = config_path.map(Path::new).unwrap_or_else(|| {
        Path::new("clusterctl.yaml")
    });

    let content = fs::read_to_string(config_path).map_err(|e| {
        MaintenanceError::ConfigRead(std::io::Error::new(
            e.kind(),
            format!("{} ({})", e, config_path.display()),
        ))
    })?;

    let expanded = expand_env_vars(&content)?;
    let config: Config =
        serde_yaml::from_str(&expanded).map_err(MaintenanceError::ConfigParse)?;
    Ok(config)
}
