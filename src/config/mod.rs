//! Configuration management for RDS discovery.
//!
//! Supports loading configuration from:
//! - An optional YAML settings file (with `${VAR}` expansion)
//! - Command-line arguments and environment variables (applied in `main`)
//!
//! Every field has a default, so running without a settings file is the
//! common case.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

use crate::discovery::location::{DEFAULT_METADATA_TIMEOUT, DEFAULT_METADATA_URL};

static ENV_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is a valid regex"));

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where database credentials are read from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default = "default_credentials_path")]
    pub path: PathBuf,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            path: default_credentials_path(),
        }
    }
}

/// How the region and VPC are determined
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Detect region and VPC through the EC2 instance metadata service
    #[serde(default = "default_ec2_metadata")]
    pub ec2_metadata: bool,

    /// Interface whose VPC is used (primary interface when unset)
    #[serde(default)]
    pub interface: Option<String>,

    /// Region used when metadata detection is disabled
    #[serde(default = "default_region")]
    pub region: String,

    /// VPC used when metadata detection is disabled
    #[serde(default = "default_vpc_id")]
    pub vpc_id: String,

    #[serde(default = "default_metadata_url")]
    pub metadata_url: String,

    #[serde(default = "default_metadata_timeout_secs")]
    pub metadata_timeout_secs: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            ec2_metadata: default_ec2_metadata(),
            interface: None,
            region: default_region(),
            vpc_id: default_vpc_id(),
            metadata_url: default_metadata_url(),
            metadata_timeout_secs: default_metadata_timeout_secs(),
        }
    }
}

impl LocationConfig {
    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }
}

/// Inventory processing settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Skip instances with an unrecognized engine instead of aborting
    #[serde(default)]
    pub skip_unknown_engines: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

// Default value functions
fn default_credentials_path() -> PathBuf {
    PathBuf::from("passwords.ini")
}

fn default_ec2_metadata() -> bool {
    true
}

fn default_region() -> String {
    "us-west-2".to_string()
}

fn default_vpc_id() -> String {
    "dummy".to_string()
}

fn default_metadata_url() -> String {
    DEFAULT_METADATA_URL.to_string()
}

fn default_metadata_timeout_secs() -> u64 {
    DEFAULT_METADATA_TIMEOUT.as_secs()
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(content);
        let config: Config = serde_yaml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.location.ec2_metadata {
            if self.location.region.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "Region is required when EC2 metadata detection is disabled".to_string(),
                ));
            }

            if self.location.vpc_id.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "VPC ID is required when EC2 metadata detection is disabled".to_string(),
                ));
            }
        }

        if self.location.metadata_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "Metadata timeout must be at least 1 second".to_string(),
            ));
        }

        Ok(())
    }
}

/// Expand environment variables in a string using ${VAR} syntax
fn expand_env_vars(input: &str) -> String {
    let mut result = input.to_string();

    for cap in ENV_VAR_PATTERN.captures_iter(input) {
        let var_name = &cap[1];
        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(&cap[0], &value);
        }
    }

    result
}
