//! Database credentials store.
//!
//! Credentials live in an INI file with one section per cluster identifier.
//! Keys before the first section header (or in a `[DEFAULT]` section) form the
//! global section, addressed here by the empty section name.
//!
//! ```ini
//! user = datadog
//!
//! [prod-cluster]
//! user = dd_user
//! password = secret
//! connect_timeout = 3
//! extra_performance = true
//! rename_cluster = prod
//! rename_instance_prod-1 = prod-writer
//! ```

use ini::{Ini, ParseOption, Properties};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

/// Key holding the connection user
pub const KEY_USER: &str = "user";
/// Key holding the connection password
pub const KEY_PASSWORD: &str = "password";
/// Key holding the connect timeout in seconds
pub const KEY_CONNECT_TIMEOUT: &str = "connect_timeout";
/// Key enabling extra performance_schema metrics
pub const KEY_EXTRA_PERFORMANCE: &str = "extra_performance";
/// Key overriding the `database_group` tag
pub const KEY_RENAME_CLUSTER: &str = "rename_cluster";
/// Prefix of the per-instance `dbinstanceidentifier` tag override
pub const KEY_RENAME_INSTANCE_PREFIX: &str = "rename_instance_";

/// Name of the global section
pub const GLOBAL_SECTION: &str = "";

const DEFAULT_SECTION_HEADER: &str = "DEFAULT";

/// Errors that can occur while loading credentials
#[derive(Error, Debug)]
pub enum CredentialsError {
    #[error("Can't load credentials file {path}: {source}")]
    LoadError {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("Failed to parse credentials: {0}")]
    ParseError(#[from] ini::ParseError),
}

/// Typed lookups over a sectioned key-value store
///
/// Missing sections, missing or empty keys and unparsable values all yield
/// the caller-supplied default.
#[cfg_attr(test, automock)]
pub trait CredentialsStore: Send + Sync {
    /// Whether a section with this exact name exists
    fn has_section(&self, section: &str) -> bool;

    fn get_string(&self, section: &str, key: &str, default: &str) -> String;

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;
}

/// INI-backed credentials store
#[derive(Debug, Clone)]
pub struct IniCredentials {
    ini: Ini,
}

impl IniCredentials {
    /// Load credentials from an INI file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CredentialsError> {
        let path = path.as_ref();
        let ini = Ini::load_from_file_opt(path, parse_option()).map_err(|source| {
            CredentialsError::LoadError {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Ok(Self { ini })
    }

    /// Parse credentials from INI text
    pub fn parse(content: &str) -> Result<Self, CredentialsError> {
        Ok(Self {
            ini: Ini::load_from_str_opt(content, parse_option())?,
        })
    }

    /// Names of all cluster sections, in file order
    pub fn sections(&self) -> Vec<&str> {
        self.ini
            .sections()
            .flatten()
            .filter(|name| *name != DEFAULT_SECTION_HEADER)
            .collect()
    }

    fn lookup(&self, section: &str, key: &str) -> Option<&str> {
        if section == GLOBAL_SECTION {
            return self
                .ini
                .section(None::<String>)
                .and_then(|props| last_value(props, key))
                .or_else(|| {
                    self.ini
                        .section(Some(DEFAULT_SECTION_HEADER))
                        .and_then(|props| last_value(props, key))
                });
        }

        self.ini
            .section(Some(section))
            .and_then(|props| last_value(props, key))
    }
}

/// Values are taken verbatim: backslashes are literal characters
fn parse_option() -> ParseOption {
    ParseOption {
        enabled_escape: false,
        ..Default::default()
    }
}

/// Last non-blank value of `key`; a repeated key overrides earlier ones
fn last_value<'a>(props: &'a Properties, key: &str) -> Option<&'a str> {
    props
        .get_all(key)
        .last()
        .filter(|value| !value.trim().is_empty())
}

impl CredentialsStore for IniCredentials {
    fn has_section(&self, section: &str) -> bool {
        !section.is_empty() && self.ini.section(Some(section)).is_some()
    }

    fn get_string(&self, section: &str, key: &str, default: &str) -> String {
        self.lookup(section, key)
            .map(str::to_string)
            .unwrap_or_else(|| default.to_string())
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.lookup(section, key)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.lookup(section, key)
            .and_then(parse_bool)
            .unwrap_or(default)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "t" | "true" | "y" | "yes" | "on" => Some(true),
        "0" | "f" | "false" | "n" | "no" | "off" => Some(false),
        _ => None,
    }
}
