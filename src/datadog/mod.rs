//! Datadog MySQL check configuration.
//!
//! This module defines the data structures rendered into the `mysql.d/conf.yaml`
//! consumed by the Datadog agent. Field names follow the check's schema.

use serde::{Deserialize, Serialize};

/// Tag prefix carrying the (possibly renamed) instance identifier
pub const INSTANCE_TAG: &str = "dbinstanceidentifier";

/// Tag prefix carrying the (possibly renamed) cluster identifier
pub const CLUSTER_TAG: &str = "database_group";

/// One monitored MySQL server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatadogConfig {
    /// Endpoint address
    pub server: String,

    pub user: String,

    pub pass: String,

    pub port: i64,

    /// Connect timeout in seconds
    #[serde(default, skip_serializing_if = "is_zero")]
    pub connect_timeout: i64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    pub options: DatadogOptions,
}

/// Metric toggles of the MySQL check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatadogOptions {
    pub replication: bool,

    #[serde(rename = "extra_status_metrics")]
    pub extra_status: bool,

    #[serde(rename = "extra_innodb_metrics")]
    pub extra_innodb: bool,

    #[serde(rename = "disable_innodb_metrics")]
    pub disable_innodb: bool,

    #[serde(rename = "extra_performance_metrics")]
    pub extra_performance: bool,

    #[serde(rename = "schema_size_metrics")]
    pub schema_size: bool,

    #[serde(rename = "processlist_size")]
    pub process_list: bool,
}

/// The full check configuration document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatadogOuter {
    /// Always empty; the MySQL check takes no init options
    pub init_config: Vec<String>,

    pub instances: Vec<DatadogConfig>,
}

impl DatadogOuter {
    pub fn new(instances: Vec<DatadogConfig>) -> Self {
        Self {
            init_config: Vec::new(),
            instances,
        }
    }

    /// Render the document as YAML
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// Build the two tags every instance carries
pub fn instance_tags(instance_tag: &str, cluster_tag: &str) -> Vec<String> {
    vec![
        format!("{}:{}", INSTANCE_TAG, instance_tag),
        format!("{}:{}", CLUSTER_TAG, cluster_tag),
    ]
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}
