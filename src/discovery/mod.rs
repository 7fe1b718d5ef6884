//! RDS inventory sources.
//!
//! This module defines the `RdsSource` trait and the raw records it yields,
//! plus the network location resolvers used to scope a discovery run.
//!
//! # Sources
//!
//! - **AWS** - DescribeDBInstances / DescribeDBClusters via `aws-sdk-rds`
//!
//! Raw records mirror the RDS API: every field is optional and nothing is
//! validated here. Validation happens in [`crate::inventory`].

pub mod aws;
pub mod location;

use async_trait::async_trait;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

/// Errors that can occur while talking to the inventory source
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("AWS configuration unavailable: {0}")]
    ConfigUnavailable(String),

    #[error("Failed to describe RDS instances: {0}")]
    DescribeInstances(String),

    #[error("Failed to describe RDS clusters: {0}")]
    DescribeClusters(String),
}

/// One instance as returned by DescribeDBInstances
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawInstance {
    /// Engine name (`mysql`, `aurora`, `aurora-mysql`, ...)
    pub engine: Option<String>,

    /// DB instance identifier
    pub instance_identifier: Option<String>,

    /// Owning cluster identifier (Aurora variants only)
    pub cluster_identifier: Option<String>,

    /// Identifier of the instance this one replicates from (plain MySQL only)
    pub replication_source_identifier: Option<String>,

    /// VPC of the instance's subnet group
    pub vpc_id: Option<String>,

    /// Endpoint address
    pub hostname: Option<String>,

    /// Endpoint port
    pub port: Option<i64>,
}

/// One member entry of a DescribeDBClusters response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawClusterMember {
    pub instance_identifier: Option<String>,
    pub is_writer: Option<bool>,
}

/// One cluster as returned by DescribeDBClusters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCluster {
    pub cluster_identifier: Option<String>,
    pub members: Vec<RawClusterMember>,
}

/// Trait for RDS inventory sources
///
/// Each method is called at most once per run. Results are unordered.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RdsSource: Send + Sync {
    /// List every DB instance visible in the configured region
    async fn describe_instances(&self) -> Result<Vec<RawInstance>, DiscoveryError>;

    /// List every DB cluster visible in the configured region
    async fn describe_clusters(&self) -> Result<Vec<RawCluster>, DiscoveryError>;

    /// Short name of the source, for logging
    fn name(&self) -> &'static str;
}
