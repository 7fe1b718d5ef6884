//! Normalized RDS inventory.
//!
//! Turns raw instance and cluster descriptions into [`DatabaseState`] and
//! [`ClusterMember`] records, and narrows the instance list down to the
//! databases this host should monitor:
//!
//! - VPC filter (exact match on the subnet group VPC)
//! - Credential filter (a credentials section exists for the cluster)
//!
//! Every stage returns a new collection; nothing is mutated in place.

use crate::credentials::CredentialsStore;
use crate::discovery::{RawCluster, RawInstance};
use std::fmt;
use thiserror::Error;

/// Errors raised while normalizing raw API records
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    #[error("Unknown engine type '{engine}' for instance {instance}")]
    UnknownEngine { instance: String, engine: String },

    #[error("Malformed instance description {instance}: missing {field}")]
    MalformedInstance {
        instance: String,
        field: &'static str,
    },

    #[error("Malformed cluster description {cluster}: missing {field}")]
    MalformedCluster {
        cluster: String,
        field: &'static str,
    },

    #[error("Aurora instance can't be found in any cluster: {0}")]
    MemberNotFound(String),
}

/// Supported engine families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engine {
    Mysql,
    Aurora,
}

impl Engine {
    /// Classify an RDS engine name
    pub fn from_rds(engine: &str) -> Option<Self> {
        match engine {
            "mysql" => Some(Engine::Mysql),
            "aurora" | "aurora-mysql" => Some(Engine::Aurora),
            _ => None,
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Engine::Mysql => write!(f, "mysql"),
            Engine::Aurora => write!(f, "aurora"),
        }
    }
}

/// An instance's role within an Aurora cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterMember {
    pub cluster: String,
    pub instance_identifier: String,
    pub is_writer: bool,
}

/// Normalized view of one discoverable instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseState {
    pub engine: Engine,

    /// Grouping key: the Aurora cluster, or the MySQL replication primary
    pub cluster: String,

    pub identifier: String,
    pub hostname: String,
    pub port: i64,
    pub vpc: String,

    /// Plain MySQL instance replicating from another instance
    pub mysql_replication: bool,
}

impl DatabaseState {
    /// Normalize one raw instance description
    pub fn from_raw(raw: &RawInstance) -> Result<Self, InventoryError> {
        let identifier = raw
            .instance_identifier
            .clone()
            .ok_or_else(|| malformed("<unknown>", "instance identifier"))?;

        let engine_name = raw
            .engine
            .as_deref()
            .ok_or_else(|| malformed(&identifier, "engine"))?;

        let engine =
            Engine::from_rds(engine_name).ok_or_else(|| InventoryError::UnknownEngine {
                instance: identifier.clone(),
                engine: engine_name.to_string(),
            })?;

        let hostname = raw
            .hostname
            .clone()
            .ok_or_else(|| malformed(&identifier, "endpoint address"))?;
        let port = raw
            .port
            .ok_or_else(|| malformed(&identifier, "endpoint port"))?;
        let vpc = raw
            .vpc_id
            .clone()
            .ok_or_else(|| malformed(&identifier, "subnet group VPC"))?;

        let (cluster, mysql_replication) = match engine {
            Engine::Mysql => match raw.replication_source_identifier.as_deref() {
                Some(source) if !source.is_empty() => (source.to_string(), true),
                _ => (identifier.clone(), false),
            },
            Engine::Aurora => {
                let cluster = raw
                    .cluster_identifier
                    .clone()
                    .ok_or_else(|| malformed(&identifier, "cluster identifier"))?;
                (cluster, false)
            }
        };

        Ok(Self {
            engine,
            cluster,
            identifier,
            hostname,
            port,
            vpc,
            mysql_replication,
        })
    }
}

fn malformed(instance: &str, field: &'static str) -> InventoryError {
    InventoryError::MalformedInstance {
        instance: instance.to_string(),
        field,
    }
}

/// Flatten one cluster description into membership facts
pub fn parse_cluster_members(cluster: &RawCluster) -> Result<Vec<ClusterMember>, InventoryError> {
    let cluster_id =
        cluster
            .cluster_identifier
            .clone()
            .ok_or_else(|| InventoryError::MalformedCluster {
                cluster: "<unknown>".to_string(),
                field: "cluster identifier",
            })?;

    cluster
        .members
        .iter()
        .map(|member| {
            let instance_identifier = member.instance_identifier.clone().ok_or_else(|| {
                InventoryError::MalformedCluster {
                    cluster: cluster_id.clone(),
                    field: "member instance identifier",
                }
            })?;
            let is_writer = member
                .is_writer
                .ok_or_else(|| InventoryError::MalformedCluster {
                    cluster: cluster_id.clone(),
                    field: "member writer flag",
                })?;

            Ok(ClusterMember {
                cluster: cluster_id.clone(),
                instance_identifier,
                is_writer,
            })
        })
        .collect()
}

/// Find an instance's membership fact (case-insensitive on the identifier)
pub fn find_aurora_member<'a>(
    members: &'a [ClusterMember],
    identifier: &str,
) -> Result<&'a ClusterMember, InventoryError> {
    members
        .iter()
        .find(|m| m.instance_identifier.eq_ignore_ascii_case(identifier))
        .ok_or_else(|| InventoryError::MemberNotFound(identifier.to_string()))
}

/// Order by cluster, then instance identifier
pub fn sort_states(mut states: Vec<DatabaseState>) -> Vec<DatabaseState> {
    states.sort_by(|a, b| {
        a.cluster
            .cmp(&b.cluster)
            .then_with(|| a.identifier.cmp(&b.identifier))
    });
    states
}

/// Keep the instances living in `vpc`
pub fn filter_by_vpc(states: &[DatabaseState], vpc: &str) -> Vec<DatabaseState> {
    states.iter().filter(|s| s.vpc == vpc).cloned().collect()
}

/// Keep the instances whose cluster has a credentials section
pub fn filter_by_credentials(
    states: &[DatabaseState],
    credentials: &dyn CredentialsStore,
) -> Vec<DatabaseState> {
    states
        .iter()
        .filter(|s| credentials.has_section(&s.cluster))
        .cloned()
        .collect()
}
