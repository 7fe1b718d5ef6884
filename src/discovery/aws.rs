//! AWS RDS inventory source.
//!
//! Uses the default AWS credential chain (environment, shared config,
//! instance profile) scoped to a single region.

use super::{DiscoveryError, RawCluster, RawClusterMember, RawInstance, RdsSource};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_rds::error::DisplayErrorContext;
use aws_sdk_rds::types::{DbCluster, DbInstance};
use aws_sdk_rds::Client;
use tracing::{debug, info};

/// RDS source backed by `aws-sdk-rds`
pub struct AwsRdsSource {
    client: Client,
    region: String,
}

impl AwsRdsSource {
    /// Load the default AWS configuration for `region` and build a client
    pub async fn from_env(region: &str) -> Result<Self, DiscoveryError> {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        // The default chain always installs a provider; unusable credentials
        // surface on the first describe call instead.
        if config.credentials_provider().is_none() {
            return Err(DiscoveryError::ConfigUnavailable(
                "no AWS credentials provider configured".to_string(),
            ));
        }

        info!(region, "Loaded AWS configuration");

        Ok(Self {
            client: Client::new(&config),
            region: region.to_string(),
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

#[async_trait]
impl RdsSource for AwsRdsSource {
    async fn describe_instances(&self) -> Result<Vec<RawInstance>, DiscoveryError> {
        debug!(region = %self.region, "Describing RDS instances");

        let instances: Vec<DbInstance> = self
            .client
            .describe_db_instances()
            .into_paginator()
            .items()
            .send()
            .collect::<Result<Vec<_>, _>>()
            .await
            .map_err(|e| DiscoveryError::DescribeInstances(DisplayErrorContext(e).to_string()))?;

        Ok(instances.iter().map(raw_instance).collect())
    }

    async fn describe_clusters(&self) -> Result<Vec<RawCluster>, DiscoveryError> {
        debug!(region = %self.region, "Describing RDS clusters");

        let clusters: Vec<DbCluster> = self
            .client
            .describe_db_clusters()
            .into_paginator()
            .items()
            .send()
            .collect::<Result<Vec<_>, _>>()
            .await
            .map_err(|e| DiscoveryError::DescribeClusters(DisplayErrorContext(e).to_string()))?;

        Ok(clusters.iter().map(raw_cluster).collect())
    }

    fn name(&self) -> &'static str {
        "aws-rds"
    }
}

fn raw_instance(instance: &DbInstance) -> RawInstance {
    let endpoint = instance.endpoint();

    RawInstance {
        engine: instance.engine().map(String::from),
        instance_identifier: instance.db_instance_identifier().map(String::from),
        cluster_identifier: instance.db_cluster_identifier().map(String::from),
        replication_source_identifier: instance
            .read_replica_source_db_instance_identifier()
            .map(String::from),
        vpc_id: instance
            .db_subnet_group()
            .and_then(|group| group.vpc_id())
            .map(String::from),
        hostname: endpoint.and_then(|e| e.address()).map(String::from),
        port: endpoint.and_then(|e| e.port()).map(i64::from),
    }
}

fn raw_cluster(cluster: &DbCluster) -> RawCluster {
    RawCluster {
        cluster_identifier: cluster.db_cluster_identifier().map(String::from),
        members: cluster
            .db_cluster_members()
            .iter()
            .map(|member| RawClusterMember {
                instance_identifier: member.db_instance_identifier().map(String::from),
                is_writer: member.is_cluster_writer(),
            })
            .collect(),
    }
}
