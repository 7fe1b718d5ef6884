//! End-to-end pipeline tests
//!
//! An in-memory `RdsSource` stands in for the RDS API; credentials are parsed
//! from inline INI text.

use async_trait::async_trait;
use rds_datadog_discovery::credentials::{CredentialsStore, IniCredentials};
use rds_datadog_discovery::datadog::DatadogOuter;
use rds_datadog_discovery::discovery::{
    DiscoveryError, RawCluster, RawClusterMember, RawInstance, RdsSource,
};
use rds_datadog_discovery::pipeline::{Pipeline, PipelineError};
use std::sync::Arc;

/// Fixed inventory returned verbatim
struct StaticInventory {
    instances: Vec<RawInstance>,
    clusters: Vec<RawCluster>,
}

#[async_trait]
impl RdsSource for StaticInventory {
    async fn describe_instances(&self) -> Result<Vec<RawInstance>, DiscoveryError> {
        Ok(self.instances.clone())
    }

    async fn describe_clusters(&self) -> Result<Vec<RawCluster>, DiscoveryError> {
        Ok(self.clusters.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

fn aurora_instance(id: &str, cluster: &str, vpc: &str) -> RawInstance {
    RawInstance {
        engine: Some("aurora-mysql".to_string()),
        instance_identifier: Some(id.to_string()),
        cluster_identifier: Some(cluster.to_string()),
        replication_source_identifier: None,
        vpc_id: Some(vpc.to_string()),
        hostname: Some(format!("{}.abc123.us-west-2.rds.amazonaws.com", id)),
        port: Some(3306),
    }
}

fn mysql_instance(id: &str, source: Option<&str>, vpc: &str) -> RawInstance {
    RawInstance {
        engine: Some("mysql".to_string()),
        instance_identifier: Some(id.to_string()),
        cluster_identifier: None,
        replication_source_identifier: source.map(String::from),
        vpc_id: Some(vpc.to_string()),
        hostname: Some(format!("{}.abc123.us-west-2.rds.amazonaws.com", id)),
        port: Some(3306),
    }
}

fn prod_cluster() -> StaticInventory {
    StaticInventory {
        // Deliberately out of order
        instances: vec![
            aurora_instance("prod-2", "prod-cluster", "vpc-abc"),
            aurora_instance("prod-1", "prod-cluster", "vpc-abc"),
        ],
        clusters: vec![RawCluster {
            cluster_identifier: Some("prod-cluster".to_string()),
            members: vec![
                RawClusterMember {
                    instance_identifier: Some("prod-1".to_string()),
                    is_writer: Some(true),
                },
                RawClusterMember {
                    instance_identifier: Some("prod-2".to_string()),
                    is_writer: Some(false),
                },
            ],
        }],
    }
}

fn credentials(content: &str) -> Arc<dyn CredentialsStore> {
    Arc::new(IniCredentials::parse(content).expect("valid INI"))
}

async fn run(
    source: StaticInventory,
    credentials: Arc<dyn CredentialsStore>,
    vpc: &str,
) -> Result<DatadogOuter, PipelineError> {
    Pipeline::new(Arc::new(source), credentials, vpc)
        .run_once()
        .await
}

#[tokio::test]
async fn test_aurora_cluster_in_vpc() {
    let outer = run(
        prod_cluster(),
        credentials("[prod-cluster]\nuser = dd_user\n"),
        "vpc-abc",
    )
    .await
    .unwrap();

    assert_eq!(outer.instances.len(), 2);

    let writer = &outer.instances[0];
    assert_eq!(
        writer.tags,
        vec!["dbinstanceidentifier:prod-1", "database_group:prod-cluster"]
    );
    assert!(writer.options.extra_innodb);
    assert!(!writer.options.disable_innodb);
    assert!(!writer.options.replication);

    let reader = &outer.instances[1];
    assert_eq!(
        reader.tags,
        vec!["dbinstanceidentifier:prod-2", "database_group:prod-cluster"]
    );
    assert!(reader.options.disable_innodb);
    assert!(!reader.options.extra_innodb);
    assert!(!reader.options.replication);

    assert!(outer.instances.iter().all(|c| c.user == "dd_user"));
}

#[tokio::test]
async fn test_aurora_cluster_other_vpc() {
    let outer = run(
        prod_cluster(),
        credentials("[prod-cluster]\nuser = dd_user\n"),
        "vpc-xyz",
    )
    .await
    .unwrap();

    assert!(outer.instances.is_empty());
    assert!(outer.to_yaml().unwrap().contains("instances: []"));
}

#[tokio::test]
async fn test_aurora_cluster_without_credentials() {
    let outer = run(prod_cluster(), credentials("[other-cluster]\n"), "vpc-abc")
        .await
        .unwrap();

    assert!(outer.instances.is_empty());
}

#[tokio::test]
async fn test_mysql_primary_and_replica_share_group() {
    let source = StaticInventory {
        instances: vec![
            mysql_instance("db-a-primary", None, "vpc-abc"),
            mysql_instance("db-a", Some("db-a-primary"), "vpc-abc"),
        ],
        clusters: vec![],
    };

    let outer = run(source, credentials("[db-a-primary]\n"), "vpc-abc")
        .await
        .unwrap();

    assert_eq!(outer.instances.len(), 2);

    // Same cluster, so ordered by instance identifier
    let replica = &outer.instances[0];
    let primary = &outer.instances[1];

    assert_eq!(replica.tags[0], "dbinstanceidentifier:db-a");
    assert_eq!(primary.tags[0], "dbinstanceidentifier:db-a-primary");
    assert_eq!(replica.tags[1], "database_group:db-a-primary");
    assert_eq!(primary.tags[1], "database_group:db-a-primary");

    assert!(replica.options.replication);
    assert!(!primary.options.replication);

    let mut replica_options = replica.options.clone();
    replica_options.replication = false;
    assert_eq!(replica_options, primary.options);
}

#[tokio::test]
async fn test_mysql_replica_without_group_credentials() {
    let source = StaticInventory {
        instances: vec![
            mysql_instance("db-a-primary", None, "vpc-abc"),
            mysql_instance("db-a", Some("db-a-primary"), "vpc-abc"),
        ],
        clusters: vec![],
    };

    // A section named after the replica itself does not match its group
    let outer = run(source, credentials("[db-a]\n"), "vpc-abc").await.unwrap();
    assert!(outer.instances.is_empty());
}

#[tokio::test]
async fn test_output_sorted_across_clusters() {
    let source = StaticInventory {
        instances: vec![
            mysql_instance("zeta", None, "vpc-abc"),
            mysql_instance("alpha", None, "vpc-abc"),
            mysql_instance("mid", None, "vpc-abc"),
        ],
        clusters: vec![],
    };

    let outer = run(source, credentials("[zeta]\n[alpha]\n[mid]\n"), "vpc-abc")
        .await
        .unwrap();

    let groups: Vec<_> = outer.instances.iter().map(|c| c.tags[1].as_str()).collect();
    assert_eq!(
        groups,
        vec![
            "database_group:alpha",
            "database_group:mid",
            "database_group:zeta"
        ]
    );
}

#[tokio::test]
async fn test_rendered_yaml() {
    let outer = run(
        prod_cluster(),
        credentials("[prod-cluster]\nuser = dd_user\npassword = hunter2\nconnect_timeout = 3\n"),
        "vpc-abc",
    )
    .await
    .unwrap();

    let yaml = outer.to_yaml().unwrap();
    assert!(yaml.starts_with("init_config: []"));
    assert!(yaml.contains("server: prod-1.abc123.us-west-2.rds.amazonaws.com"));
    assert!(yaml.contains("user: dd_user"));
    assert!(yaml.contains("pass: hunter2"));
    assert!(yaml.contains("connect_timeout: 3"));
    assert!(yaml.contains("- database_group:prod-cluster"));

    let writer_pos = yaml.find("prod-1.abc123").unwrap();
    let reader_pos = yaml.find("prod-2.abc123").unwrap();
    assert!(writer_pos < reader_pos);
}
