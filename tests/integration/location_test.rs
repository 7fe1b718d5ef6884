//! EC2 metadata location tests using wiremock to simulate IMDSv2.

use rds_datadog_discovery::discovery::location::{
    Ec2MetadataLocation, LocationError, LocationResolver,
};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MAC: &str = "0a:1b:2c:3d:4e:5f";

async fn mount_token(server: &MockServer) {
    Mock::given(method("PUT"))
        .and(path("/latest/api/token"))
        .and(header("X-aws-ec2-metadata-token-ttl-seconds", "60"))
        .respond_with(ResponseTemplate::new(200).set_body_string("mock-token"))
        .mount(server)
        .await;
}

async fn mount_get(server: &MockServer, url_path: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .and(header("X-aws-ec2-metadata-token", "mock-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_identity(server: &MockServer) {
    mount_get(
        server,
        "/latest/dynamic/instance-identity/document",
        r#"{"region": "us-west-2", "instanceId": "i-0123456789abcdef0", "accountId": "123456789012"}"#,
    )
    .await;
}

fn resolver(server: &MockServer, interface: Option<String>) -> Ec2MetadataLocation {
    Ec2MetadataLocation::new(&server.uri(), Duration::from_secs(2), interface).unwrap()
}

#[tokio::test]
async fn test_detects_region_and_vpc() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_identity(&server).await;
    mount_get(&server, "/latest/meta-data/mac", MAC).await;
    mount_get(
        &server,
        &format!("/latest/meta-data/network/interfaces/macs/{}/vpc-id", MAC),
        "vpc-abc\n",
    )
    .await;

    let location = resolver(&server, None).resolve().await.unwrap();
    assert_eq!(location.region, "us-west-2");
    assert_eq!(location.vpc_id, "vpc-abc");
}

#[tokio::test]
async fn test_token_refused_means_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/latest/api/token"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = resolver(&server, None).resolve().await.unwrap_err();
    assert!(matches!(err, LocationError::Unavailable(_)));
}

#[tokio::test]
async fn test_unreachable_endpoint_fails_fast() {
    // Nothing listens on port 9 (discard) in test environments
    let resolver =
        Ec2MetadataLocation::new("http://127.0.0.1:9", Duration::from_millis(200), None).unwrap();

    let err = resolver.resolve().await.unwrap_err();
    assert!(matches!(err, LocationError::Unavailable(_)));
}

#[tokio::test]
async fn test_bad_identity_document() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_get(
        &server,
        "/latest/dynamic/instance-identity/document",
        "not json",
    )
    .await;

    let err = resolver(&server, None).resolve().await.unwrap_err();
    assert!(matches!(err, LocationError::Region(_)));
}

#[tokio::test]
async fn test_missing_mac() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_identity(&server).await;
    Mock::given(method("GET"))
        .and(path("/latest/meta-data/mac"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = resolver(&server, None).resolve().await.unwrap_err();
    assert!(matches!(err, LocationError::Interface { .. }));
}

#[tokio::test]
async fn test_missing_vpc() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_identity(&server).await;
    mount_get(&server, "/latest/meta-data/mac", MAC).await;

    let err = resolver(&server, None).resolve().await.unwrap_err();
    assert!(matches!(err, LocationError::Vpc(_)));
}

#[tokio::test]
async fn test_named_interface_reads_sysfs() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_identity(&server).await;
    mount_get(
        &server,
        &format!("/latest/meta-data/network/interfaces/macs/{}/vpc-id", MAC),
        "vpc-secondary",
    )
    .await;

    let root = std::env::temp_dir().join(format!("rds-discovery-sysfs-{}", std::process::id()));
    std::fs::create_dir_all(root.join("ens6")).unwrap();
    std::fs::write(root.join("ens6").join("address"), "0A:1B:2C:3D:4E:5F\n").unwrap();

    let location = resolver(&server, Some("ens6".to_string()))
        .with_sysfs_root(&root)
        .resolve()
        .await;
    std::fs::remove_dir_all(&root).ok();

    assert_eq!(location.unwrap().vpc_id, "vpc-secondary");
}

#[tokio::test]
async fn test_unknown_interface() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_identity(&server).await;

    let err = resolver(&server, Some("does-not-exist0".to_string()))
        .with_sysfs_root(std::env::temp_dir().join("rds-discovery-no-sysfs"))
        .resolve()
        .await
        .unwrap_err();

    match err {
        LocationError::Interface { interface, .. } => assert_eq!(interface, "does-not-exist0"),
        other => panic!("unexpected error: {:?}", other),
    }
}
