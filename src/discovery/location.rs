//! Network location resolution.
//!
//! A discovery run is scoped to one region and one VPC. Both either come
//! from the operator or are detected through the EC2 instance metadata
//! service (IMDSv2).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Default metadata service base URL (link-local address)
pub const DEFAULT_METADATA_URL: &str = "http://169.254.169.254";

/// Timeout for every metadata request, so non-EC2 hosts fail fast
pub const DEFAULT_METADATA_TIMEOUT: Duration = Duration::from_secs(2);

const TOKEN_PATH: &str = "/latest/api/token";
const IDENTITY_DOCUMENT_PATH: &str = "/latest/dynamic/instance-identity/document";
const MAC_PATH: &str = "/latest/meta-data/mac";
const TOKEN_TTL_HEADER: &str = "X-aws-ec2-metadata-token-ttl-seconds";
const TOKEN_HEADER: &str = "X-aws-ec2-metadata-token";

const SYSFS_NET: &str = "/sys/class/net";

/// Errors that can occur while resolving the network location
#[derive(Error, Debug)]
pub enum LocationError {
    #[error("Can't talk to EC2 metadata endpoint: {0}")]
    Unavailable(String),

    #[error("Can't detect EC2 metadata region: {0}")]
    Region(String),

    #[error("Can't detect MAC address for {interface}: {reason}")]
    Interface { interface: String, reason: String },

    #[error("Can't discover VPC: {0}")]
    Vpc(String),
}

/// Region plus VPC a discovery run is scoped to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub region: String,
    pub vpc_id: String,
}

/// Trait for network location resolvers
#[async_trait]
pub trait LocationResolver: Send + Sync {
    async fn resolve(&self) -> Result<Location, LocationError>;
}

/// Operator-supplied location
#[derive(Debug, Clone)]
pub struct StaticLocation {
    location: Location,
}

impl StaticLocation {
    pub fn new(region: impl Into<String>, vpc_id: impl Into<String>) -> Self {
        Self {
            location: Location {
                region: region.into(),
                vpc_id: vpc_id.into(),
            },
        }
    }
}

#[async_trait]
impl LocationResolver for StaticLocation {
    async fn resolve(&self) -> Result<Location, LocationError> {
        Ok(self.location.clone())
    }
}

#[derive(Debug, Deserialize)]
struct IdentityDocument {
    region: String,
}

/// Location detected from the EC2 instance metadata service
#[derive(Debug, Clone)]
pub struct Ec2MetadataLocation {
    client: Client,
    base_url: String,
    interface: Option<String>,
    sysfs_root: PathBuf,
}

impl Ec2MetadataLocation {
    /// Create a resolver against `base_url`
    ///
    /// With an `interface`, the VPC is looked up for that interface's MAC
    /// (read from sysfs); otherwise for the primary interface reported by
    /// the metadata service.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        interface: Option<String>,
    ) -> Result<Self, LocationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LocationError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            interface,
            sysfs_root: PathBuf::from(SYSFS_NET),
        })
    }

    /// Read interface MACs below `root` instead of `/sys/class/net`
    pub fn with_sysfs_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.sysfs_root = root.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_token(&self) -> Result<String, LocationError> {
        let url = format!("{}{}", self.base_url, TOKEN_PATH);

        let response = self
            .client
            .put(&url)
            .header(TOKEN_TTL_HEADER, "60")
            .send()
            .await
            .map_err(|e| LocationError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LocationError::Unavailable(format!(
                "token request returned http {}",
                response.status().as_u16()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| LocationError::Unavailable(e.to_string()))
    }

    async fn get(&self, token: &str, path: &str) -> Result<String, String> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .header(TOKEN_HEADER, token)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("{} returned http {}", path, status.as_u16()));
        }

        let body = response.text().await.map_err(|e| e.to_string())?;
        Ok(body.trim().to_string())
    }

    async fn region(&self, token: &str) -> Result<String, LocationError> {
        let body = self
            .get(token, IDENTITY_DOCUMENT_PATH)
            .await
            .map_err(LocationError::Region)?;

        let document: IdentityDocument =
            serde_json::from_str(&body).map_err(|e| LocationError::Region(e.to_string()))?;
        Ok(document.region)
    }

    async fn mac(&self, token: &str) -> Result<String, LocationError> {
        match &self.interface {
            Some(interface) => {
                let path = self.sysfs_root.join(interface).join("address");
                std::fs::read_to_string(&path)
                    .map(|mac| mac.trim().to_lowercase())
                    .map_err(|e| LocationError::Interface {
                        interface: interface.clone(),
                        reason: e.to_string(),
                    })
            }
            None => self
                .get(token, MAC_PATH)
                .await
                .map_err(|reason| LocationError::Interface {
                    interface: "primary".to_string(),
                    reason,
                }),
        }
    }
}

#[async_trait]
impl LocationResolver for Ec2MetadataLocation {
    async fn resolve(&self) -> Result<Location, LocationError> {
        let token = self.get_token().await?;

        let region = self.region(&token).await?;
        info!(region = %region, "Detected EC2 metadata region");

        let mac = self.mac(&token).await?;
        info!(
            interface = self.interface.as_deref().unwrap_or("primary"),
            mac = %mac,
            "Detected interface MAC"
        );

        let vpc_path = format!("/latest/meta-data/network/interfaces/macs/{}/vpc-id", mac);
        let vpc_id = self.get(&token, &vpc_path).await.map_err(LocationError::Vpc)?;
        if vpc_id.is_empty() {
            return Err(LocationError::Vpc(format!("{} is empty", vpc_path)));
        }
        info!(vpc_id = %vpc_id, "Detected VPC");

        Ok(Location { region, vpc_id })
    }
}
