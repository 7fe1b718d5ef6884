//! RDS Datadog Discovery - Datadog MySQL check config from the RDS inventory.
//!
//! This crate discovers RDS MySQL instances and Aurora MySQL clusters in a
//! VPC, keeps the ones an operator has credentials for, and renders a Datadog
//! `mysql` check configuration with one instance block per database.
//!
//! # Features
//!
//! - **Aurora aware**: writers get extra InnoDB metrics, readers have InnoDB
//!   metrics disabled.
//! - **Replication aware**: MySQL read replicas get replication metrics and
//!   are grouped under their primary.
//! - **Deterministic**: output is sorted by cluster, then instance, so runs
//!   diff cleanly.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use rds_datadog_discovery::{
//!     credentials::IniCredentials, discovery::aws::AwsRdsSource, pipeline::Pipeline,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let credentials = IniCredentials::from_file("passwords.ini")?;
//!     let source = AwsRdsSource::from_env("us-west-2").await?;
//!
//!     let pipeline = Pipeline::new(Arc::new(source), Arc::new(credentials), "vpc-0abc");
//!     let config = pipeline.run_once().await?;
//!
//!     print!("{}", config.to_yaml()?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod credentials;
pub mod datadog;
pub mod discovery;
pub mod error;
pub mod inventory;
pub mod pipeline;
pub mod synthesizer;

pub use config::Config;
pub use error::AppError;
