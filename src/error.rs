//! Top-level error type and process exit codes.

use crate::config::ConfigError;
use crate::credentials::CredentialsError;
use crate::discovery::location::LocationError;
use crate::discovery::DiscoveryError;
use crate::pipeline::PipelineError;
use thiserror::Error;

/// Errors that end a run, each mapped to its own exit code
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Failed to render Datadog config: {0}")]
    Render(#[from] serde_yaml::Error),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl AppError {
    /// Exit code identifying the failure site
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Credentials(_) => 10,
            AppError::Config(_) => 12,
            AppError::Location(e) => match e {
                LocationError::Region(_) => 13,
                LocationError::Interface { .. } => 14,
                LocationError::Vpc(_) => 15,
                LocationError::Unavailable(_) => 16,
            },
            AppError::Discovery(e) => discovery_exit_code(e),
            AppError::Pipeline(e) => match e {
                PipelineError::Discovery(e) => discovery_exit_code(e),
                PipelineError::Synthesis(_) => 22,
                PipelineError::ClusterParse(_) => 30,
                PipelineError::InstanceParse(_) => 31,
            },
            AppError::Render(_) => 40,
            AppError::Output(_) => 41,
        }
    }
}

fn discovery_exit_code(err: &DiscoveryError) -> u8 {
    match err {
        DiscoveryError::ConfigUnavailable(_) => 11,
        DiscoveryError::DescribeInstances(_) => 20,
        DiscoveryError::DescribeClusters(_) => 21,
    }
}
