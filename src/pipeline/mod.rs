//! One-shot discovery pipeline.
//!
//! Runs a single inventory pass:
//! raw API responses → normalized records → VPC filter → credential filter
//! → Datadog configs. Each stage logs its candidate set to help operators
//! see why a database was or wasn't picked up.

use crate::credentials::CredentialsStore;
use crate::datadog::DatadogOuter;
use crate::discovery::{DiscoveryError, RdsSource};
use crate::inventory::{
    filter_by_credentials, filter_by_vpc, parse_cluster_members, sort_states, ClusterMember,
    DatabaseState, InventoryError,
};
use crate::synthesizer::{create_datadog_configs, SynthesisError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that abort a pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Can't parse cluster members: {0}")]
    ClusterParse(#[source] InventoryError),

    #[error("Can't parse RDS info: {0}")]
    InstanceParse(#[source] InventoryError),

    #[error("Synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),
}

/// Discovery pipeline for one VPC
pub struct Pipeline {
    source: Arc<dyn RdsSource>,
    credentials: Arc<dyn CredentialsStore>,
    vpc_id: String,
    skip_unknown_engines: bool,
}

impl Pipeline {
    /// Create a new pipeline
    pub fn new(
        source: Arc<dyn RdsSource>,
        credentials: Arc<dyn CredentialsStore>,
        vpc_id: impl Into<String>,
    ) -> Self {
        Self {
            source,
            credentials,
            vpc_id: vpc_id.into(),
            skip_unknown_engines: false,
        }
    }

    /// Skip instances with an unrecognized engine instead of aborting
    pub fn skip_unknown_engines(mut self, skip: bool) -> Self {
        self.skip_unknown_engines = skip;
        self
    }

    /// Run a single discovery pass
    pub async fn run_once(&self) -> Result<DatadogOuter, PipelineError> {
        info!(source = self.source.name(), vpc_id = %self.vpc_id, "Starting RDS discovery");

        let raw_instances = self.source.describe_instances().await?;
        let raw_clusters = self.source.describe_clusters().await?;

        debug!(
            instances = raw_instances.len(),
            clusters = raw_clusters.len(),
            "Received RDS inventory"
        );

        let mut members: Vec<ClusterMember> = Vec::new();
        for cluster in &raw_clusters {
            members.extend(parse_cluster_members(cluster).map_err(PipelineError::ClusterParse)?);
        }

        let mut states = Vec::with_capacity(raw_instances.len());
        for raw in &raw_instances {
            match DatabaseState::from_raw(raw) {
                Ok(state) => states.push(state),
                Err(InventoryError::UnknownEngine { instance, engine })
                    if self.skip_unknown_engines =>
                {
                    warn!(instance = %instance, engine = %engine, "Skipping instance with unknown engine type");
                }
                Err(e) => return Err(PipelineError::InstanceParse(e)),
            }
        }

        let states = sort_states(states);
        log_candidates("discovered", &states);

        let states = filter_by_vpc(&states, &self.vpc_id);
        log_candidates("vpc_filtered", &states);

        let states = filter_by_credentials(&states, self.credentials.as_ref());
        log_candidates("with_credentials", &states);

        let configs = create_datadog_configs(&states, &members, self.credentials.as_ref())?;

        info!(instances = configs.len(), "RDS discovery complete");

        Ok(DatadogOuter::new(configs))
    }
}

fn log_candidates(stage: &str, states: &[DatabaseState]) {
    info!(stage, count = states.len(), "Candidate instances");
    for state in states {
        info!(stage, cluster = %state.cluster, instance = %state.identifier);
    }
}
