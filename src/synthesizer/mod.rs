//! Datadog config synthesis.
//!
//! Produces one [`DatadogConfig`] per filtered [`DatabaseState`]. Connection
//! settings and tag overrides come from the credentials section named by the
//! instance's cluster; metric toggles depend on engine and replication role:
//!
//! | Instance        | extra InnoDB | disable InnoDB | replication |
//! |-----------------|--------------|----------------|-------------|
//! | Aurora writer   | yes          | no             | no          |
//! | Aurora reader   | no           | yes            | no          |
//! | MySQL primary   | yes          | no             | no          |
//! | MySQL replica   | yes          | no             | yes         |

use crate::credentials::{
    CredentialsStore, GLOBAL_SECTION, KEY_CONNECT_TIMEOUT, KEY_EXTRA_PERFORMANCE, KEY_PASSWORD,
    KEY_RENAME_CLUSTER, KEY_RENAME_INSTANCE_PREFIX, KEY_USER,
};
use crate::datadog::{instance_tags, DatadogConfig, DatadogOptions};
use crate::inventory::{find_aurora_member, ClusterMember, DatabaseState, Engine, InventoryError};
use thiserror::Error;
use tracing::debug;

/// Username used when neither the cluster nor the global section sets one
pub const DEFAULT_USERNAME: &str = "dummy_username";

/// Password used when the cluster section sets none
pub const DEFAULT_PASSWORD: &str = "dummy_password";

/// Connect timeout (seconds) used when the cluster section sets none
pub const DEFAULT_CONNECT_TIMEOUT: i64 = 1;

/// Errors that abort synthesis
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("Inventory sources disagree: {0}")]
    Inconsistent(#[from] InventoryError),
}

/// Build the Datadog config for every instance, preserving input order
pub fn create_datadog_configs(
    states: &[DatabaseState],
    members: &[ClusterMember],
    credentials: &dyn CredentialsStore,
) -> Result<Vec<DatadogConfig>, SynthesisError> {
    let default_username = credentials.get_string(GLOBAL_SECTION, KEY_USER, DEFAULT_USERNAME);

    states
        .iter()
        .map(|state| create_datadog_config(state, members, credentials, &default_username))
        .collect()
}

fn create_datadog_config(
    state: &DatabaseState,
    members: &[ClusterMember],
    credentials: &dyn CredentialsStore,
    default_username: &str,
) -> Result<DatadogConfig, SynthesisError> {
    let section = state.cluster.as_str();

    let cluster_tag = credentials.get_string(section, KEY_RENAME_CLUSTER, &state.cluster);
    let instance_tag = credentials.get_string(
        section,
        &format!("{}{}", KEY_RENAME_INSTANCE_PREFIX, state.identifier),
        &state.identifier,
    );

    let mut options = DatadogOptions {
        schema_size: true,
        process_list: true,
        extra_status: true,
        extra_performance: credentials.get_bool(section, KEY_EXTRA_PERFORMANCE, false),
        ..Default::default()
    };

    match state.engine {
        Engine::Aurora => {
            let member = find_aurora_member(members, &state.identifier)?;
            options.replication = false;
            options.extra_innodb = member.is_writer;
            options.disable_innodb = !member.is_writer;
        }
        Engine::Mysql => {
            options.extra_innodb = true;
            options.disable_innodb = false;
            options.replication = state.mysql_replication;
        }
    }

    debug!(
        cluster = %state.cluster,
        instance = %state.identifier,
        engine = %state.engine,
        "Synthesized Datadog config"
    );

    Ok(DatadogConfig {
        server: state.hostname.clone(),
        user: credentials.get_string(section, KEY_USER, default_username),
        pass: credentials.get_string(section, KEY_PASSWORD, DEFAULT_PASSWORD),
        port: state.port,
        connect_timeout: credentials.get_int(section, KEY_CONNECT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT),
        tags: instance_tags(&instance_tag, &cluster_tag),
        options,
    })
}
