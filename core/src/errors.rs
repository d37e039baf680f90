use std::path::PathBuf;

use crate::types::topology::OsdId;

// ---------------------------------------------------------------------------
// Cluster client errors
// ---------------------------------------------------------------------------

/// Failures surfaced by a `CephClient` implementation.
#[derive(Debug, thiserror::Error)]
pub enum CephError {
    /// The admin command could not be started at all.
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The admin command ran but exited unsuccessfully.
    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// The command output was not the JSON document we expected.
    #[error("cannot decode output of `{command}`: {source}")]
    Decode {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    /// The cluster name cannot be derived from the ceph.conf path.
    #[error("invalid ceph conf: {0:?}")]
    InvalidConf(PathBuf),

    /// Rejected by the cluster or a test double.
    #[error("{0}")]
    Rejected(String),
}

// ---------------------------------------------------------------------------
// Controller errors
// ---------------------------------------------------------------------------

/// Configuration and setup failures. All of these are fatal at construction.
#[derive(Debug, thiserror::Error)]
pub enum RebalancerError {
    #[error("no weight map found")]
    EmptyTargets,

    #[error("no ceph client found")]
    MissingClient,

    #[error("weight increment must be a finite, non-negative number, got {0}")]
    InvalidIncrement(f64),

    #[error("target weight for osd.{osd} must be a finite, non-negative number, got {weight}")]
    InvalidTargetWeight { osd: OsdId, weight: f64 },

    /// The `id:weight,id:weight` target list could not be parsed.
    #[error("invalid target weights: {0}")]
    TargetSpec(String),

    #[error("cannot read settings file {path:?}: {source}")]
    SettingsIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse settings file {path:?}: {source}")]
    SettingsParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Ceph(#[from] CephError),
}
