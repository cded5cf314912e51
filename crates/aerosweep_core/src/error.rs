use std::path::PathBuf;
use std::time::Duration;

use crate::model::{CaseIndex, ParamKey};

/// Structural problems with a parameter sweep, detected before any run starts
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("parameter {key} has no candidate values")]
    EmptyValues { key: ParamKey },

    #[error(
        "group {group} varies in lock-step with {expected} values, but {key} has {found} values"
    )]
    GroupLengthMismatch {
        group: usize,
        key: ParamKey,
        expected: usize,
        found: usize,
    },

    #[error("parameter {key} is configured more than once")]
    DuplicateParameter { key: ParamKey },

    #[error("sweep returned {key} in group {group}, below its starting group {start}")]
    GroupBelowStart {
        key: ParamKey,
        group: usize,
        start: usize,
    },

    #[error("sweep file could not be parsed: {0}")]
    Yaml(String),

    #[error("failed to read {path}: {reason}")]
    Read { path: PathBuf, reason: String },
}

/// Why a single case did not produce an output artifact.
///
/// Failures are isolated per case and recorded in its `RunResult`; they never
/// abort sibling cases.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RunFailure {
    #[error("failed to write input artifact {path}: {reason}")]
    InputWrite { path: PathBuf, reason: String },

    #[error("failed to remove stale output {path}: {reason}")]
    StaleOutput { path: PathBuf, reason: String },

    #[error("failed to launch executable: {0}")]
    Spawn(String),

    #[error("process exited with {}", exit_label(.code))]
    NonZeroExit { code: Option<i32> },

    #[error("process exceeded timeout of {after:?}")]
    TimedOut { after: Duration },

    #[error("run cancelled")]
    Cancelled,

    #[error("process succeeded but output {0} is missing")]
    MissingOutput(PathBuf),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

/// Batch-level failures that prevent a run batch from starting
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("failed to prepare output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to build worker pool: {0}")]
    Pool(String),

    #[error("failed to write manifest {path}: {reason}")]
    Manifest { path: PathBuf, reason: String },

    #[error("failed to write input artifact {path}: {reason}")]
    Input { path: PathBuf, reason: String },

    #[error("case {0} appears more than once in the batch")]
    DuplicateCase(CaseIndex),
}

/// Output artifact could not be read into a channel table
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unrecognized output format in {path}: {reason}")]
    Format { path: PathBuf, reason: String },

    #[error("{path} is truncated: header implies {expected} {unit}, found {available}")]
    Truncated {
        path: PathBuf,
        expected: u64,
        available: u64,
        /// What `expected` and `available` count (`bytes` or `values`)
        unit: &'static str,
    },
}

impl IngestError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            IngestError::Io { path, .. }
            | IngestError::Format { path, .. }
            | IngestError::Truncated { path, .. } => path,
        }
    }
}

/// Requested channel is absent from the table a label was loaded against
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("channel {channel:?} not found for {label:?}; available: {}", .available.join(", "))]
pub struct ChannelNotFoundError {
    pub label: String,
    pub channel: String,
    pub available: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SelectError {
    #[error(transparent)]
    ChannelNotFound(#[from] ChannelNotFoundError),

    #[error("label {label:?} refers to table {index}, but only {loaded} tables are loaded")]
    UnknownTable {
        label: String,
        index: usize,
        loaded: usize,
    },
}

/// Failures while handing series to a render sink
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Render(String),
}

/// Violations of the channel table invariants
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TableError {
    #[error("channel {channel:?} has {found} samples, time axis has {expected}")]
    LengthMismatch {
        channel: String,
        expected: usize,
        found: usize,
    },

    #[error("channel {0:?} appears more than once")]
    DuplicateChannel(String),
}
