//! Manifests written next to the case artifacts.
//!
//! `case_matrix.yaml` lists every case's assignments before any process starts;
//! `run_summary.yaml` records how each case finished.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::RunResult;
use crate::config::RunConfig;
use crate::error::RunError;
use crate::matrix::CaseMatrix;

pub const CASE_MATRIX_FILE: &str = "case_matrix.yaml";
pub const RUN_SUMMARY_FILE: &str = "run_summary.yaml";

#[derive(Debug, Clone, Serialize)]
struct CaseRecord<'a> {
    case: usize,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    exit_code: Option<i32>,
    elapsed_secs: f64,
    input: &'a Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a Path>,
}

#[derive(Debug, Clone, Serialize)]
struct RunSummary<'a> {
    model_name: &'a str,
    executable: &'a Path,
    started: jiff::Timestamp,
    finished: jiff::Timestamp,
    succeeded: usize,
    failed: usize,
    cases: Vec<CaseRecord<'a>>,
}

/// Write `case_matrix.yaml` into the output directory
pub fn write_case_matrix(config: &RunConfig, matrix: &CaseMatrix) -> Result<PathBuf, RunError> {
    let path = config.output_dir.join(CASE_MATRIX_FILE);
    let yaml = matrix.to_yaml().map_err(|e| RunError::Manifest {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    write(&path, &yaml)?;
    Ok(path)
}

/// Write `run_summary.yaml` into the output directory
pub fn write_run_summary(
    config: &RunConfig,
    results: &[RunResult],
    started: jiff::Timestamp,
    finished: jiff::Timestamp,
) -> Result<PathBuf, RunError> {
    let path = config.output_dir.join(RUN_SUMMARY_FILE);
    let succeeded = results.iter().filter(|r| r.is_success()).count();

    let summary = RunSummary {
        model_name: &config.model_name,
        executable: &config.executable,
        started,
        finished,
        succeeded,
        failed: results.len() - succeeded,
        cases: results
            .iter()
            .map(|r| CaseRecord {
                case: r.case_index.0,
                status: r
                    .failure
                    .as_ref()
                    .map_or_else(|| "ok".to_string(), ToString::to_string),
                exit_code: r.exit_code,
                elapsed_secs: r.elapsed.as_secs_f64(),
                input: &r.input_path,
                output: r.output_path.as_deref(),
            })
            .collect(),
    };

    let yaml = serde_saphyr::to_string(&summary).map_err(|e| RunError::Manifest {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    write(&path, &yaml)?;
    Ok(path)
}

fn write(path: &Path, content: &str) -> Result<(), RunError> {
    std::fs::write(path, content).map_err(|e| RunError::Manifest {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
