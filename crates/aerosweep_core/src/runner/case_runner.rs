use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use tracing::{debug, info, warn};

use super::process::{WaitOutcome, wait_for_exit};
use super::{RunProgress, write_case_matrix, write_run_summary};
use crate::config::RunConfig;
use crate::error::{RunError, RunFailure};
use crate::matrix::{Case, CaseMatrix};
use crate::model::{CaseIndex, SimulationInput};

/// Outcome of one case's run. Never mutated after the runner returns it.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub case_index: CaseIndex,
    /// Materialized input artifact
    pub input_path: PathBuf,
    /// Produced output artifact; `None` when the case failed
    pub output_path: Option<PathBuf>,
    /// Process exit code, when the process ran to completion
    pub exit_code: Option<i32>,
    pub failure: Option<RunFailure>,
    pub elapsed: Duration,
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    fn failed(
        case_index: CaseIndex,
        input_path: PathBuf,
        failure: RunFailure,
        elapsed: Duration,
    ) -> Self {
        Self {
            case_index,
            input_path,
            output_path: None,
            exit_code: None,
            failure: Some(failure),
            elapsed,
        }
    }
}

/// Runs cases against an external executable, one process per case.
#[derive(Debug, Clone)]
pub struct CaseRunner {
    config: RunConfig,
}

impl CaseRunner {
    #[must_use]
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run every case of `matrix`, writing `case_matrix.yaml` first when
    /// manifests are enabled.
    pub fn run(
        &self,
        matrix: &CaseMatrix,
        base: &SimulationInput,
        progress: Option<&RunProgress>,
    ) -> Result<Vec<RunResult>, RunError> {
        self.prepare_output_dir()?;
        if self.config.write_manifest {
            write_case_matrix(&self.config, matrix)?;
        }
        self.run_cases(matrix.cases(), base, progress)
    }

    /// Write `case_matrix.yaml` and every case's input artifact without
    /// launching any process. Returns the input paths in case order.
    pub fn prepare(
        &self,
        matrix: &CaseMatrix,
        base: &SimulationInput,
    ) -> Result<Vec<PathBuf>, RunError> {
        self.prepare_output_dir()?;
        if self.config.write_manifest {
            write_case_matrix(&self.config, matrix)?;
        }
        matrix
            .iter()
            .map(|case| {
                let path = self.config.input_path(case.index);
                write_input(&path, &case.materialize(base))
                    .map_err(|reason| RunError::Input {
                        path: path.clone(),
                        reason,
                    })
                    .map(|()| path)
            })
            .collect()
    }

    /// Run an arbitrary slice of cases.
    ///
    /// Results come back in input order. Per-case failures are recorded in the
    /// corresponding `RunResult`; only batch setup problems return `Err`.
    pub fn run_cases(
        &self,
        cases: &[Case],
        base: &SimulationInput,
        progress: Option<&RunProgress>,
    ) -> Result<Vec<RunResult>, RunError> {
        let mut seen = FxHashSet::default();
        for case in cases {
            if !seen.insert(case.index) {
                return Err(RunError::DuplicateCase(case.index));
            }
        }

        self.prepare_output_dir()?;
        let executable = resolve_executable(&self.config.executable);

        if let Some(p) = progress {
            p.reset(cases.len());
        }

        info!(
            cases = cases.len(),
            workers = self.config.worker_count(),
            executable = %executable.display(),
            output_dir = %self.config.output_dir.display(),
            "starting run batch"
        );
        let started = jiff::Timestamp::now();

        let results = self.dispatch(cases, base, &executable, progress)?;

        let finished = jiff::Timestamp::now();
        let failed = results.iter().filter(|r| !r.is_success()).count();
        info!(
            succeeded = results.len() - failed,
            failed, "run batch finished"
        );

        // Results come back even when the summary cannot be written
        if self.config.write_manifest
            && let Err(e) = write_run_summary(&self.config, &results, started, finished)
        {
            warn!("run summary not written: {e}");
        }
        Ok(results)
    }

    #[cfg(feature = "parallel")]
    fn dispatch(
        &self,
        cases: &[Case],
        base: &SimulationInput,
        executable: &Path,
        progress: Option<&RunProgress>,
    ) -> Result<Vec<RunResult>, RunError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.worker_count())
            .thread_name(|i| format!("case-worker-{i}"))
            .build()
            .map_err(|e| RunError::Pool(e.to_string()))?;

        // Workers pull cases off a shared iterator so launches follow index order
        let mut results: Vec<(usize, RunResult)> = pool.install(|| {
            cases
                .iter()
                .enumerate()
                .par_bridge()
                .map(|(pos, case)| (pos, self.run_case(case, base, executable, progress)))
                .collect()
        });
        results.sort_unstable_by_key(|(pos, _)| *pos);
        Ok(results.into_iter().map(|(_, result)| result).collect())
    }

    #[cfg(not(feature = "parallel"))]
    fn dispatch(
        &self,
        cases: &[Case],
        base: &SimulationInput,
        executable: &Path,
        progress: Option<&RunProgress>,
    ) -> Result<Vec<RunResult>, RunError> {
        Ok(cases
            .iter()
            .map(|case| self.run_case(case, base, executable, progress))
            .collect())
    }

    fn prepare_output_dir(&self) -> Result<(), RunError> {
        std::fs::create_dir_all(&self.config.output_dir).map_err(|source| RunError::OutputDir {
            path: self.config.output_dir.clone(),
            source,
        })
    }

    fn run_case(
        &self,
        case: &Case,
        base: &SimulationInput,
        executable: &Path,
        progress: Option<&RunProgress>,
    ) -> RunResult {
        let result = self.execute(case, base, executable, progress);
        match &result.failure {
            None => debug!(case = %case.index, elapsed = ?result.elapsed, "case finished"),
            Some(failure) => warn!(case = %case.index, %failure, "case failed"),
        }
        if let Some(p) = progress {
            p.record(result.is_success());
        }
        result
    }

    fn execute(
        &self,
        case: &Case,
        base: &SimulationInput,
        executable: &Path,
        progress: Option<&RunProgress>,
    ) -> RunResult {
        let index = case.index;
        let input_path = self.config.input_path(index);
        let output_path = self.config.output_path(index);
        let started = Instant::now();

        if progress.is_some_and(RunProgress::is_cancelled) {
            return RunResult::failed(index, input_path, RunFailure::Cancelled, Duration::ZERO);
        }

        // Input is fully written before the process starts
        if let Err(reason) = write_input(&input_path, &case.materialize(base)) {
            return RunResult::failed(
                index,
                input_path.clone(),
                RunFailure::InputWrite {
                    path: input_path,
                    reason,
                },
                started.elapsed(),
            );
        }

        // A stale artifact from an earlier batch must not pass for this run's output
        if let Err(e) = std::fs::remove_file(&output_path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            return RunResult::failed(
                index,
                input_path,
                RunFailure::StaleOutput {
                    path: output_path,
                    reason: e.to_string(),
                },
                started.elapsed(),
            );
        }

        let (stdout, stderr) = self.log_streams(index);
        debug!(case = %index, input = %input_path.display(), "launching case");

        let spawned = Command::new(executable)
            .args(&self.config.args)
            .arg(self.config.input_file_name(index))
            .current_dir(&self.config.output_dir)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                return RunResult::failed(
                    index,
                    input_path,
                    RunFailure::Spawn(e.to_string()),
                    started.elapsed(),
                );
            }
        };

        let timeout = self.config.timeout();
        let outcome = match wait_for_exit(&mut child, timeout, self.config.poll_interval(), progress)
        {
            Ok(outcome) => outcome,
            Err(e) => {
                return RunResult::failed(
                    index,
                    input_path,
                    RunFailure::Spawn(format!("lost track of process: {e}")),
                    started.elapsed(),
                );
            }
        };
        let elapsed = started.elapsed();

        match outcome {
            WaitOutcome::Exited(status) if status.success() => {
                if output_path.is_file() {
                    RunResult {
                        case_index: index,
                        input_path,
                        output_path: Some(output_path),
                        exit_code: status.code(),
                        failure: None,
                        elapsed,
                    }
                } else {
                    RunResult {
                        exit_code: status.code(),
                        ..RunResult::failed(
                            index,
                            input_path,
                            RunFailure::MissingOutput(output_path),
                            elapsed,
                        )
                    }
                }
            }
            WaitOutcome::Exited(status) => RunResult {
                exit_code: status.code(),
                ..RunResult::failed(
                    index,
                    input_path,
                    RunFailure::NonZeroExit {
                        code: status.code(),
                    },
                    elapsed,
                )
            },
            WaitOutcome::TimedOut => RunResult::failed(
                index,
                input_path,
                RunFailure::TimedOut {
                    after: timeout.unwrap_or(elapsed),
                },
                elapsed,
            ),
            WaitOutcome::Cancelled => {
                RunResult::failed(index, input_path, RunFailure::Cancelled, elapsed)
            }
        }
    }

    /// Stdout and stderr both go to `<model>_<index>.log`; falls back to
    /// discarding them if the log cannot be created.
    fn log_streams(&self, index: CaseIndex) -> (Stdio, Stdio) {
        let log_path = self.config.log_path(index);
        let opened = File::create(&log_path).and_then(|f| {
            let clone = f.try_clone()?;
            Ok((f, clone))
        });
        match opened {
            Ok((out, err)) => (Stdio::from(out), Stdio::from(err)),
            Err(e) => {
                warn!(path = %log_path.display(), "failed to create case log: {e}");
                (Stdio::null(), Stdio::null())
            }
        }
    }
}

fn write_input(path: &Path, input: &SimulationInput) -> Result<(), String> {
    let yaml = input.to_yaml().map_err(|e| e.to_string())?;
    std::fs::write(path, yaml).map_err(|e| e.to_string())
}

/// Bare program names are left for `PATH` lookup; anything with a directory
/// component is made absolute, since each case runs in another working directory.
fn resolve_executable(executable: &Path) -> PathBuf {
    if executable.components().count() <= 1 {
        return executable.to_path_buf();
    }
    std::path::absolute(executable).unwrap_or_else(|_| executable.to_path_buf())
}
