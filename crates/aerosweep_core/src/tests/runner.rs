//! Runner behavior against real processes
//!
//! Each test drives a small `/bin/sh` script standing in for the simulator.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use super::fixtures::{shell_config, write_fixture};
use crate::error::{RunError, RunFailure};
use crate::matrix::{ParameterSpec, build_cases};
use crate::model::{CaseIndex, SimulationInput};
use crate::runner::{CASE_MATRIX_FILE, CaseRunner, RUN_SUMMARY_FILE, RunProgress};

fn toggle_matrix(values: usize) -> crate::matrix::CaseMatrix {
    let values = (0..values as i64).map(Into::into).collect();
    build_cases(&[ParameterSpec::new("DISCON_in", "TCIPC_ControlMode", values, 0).unwrap()])
        .unwrap()
}

/// A non-zero exit fails only its own case
#[test]
fn test_failed_case_does_not_abort_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = write_fixture(dir.path(), "template.outb", 15_000.0);
    let script = format!(
        "case \"$1\" in *_1.*) echo 'diverged' >&2; exit 1;; esac\ncp '{}' \"${{1%.*}}.outb\"\n",
        fixture.display()
    );
    let config = shell_config(dir.path(), "IEA15MW", &script);
    let runner = CaseRunner::new(config.clone());

    let results = runner
        .run(&toggle_matrix(2), &SimulationInput::new(), None)
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].case_index, CaseIndex(0));
    assert_eq!(results[0].output_path, Some(config.output_path(CaseIndex(0))));
    assert!(results[0].is_success());

    assert_eq!(results[1].case_index, CaseIndex(1));
    assert_eq!(results[1].output_path, None);
    assert_eq!(results[1].exit_code, Some(1));
    assert_eq!(
        results[1].failure,
        Some(RunFailure::NonZeroExit { code: Some(1) })
    );

    // stderr lands in the per-case log
    let log = std::fs::read_to_string(config.log_path(CaseIndex(1))).unwrap();
    assert!(log.contains("diverged"));

    let summary = std::fs::read_to_string(config.output_dir.join(RUN_SUMMARY_FILE)).unwrap();
    assert!(summary.contains("succeeded: 1"), "{summary}");
    assert!(summary.contains("failed: 1"), "{summary}");
    assert!(config.output_dir.join(CASE_MATRIX_FILE).is_file());
}

/// Clean exit without the expected artifact is still a failure
#[test]
fn test_missing_output_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = shell_config(dir.path(), "model", "exit 0\n");
    let results = CaseRunner::new(config.clone())
        .run(&toggle_matrix(1), &SimulationInput::new(), None)
        .unwrap();
    assert_eq!(
        results[0].failure,
        Some(RunFailure::MissingOutput(config.output_path(CaseIndex(0))))
    );
    assert_eq!(results[0].exit_code, Some(0));
}

/// Every case reads its own input and writes its own output
#[test]
fn test_parallel_cases_never_share_paths() {
    let dir = tempfile::tempdir().unwrap();
    let config = shell_config(dir.path(), "model", "cp \"$1\" \"${1%.*}.outb\"\n");
    let matrix = toggle_matrix(8);
    let results = CaseRunner::new(config.clone())
        .run(&matrix, &SimulationInput::new(), None)
        .unwrap();

    let inputs: HashSet<_> = results.iter().map(|r| r.input_path.clone()).collect();
    let outputs: HashSet<_> = results.iter().filter_map(|r| r.output_path.clone()).collect();
    assert_eq!(inputs.len(), 8);
    assert_eq!(outputs.len(), 8);

    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.case_index, CaseIndex(i));
        let copied = std::fs::read_to_string(result.output_path.as_ref().unwrap()).unwrap();
        assert!(
            copied.contains(&format!("TCIPC_ControlMode: {i}")),
            "case {i} produced {copied}"
        );
    }
}

/// A hung process is killed once the timeout passes
#[test]
fn test_timeout_kills_hung_case() {
    let dir = tempfile::tempdir().unwrap();
    let config = shell_config(dir.path(), "model", "sleep 30\n").with_timeout(1);
    let started = Instant::now();
    let results = CaseRunner::new(config)
        .run(&toggle_matrix(2), &SimulationInput::new(), None)
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(20));
    for result in &results {
        assert_eq!(
            result.failure,
            Some(RunFailure::TimedOut {
                after: Duration::from_secs(1)
            })
        );
        assert!(result.output_path.is_none());
    }
}

/// Cancelling kills running processes and skips the rest, leaving
/// finished outputs intact
#[test]
fn test_cancel_stops_remaining_cases() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = write_fixture(dir.path(), "template.outb", 15_000.0);
    let script = format!(
        "case \"$1\" in *_0.*) cp '{}' \"${{1%.*}}.outb\"; exit 0;; esac\nsleep 30\n",
        fixture.display()
    );
    let config = shell_config(dir.path(), "model", &script).with_max_parallel(2);
    let runner = CaseRunner::new(config);
    let progress = RunProgress::new(0);

    let watcher = {
        let progress = progress.clone();
        std::thread::spawn(move || {
            let deadline = Instant::now() + Duration::from_secs(5);
            while progress.completed() < 1 && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(10));
            }
            progress.cancel();
        })
    };

    let started = Instant::now();
    let results = runner
        .run(&toggle_matrix(4), &SimulationInput::new(), Some(&progress))
        .unwrap();
    watcher.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(20));
    assert_eq!(progress.completed(), 4);
    assert!(results.iter().any(|r| r.failure == Some(RunFailure::Cancelled)));
    for result in &results[1..] {
        assert_eq!(result.failure, Some(RunFailure::Cancelled));
    }
    if let Some(output) = &results[0].output_path {
        assert!(crate::output::load_one(output).is_ok());
    }
}

/// Reusing an index within one batch is rejected before anything runs
#[test]
fn test_duplicate_case_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = shell_config(dir.path(), "model", "exit 0\n");
    let matrix = toggle_matrix(1);
    let twice = vec![matrix.cases()[0].clone(), matrix.cases()[0].clone()];

    let err = CaseRunner::new(config.clone())
        .run_cases(&twice, &SimulationInput::new(), None)
        .unwrap_err();
    assert!(matches!(err, RunError::DuplicateCase(CaseIndex(0))));
    assert!(!config.input_path(CaseIndex(0)).exists());
}

/// An unwritable run summary is logged; the case results still come back
#[test]
fn test_summary_failure_keeps_results() {
    let dir = tempfile::tempdir().unwrap();
    let config = shell_config(dir.path(), "model", "cp \"$1\" \"${1%.*}.outb\"\n");
    std::fs::create_dir_all(config.output_dir.join(RUN_SUMMARY_FILE)).unwrap();

    let results = CaseRunner::new(config.clone())
        .run(&toggle_matrix(2), &SimulationInput::new(), None)
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.is_success()));
    assert!(config.output_path(CaseIndex(1)).is_file());
    assert!(config.output_dir.join(RUN_SUMMARY_FILE).is_dir());
}

/// An earlier artifact that cannot be cleared fails the case instead of
/// passing for fresh output
#[test]
fn test_unremovable_stale_output_fails_case() {
    let dir = tempfile::tempdir().unwrap();
    let config = shell_config(dir.path(), "model", "exit 0\n");
    let stale = config.output_path(CaseIndex(0));
    std::fs::create_dir_all(stale.join("leftover")).unwrap();

    let results = CaseRunner::new(config)
        .run(&toggle_matrix(1), &SimulationInput::new(), None)
        .unwrap();

    match &results[0].failure {
        Some(RunFailure::StaleOutput { path, .. }) => assert_eq!(path, &stale),
        other => panic!("expected stale output failure, got {other:?}"),
    }
    assert!(results[0].output_path.is_none());
    assert_eq!(results[0].exit_code, None);
}

/// With two workers the first two launches are cases 0 and 1
#[test]
fn test_cases_launch_in_index_order() {
    let dir = tempfile::tempdir().unwrap();
    let script = "echo \"$1\" >> ../launches.txt\nsleep 0.3\ncp \"$1\" \"${1%.*}.outb\"\n";
    let config = shell_config(dir.path(), "model", script).with_max_parallel(2);

    let results = CaseRunner::new(config)
        .run(&toggle_matrix(4), &SimulationInput::new(), None)
        .unwrap();
    assert!(results.iter().all(|r| r.is_success()));

    let launches = std::fs::read_to_string(dir.path().join("launches.txt")).unwrap();
    let mut first: Vec<&str> = launches.lines().take(2).collect();
    first.sort_unstable();
    assert_eq!(first, vec!["model_0.yaml", "model_1.yaml"]);
    assert_eq!(launches.lines().count(), 4);
}
