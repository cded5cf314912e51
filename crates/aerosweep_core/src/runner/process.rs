//! Waiting on a child process with timeout and cancellation.

use std::io;
use std::process::{Child, ExitStatus};
use std::time::{Duration, Instant};

use super::RunProgress;

#[derive(Debug)]
pub(crate) enum WaitOutcome {
    Exited(ExitStatus),
    TimedOut,
    Cancelled,
}

/// Poll `child` until it exits, the timeout elapses, or the batch is cancelled.
///
/// On timeout or cancellation the process is killed and reaped before
/// returning, so no zombie outlives the call.
pub(crate) fn wait_for_exit(
    child: &mut Child,
    timeout: Option<Duration>,
    poll_interval: Duration,
    progress: Option<&RunProgress>,
) -> io::Result<WaitOutcome> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(WaitOutcome::Exited(status));
        }

        if progress.is_some_and(RunProgress::is_cancelled) {
            terminate(child)?;
            return Ok(WaitOutcome::Cancelled);
        }

        if let Some(limit) = timeout
            && started.elapsed() >= limit
        {
            terminate(child)?;
            return Ok(WaitOutcome::TimedOut);
        }

        std::thread::sleep(poll_interval);
    }
}

fn terminate(child: &mut Child) -> io::Result<()> {
    match child.kill() {
        Ok(()) => {}
        // Already exited between the last poll and the kill
        Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
        Err(e) => return Err(e),
    }
    child.wait().map(|_| ())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Command;

    #[test]
    fn test_exit_status_is_reported() {
        let mut child = Command::new("sh").args(["-c", "exit 3"]).spawn().unwrap();
        let outcome = wait_for_exit(&mut child, None, Duration::from_millis(5), None).unwrap();
        match outcome {
            WaitOutcome::Exited(status) => assert_eq!(status.code(), Some(3)),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_timeout_kills_process() {
        let mut child = Command::new("sh").args(["-c", "sleep 30"]).spawn().unwrap();
        let started = Instant::now();
        let outcome = wait_for_exit(
            &mut child,
            Some(Duration::from_millis(100)),
            Duration::from_millis(10),
            None,
        )
        .unwrap();
        assert!(matches!(outcome, WaitOutcome::TimedOut));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_cancel_kills_process() {
        let progress = RunProgress::new(1);
        progress.cancel();
        let mut child = Command::new("sh").args(["-c", "sleep 30"]).spawn().unwrap();
        let outcome =
            wait_for_exit(&mut child, None, Duration::from_millis(10), Some(&progress)).unwrap();
        assert!(matches!(outcome, WaitOutcome::Cancelled));
    }
}
