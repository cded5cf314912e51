//! File logging for the command-line front end.
//!
//! Everything goes to one append-only file. Its size is bounded by trimming
//! it at start-up according to a [`LogPolicy`].

use std::fs::{self, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE: &str = "aerosweep.log";

const MIB: u64 = 1024 * 1024;
const TRIM_MARKER: &[u8] = b"--- earlier entries trimmed ---\n";

/// Default log directory: `~/.aerosweep/`
pub fn default_log_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".aerosweep")
}

/// Location, verbosity and size bound of the log file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPolicy {
    pub dir: PathBuf,
    /// Level for the front end; `RUST_LOG` takes precedence when set
    pub level: String,
    /// Size past which the file is trimmed at start-up
    pub max_bytes: u64,
    /// Most recent bytes kept by a trim
    pub keep_bytes: u64,
}

impl Default for LogPolicy {
    fn default() -> Self {
        Self::new(default_log_dir(), "info")
    }
}

impl LogPolicy {
    pub fn new(dir: impl Into<PathBuf>, level: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            level: level.into(),
            max_bytes: 5 * MIB,
            keep_bytes: MIB,
        }
    }

    /// Size bound in whole MiB. `keep` is clamped to `max`.
    #[must_use]
    pub fn with_limits_mib(mut self, max: u64, keep: u64) -> Self {
        self.max_bytes = max.saturating_mul(MIB);
        self.keep_bytes = keep.min(max).saturating_mul(MIB);
        self
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(LOG_FILE)
    }

    fn default_directives(&self) -> String {
        format!("aerosweep={},aerosweep_core=info", self.level)
    }

    /// Cut `path` down to its last `keep_bytes` once it passes `max_bytes`,
    /// starting at a line boundary. Returns the number of bytes removed.
    pub fn trim(&self, path: &Path) -> io::Result<u64> {
        let mut file = match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let len = file.metadata()?.len();
        if len <= self.max_bytes {
            return Ok(0);
        }

        let from = len.saturating_sub(self.keep_bytes);
        let mut tail = Vec::new();
        file.seek(SeekFrom::Start(from))?;
        file.read_to_end(&mut tail)?;
        let first_line = if from == 0 {
            0
        } else {
            tail.iter().position(|&b| b == b'\n').map_or(tail.len(), |i| i + 1)
        };

        file.seek(SeekFrom::Start(0))?;
        file.write_all(TRIM_MARKER)?;
        file.write_all(&tail[first_line..])?;
        let kept = file.stream_position()?;
        file.set_len(kept)?;
        Ok(len - kept)
    }

    /// Trim the log, then install a global subscriber appending to it.
    pub fn init(&self) -> color_eyre::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path();

        let trimmed = self.trim(&path).unwrap_or_else(|e| {
            eprintln!("Warning: could not trim {}: {e}", path.display());
            0
        });

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.default_directives()));

        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false)
                    .with_thread_names(true),
            )
            .try_init()?;

        tracing::info!(path = %path.display(), trimmed, "logging initialized");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(dir: &Path, max: u64, keep: u64) -> LogPolicy {
        LogPolicy {
            max_bytes: max,
            keep_bytes: keep,
            ..LogPolicy::new(dir, "debug")
        }
    }

    #[test]
    fn test_small_log_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOG_FILE);
        fs::write(&path, "one\ntwo\n").unwrap();
        assert_eq!(policy(dir.path(), 1024, 16).trim(&path).unwrap(), 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn test_trim_keeps_whole_recent_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOG_FILE);
        let lines: String = (0..100).map(|i| format!("line {i:03}\n")).collect();
        fs::write(&path, &lines).unwrap();

        let removed = policy(dir.path(), 500, 30).trim(&path).unwrap();
        let trimmed = fs::read_to_string(&path).unwrap();
        assert_eq!(removed, (lines.len() - trimmed.len()) as u64);

        let mut kept = trimmed.lines();
        assert_eq!(kept.next(), Some("--- earlier entries trimmed ---"));
        let rest: Vec<&str> = kept.collect();
        assert_eq!(rest.last(), Some(&"line 099"));
        assert!(rest.iter().all(|l| l.len() == 8 && l.starts_with("line ")));
        assert!(rest.len() < 4);
    }

    #[test]
    fn test_missing_log_is_not_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOG_FILE);
        assert_eq!(policy(dir.path(), 0, 0).trim(&path).unwrap(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn test_limits_and_directives() {
        let policy = LogPolicy::new("/tmp/logs", "warn").with_limits_mib(2, 8);
        assert_eq!(policy.max_bytes, 2 * MIB);
        assert_eq!(policy.keep_bytes, 2 * MIB);
        assert_eq!(policy.path(), PathBuf::from("/tmp/logs/aerosweep.log"));
        assert_eq!(policy.default_directives(), "aerosweep=warn,aerosweep_core=info");
    }
}
