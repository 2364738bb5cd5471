//! Append-only, per-day log files keyed by a logical name.
//!
//! Every record lands in `<base>/<YYYYMMDD>/<name>.log`. Open files are cached
//! for the lifetime of the journal and each one sits behind its own lock, so
//! concurrent pipelines writing to the same program log never interleave
//! partial lines, while writes to different logs do not contend.
//!
//! Journal failures are diagnostics only: they are reported through
//! `tracing` and never surface as errors to the caller.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Local, NaiveDate};

/// Logical name used by the command executor.
pub const MAIN_LOG: &str = "main";

/// Logical name used for orchestrator-level events.
pub const ORCHESTRATOR_LOG: &str = "dispatch";

type Stream = Arc<Mutex<File>>;

#[derive(Debug, Default)]
pub struct Journal {
    base_dir: Option<PathBuf>,
    streams: Mutex<HashMap<PathBuf, Stream>>,
}

impl Journal {
    /// Journal rooted at `base_dir`. An empty path disables the journal.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir: PathBuf = base_dir.into();
        let base_dir = if base_dir.as_os_str().is_empty() {
            None
        } else {
            Some(base_dir)
        };
        Self {
            base_dir,
            streams: Mutex::new(HashMap::new()),
        }
    }

    /// A journal that records nothing.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.base_dir.is_some()
    }

    /// Create the base directory up front. Returns false on failure, which
    /// is reported but otherwise ignored.
    pub fn provision(&self) -> bool {
        let Some(base) = &self.base_dir else {
            return true;
        };
        if base.exists() {
            return true;
        }
        match std::fs::create_dir_all(base) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(path = %base.display(), error = %err, "failed to create log directory");
                false
            }
        }
    }

    /// Resolve the file a record for `name` on `date` is written to.
    pub fn stream_path(&self, name: &str, date: NaiveDate) -> Option<PathBuf> {
        let base = self.base_dir.as_ref()?;
        Some(
            base.join(date.format("%Y%m%d").to_string())
                .join(format!("{name}.log")),
        )
    }

    /// Append one timestamped line made of `parts` joined by spaces.
    pub fn record<S: AsRef<str>>(&self, name: &str, parts: &[S]) {
        self.record_at(name, parts, Local::now());
    }

    fn record_at<S: AsRef<str>>(&self, name: &str, parts: &[S], now: DateTime<Local>) {
        let Some(path) = self.stream_path(name, now.date_naive()) else {
            return;
        };
        let message = parts
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(" ");
        let line = format!("{} {}\n", now.format("%Y-%m-%d %H:%M:%S"), message);

        if let Err(err) = self.append(&path, line.as_bytes()) {
            tracing::warn!(path = %path.display(), error = %err, "failed to write log entry");
        }
    }

    fn append(&self, path: &Path, line: &[u8]) -> std::io::Result<()> {
        let stream = self.stream(path)?;
        let mut file = stream.lock().unwrap_or_else(PoisonError::into_inner);
        file.write_all(line)
    }

    /// Cached handle for `path`, opening (and creating its directory) on
    /// first use. The map lock is released before the caller writes.
    fn stream(&self, path: &Path) -> std::io::Result<Stream> {
        let mut streams = self.streams.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(stream) = streams.get(path) {
            return Ok(Arc::clone(stream));
        }

        if let Some(dir) = path.parent() {
            if !dir.exists() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let stream = Arc::new(Mutex::new(file));
        streams.insert(path.to_path_buf(), Arc::clone(&stream));
        Ok(stream)
    }

    #[cfg(test)]
    fn cached_streams(&self) -> usize {
        self.streams
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
