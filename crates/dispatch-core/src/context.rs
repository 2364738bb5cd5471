//! Run context shared by every pipeline and sync task.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::config::DispatchConfig;
use crate::exec::{CommandOutput, CommandRunner, ExecError, ShellRunner};
use crate::journal::Journal;
use crate::vcs::{self, RevisionRecord, VcsError};

/// Everything a deployment needs, passed explicitly instead of living in
/// globals.
///
/// Cloning is cheap; each spawned task gets its own clone. The configuration
/// is immutable for the run.
#[derive(Clone)]
pub struct RunContext {
    config: Arc<DispatchConfig>,
    journal: Arc<Journal>,
    runner: Arc<dyn CommandRunner>,
    limiter: Option<Arc<Semaphore>>,
}

impl RunContext {
    /// Create a context with explicit collaborators.
    pub fn new(
        config: DispatchConfig,
        journal: Arc<Journal>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        let limiter = config
            .parallelism()
            .map(|permits| Arc::new(Semaphore::new(permits)));
        Self {
            config: Arc::new(config),
            journal,
            runner,
            limiter,
        }
    }

    /// Production wiring: journal under `save_path`, commands through the
    /// system shell.
    pub fn from_config(config: DispatchConfig) -> Self {
        let journal = Arc::new(Journal::new(config.save_path.clone()));
        let runner = Arc::new(ShellRunner::new(Arc::clone(&journal)));
        Self::new(config, journal, runner)
    }

    /// Override the concurrency limit (0 removes it).
    pub fn with_max_parallel(mut self, permits: usize) -> Self {
        self.limiter = (permits > 0).then(|| Arc::new(Semaphore::new(permits)));
        self
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Run a command on the blocking pool, honoring the concurrency limit.
    pub async fn exec(&self, command: String) -> CommandOutput {
        let _permit = match &self.limiter {
            Some(limiter) => Arc::clone(limiter).acquire_owned().await.ok(),
            None => None,
        };
        let runner = Arc::clone(&self.runner);
        match tokio::task::spawn_blocking(move || runner.run(&command)).await {
            Ok(output) => output,
            Err(err) => CommandOutput::failure("", "", ExecError::Aborted(err.to_string())),
        }
    }

    /// Look up the revision preceding the working copy's current one.
    pub async fn previous_revision(&self, dir: PathBuf) -> Result<RevisionRecord, VcsError> {
        let _permit = match &self.limiter {
            Some(limiter) => Arc::clone(limiter).acquire_owned().await.ok(),
            None => None,
        };
        let runner = Arc::clone(&self.runner);
        match tokio::task::spawn_blocking(move || vcs::previous_revision(runner.as_ref(), &dir))
            .await
        {
            Ok(result) => result,
            Err(err) => Err(VcsError::Command(ExecError::Aborted(err.to_string()))),
        }
    }
}
