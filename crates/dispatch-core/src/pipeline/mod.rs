//! Per-program deployment pipeline.
//!
//! Stages run strictly in order: resolve the VCS command (latest or the
//! previous revision), apply it, run the post-update scripts, build the
//! requested targets, then hand off to the host sync fan-out. The first
//! failing stage ends the pipeline with a failed outcome.

use std::fmt;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::command::{self, Svn};
use crate::config::{DestHost, ProgramConfig};
use crate::context::RunContext;
use crate::exec::ExecError;
use crate::sync::sync_program;
use crate::types::{ProgramOutcome, RunRequest, SyncVerdict};
use crate::vcs::VcsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    Update,
    Script,
    Build,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Resolve => "resolve",
            Stage::Update => "update",
            Stage::Script => "script",
            Stage::Build => "build",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Error)]
pub enum StageError {
    #[error("rollback failed: {0}")]
    Revert(#[from] VcsError),

    #[error("{stage} step `{command}` failed: {source}")]
    Command {
        stage: Stage,
        command: String,
        #[source]
        source: ExecError,
    },
}

impl StageError {
    pub fn stage(&self) -> Stage {
        match self {
            StageError::Revert(_) => Stage::Resolve,
            StageError::Command { stage, .. } => *stage,
        }
    }
}

/// Drives one program through its stages.
pub struct ProgramPipeline<'a> {
    ctx: &'a RunContext,
    program: &'a ProgramConfig,
    request: &'a RunRequest,
    hosts: &'a [DestHost],
}

impl<'a> ProgramPipeline<'a> {
    pub fn new(
        ctx: &'a RunContext,
        program: &'a ProgramConfig,
        request: &'a RunRequest,
        hosts: &'a [DestHost],
    ) -> Self {
        Self {
            ctx,
            program,
            request,
            hosts,
        }
    }

    /// Run every stage and report exactly one outcome.
    pub async fn run(&self) -> ProgramOutcome {
        let name = self.program.name.as_str();
        if let Err(err) = self.prepare().await {
            error!(program = name, stage = %err.stage(), "{err}");
            self.log(&["pipeline aborted:", err.to_string().as_str()]);
            return ProgramOutcome::failed(name, err.to_string());
        }

        let summary = sync_program(self.ctx, self.program, self.hosts).await;
        if self.request.revert {
            info!(program = name, "rollback finished");
        }
        match summary.verdict {
            SyncVerdict::Synced => info!(program = name, "all hosts synced"),
            SyncVerdict::Partial => warn!(
                program = name,
                synced = summary.successes(),
                targeted = self.hosts.len(),
                "some hosts synced"
            ),
            SyncVerdict::Failed => error!(program = name, "every host failed to sync"),
        }
        self.log(&["sync finished:", summary.verdict.label()]);
        ProgramOutcome::synced(name, summary.verdict, summary.hosts)
    }

    /// Stages before sync.
    async fn prepare(&self) -> Result<(), StageError> {
        let vcs_command = self.vcs_command().await?;
        self.step(Stage::Update, vcs_command).await?;

        for script in &self.program.scripts {
            self.step(Stage::Script, command::in_dir(&self.program.path, script))
                .await?;
        }

        if let Some(exec_path) = self.program.build_exec() {
            for target in &self.request.build_targets {
                self.step(Stage::Build, command::build(self.program, exec_path, target))
                    .await?;
            }
        }

        Ok(())
    }

    async fn vcs_command(&self) -> Result<String, StageError> {
        let path = &self.program.path;
        if !self.request.revert {
            return Ok(Svn::update(path));
        }

        let previous = self.ctx.previous_revision(path.clone()).await?;
        info!(
            program = %self.program.name,
            revision = previous.revision,
            author = %previous.author,
            date = %previous.date,
            message = %previous.msg.trim(),
            "rolling back"
        );
        self.log(&[
            "rolling back to revision",
            previous.revision.to_string().as_str(),
            "author:",
            previous.author.as_str(),
            "date:",
            previous.date.as_str(),
            "message:",
            previous.msg.trim(),
        ]);
        Ok(Svn::update_to(path, previous.revision))
    }

    async fn step(&self, stage: Stage, command: String) -> Result<(), StageError> {
        let name = self.program.name.as_str();
        info!(program = name, %stage, %command, "starting");
        self.log(&[stage.to_string().as_str(), "starting:", command.as_str()]);
        let output = self.ctx.exec(command.clone()).await;
        match output.error {
            None => {
                self.log(&[
                    "command succeeded:",
                    command.as_str(),
                    "output:",
                    output.stdout.as_str(),
                    "stderr:",
                    output.stderr.as_str(),
                ]);
                info!(program = name, %stage, "done");
                Ok(())
            }
            Some(source) => {
                self.log(&[
                    "command failed:",
                    command.as_str(),
                    source.to_string().as_str(),
                    "output:",
                    output.stdout.as_str(),
                    "stderr:",
                    output.stderr.as_str(),
                ]);
                Err(StageError::Command {
                    stage,
                    command,
                    source,
                })
            }
        }
    }

    fn log(&self, parts: &[&str]) {
        self.ctx.journal().record(&self.program.name, parts);
    }
}
