//! Deployment orchestrator: resolves the request, launches one pipeline per
//! program and collects exactly one outcome for each.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::{DestHost, ProgramConfig};
use crate::context::RunContext;
use crate::journal::ORCHESTRATOR_LOG;
use crate::pipeline::ProgramPipeline;
use crate::types::{DeploymentReport, ProgramOutcome, ProgramSelection, RunRequest};

/// Errors that stop a run before any pipeline starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("unknown destination host '{alias}', configured hosts: {}", .known.join(","))]
    UnknownHost { alias: String, known: Vec<String> },
}

/// Why a requested program never got a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("program is not configured")]
    NotConfigured,

    #[error("program path {0} does not exist")]
    MissingPath(String),
}

pub struct Orchestrator {
    ctx: RunContext,
}

impl Orchestrator {
    pub fn new(ctx: RunContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Hosts the sync fan-out targets: all of them, or exactly the one named.
    ///
    /// The complete alias list is collected independently of the lookup so
    /// the error always names every configured host.
    pub fn resolve_hosts(&self, only: Option<&str>) -> Result<Vec<DestHost>, DispatchError> {
        let hosts = &self.ctx.config().dest_hosts;
        let Some(alias) = only else {
            return Ok(hosts.clone());
        };
        match hosts.iter().find(|h| h.alias == alias) {
            Some(host) => Ok(vec![host.clone()]),
            None => Err(DispatchError::UnknownHost {
                alias: alias.to_string(),
                known: self.ctx.config().aliases(),
            }),
        }
    }

    /// Program names the request expands to, in launch order.
    pub fn selected_programs(&self, selection: &ProgramSelection) -> Vec<String> {
        match selection {
            ProgramSelection::All => self.ctx.config().program_names(),
            ProgramSelection::Named(names) => names.clone(),
        }
    }

    /// Check that a requested program can be deployed at all.
    pub fn admit(&self, name: &str) -> Result<ProgramConfig, Rejection> {
        let program = self
            .ctx
            .config()
            .program(name)
            .ok_or(Rejection::NotConfigured)?;
        if !program.path.exists() {
            return Err(Rejection::MissingPath(program.path.display().to_string()));
        }
        Ok(program.clone())
    }

    /// Deploy every requested program concurrently.
    ///
    /// Only an unknown host restriction fails the whole run; every other
    /// problem is confined to the program it concerns.
    pub async fn run(&self, request: RunRequest) -> Result<DeploymentReport, DispatchError> {
        let hosts = Arc::new(self.resolve_hosts(request.only_host.as_deref())?);
        if let Some(host) = request.only_host.as_deref().and_then(|_| hosts.first()) {
            info!(host = %host.alias, target = %host.target(), "deploying to a single host");
        }

        let names = self.selected_programs(&request.programs);
        let total = names.len();
        if total == 0 {
            warn!("no programs selected");
            return Ok(DeploymentReport::default());
        }

        self.ctx.journal().record(
            ORCHESTRATOR_LOG,
            &[
                if request.revert { "revert" } else { "update" },
                "programs:",
                names.join(",").as_str(),
            ],
        );

        let request = Arc::new(request);
        let (tx, mut rx) = mpsc::channel::<(usize, ProgramOutcome)>(total);

        for (index, name) in names.iter().enumerate() {
            let program = match self.admit(name) {
                Ok(program) => program,
                Err(rejection) => {
                    warn!(program = %name, "{rejection}");
                    self.ctx.journal().record(
                        ORCHESTRATOR_LOG,
                        &[name.as_str(), "rejected:", rejection.to_string().as_str()],
                    );
                    // Capacity covers every program, so this never waits.
                    let _ = tx
                        .send((index, ProgramOutcome::failed(name, rejection.to_string())))
                        .await;
                    continue;
                }
            };

            let ctx = self.ctx.clone();
            let request = Arc::clone(&request);
            let hosts = Arc::clone(&hosts);
            let tx = tx.clone();
            tokio::spawn(async move {
                let outcome = ProgramPipeline::new(&ctx, &program, &request, &hosts)
                    .run()
                    .await;
                let _ = tx.send((index, outcome)).await;
            });
        }
        drop(tx);

        let mut slots: Vec<Option<ProgramOutcome>> = vec![None; total];
        let mut received = 0;
        while received < total {
            match rx.recv().await {
                Some((index, outcome)) => {
                    slots[index] = Some(outcome);
                    received += 1;
                }
                None => break,
            }
        }

        let outcomes: Vec<ProgramOutcome> = slots
            .into_iter()
            .zip(&names)
            .map(|(slot, name)| {
                slot.unwrap_or_else(|| {
                    warn!(program = %name, "pipeline ended without reporting");
                    ProgramOutcome::failed(name, "pipeline ended without reporting")
                })
            })
            .collect();

        let report = DeploymentReport::new(outcomes);
        let failed = report.failed_programs().join(",");
        self.ctx.journal().record(
            ORCHESTRATOR_LOG,
            &[
                "finished: total",
                report.total().to_string().as_str(),
                "synced",
                report.synced().to_string().as_str(),
                "failed",
                report.failed().to_string().as_str(),
                failed.as_str(),
            ],
        );
        Ok(report)
    }
}
