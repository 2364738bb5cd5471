//! Multi-host sync fan-out.
//!
//! One task per targeted host runs `rsync` for the program; results come
//! back over a channel sized to the number of hosts and are folded into a
//! single program verdict.

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::command::Rsync;
use crate::config::{DestHost, ProgramConfig};
use crate::context::RunContext;
use crate::types::{HostSyncOutcome, SyncVerdict};

/// Per-host results and the verdict they add up to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    pub verdict: SyncVerdict,
    pub hosts: Vec<HostSyncOutcome>,
}

impl SyncSummary {
    pub fn successes(&self) -> usize {
        self.hosts.iter().filter(|h| h.success).count()
    }
}

/// Sync `program` to every host in `hosts` concurrently.
pub async fn sync_program(ctx: &RunContext, program: &ProgramConfig, hosts: &[DestHost]) -> SyncSummary {
    let targeted = hosts.len();
    if targeted == 0 {
        error!(program = %program.name, "no destination hosts to sync to");
        return SyncSummary {
            verdict: SyncVerdict::Failed,
            hosts: Vec::new(),
        };
    }

    let (tx, mut rx) = mpsc::channel(targeted);
    for host in hosts {
        let command = Rsync::new(program, host)
            .exclude(ctx.config().excludes_for(program))
            .render();
        let ctx = ctx.clone();
        let tx = tx.clone();
        let name = program.name.clone();
        let host = host.clone();
        tokio::spawn(async move {
            let outcome = sync_host(&ctx, &name, &host, command).await;
            let _ = tx.send(outcome).await;
        });
    }
    drop(tx);

    let mut outcomes: Vec<HostSyncOutcome> = Vec::with_capacity(targeted);
    while outcomes.len() < targeted {
        match rx.recv().await {
            Some(outcome) => outcomes.push(outcome),
            None => break,
        }
    }

    // A task that died without reporting still owes its host an outcome.
    for host in hosts {
        if !outcomes.iter().any(|o| o.alias == host.alias) {
            error!(program = %program.name, host = %host.alias, "sync task ended without a result");
            outcomes.push(HostSyncOutcome {
                alias: host.alias.clone(),
                host: host.host.clone(),
                success: false,
            });
        }
    }

    for outcome in &outcomes {
        if outcome.success {
            info!(program = %program.name, host = %outcome.alias, addr = %outcome.host, "synced");
        } else {
            error!(program = %program.name, host = %outcome.alias, addr = %outcome.host, "sync failed");
        }
    }

    let successes = outcomes.iter().filter(|o| o.success).count();
    SyncSummary {
        verdict: SyncVerdict::from_counts(successes, targeted),
        hosts: outcomes,
    }
}

async fn sync_host(ctx: &RunContext, program: &str, host: &DestHost, command: String) -> HostSyncOutcome {
    info!(program, host = %host.alias, %command, "starting sync");
    let output = ctx.exec(command.clone()).await;
    let success = match &output.error {
        None => {
            ctx.journal().record(
                program,
                &[
                    "command succeeded:",
                    command.as_str(),
                    "output:",
                    output.stdout.as_str(),
                    "stderr:",
                    output.stderr.as_str(),
                ],
            );
            true
        }
        Some(err) => {
            ctx.journal().record(
                program,
                &["command failed:", command.as_str(), err.to_string().as_str()],
            );
            false
        }
    };
    HostSyncOutcome {
        alias: host.alias.clone(),
        host: host.host.clone(),
        success,
    }
}
