//! First-run connectivity check against the destination hosts.

use tracing::{error, info};

use crate::command::ssh_probe;
use crate::config::DestHost;
use crate::context::RunContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub alias: String,
    pub target: String,
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Try an `ssh` login on each host in turn.
pub async fn probe_hosts(ctx: &RunContext, hosts: &[DestHost]) -> Vec<ProbeResult> {
    let mut results = Vec::with_capacity(hosts.len());
    for host in hosts {
        let target = host.target();
        info!(host = %host.alias, %target, "connecting");
        let output = ctx.exec(ssh_probe(host)).await;
        let error = output.error.map(|err| {
            let stderr = output.stderr.trim();
            if stderr.is_empty() {
                err.to_string()
            } else {
                format!("{err}: {stderr}")
            }
        });
        match &error {
            None => info!(host = %host.alias, %target, "connected"),
            Some(reason) => error!(host = %host.alias, %target, "connection failed: {reason}"),
        }
        results.push(ProbeResult {
            alias: host.alias.clone(),
            target,
            error,
        });
    }
    results
}
