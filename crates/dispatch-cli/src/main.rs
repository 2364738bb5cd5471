//! Dispatch - multi-host code deployment
//!
//! Usage:
//!   dispatch -p api,web          # update, run scripts, sync to every host
//!   dispatch -p all -t web1      # everything, to a single host
//!   dispatch -p api -r           # roll api back one revision
//!   dispatch -p svc -g worker    # also build the worker target
//!   dispatch -i                  # check ssh access to every host

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dispatch_core::config::{ConfigStore, DispatchConfig};
use dispatch_core::context::RunContext;
use dispatch_core::orchestrator::Orchestrator;
use dispatch_core::probe::probe_hosts;
use dispatch_core::types::{DeploymentReport, ProgramSelection, RunRequest, split_list};

#[derive(Parser)]
#[command(name = "dispatch")]
#[command(about = "Update, build and rsync programs to their destination hosts", long_about = None)]
struct Cli {
    /// Config file (defaults to ./config.json, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Programs to deploy, comma separated, or `all`
    #[arg(short, long)]
    programs: Option<String>,

    /// Build targets for buildable programs, comma separated
    #[arg(short = 'g', long = "go-programs")]
    go_programs: Option<String>,

    /// Roll back to the previous revision instead of updating
    #[arg(short, long)]
    revert: bool,

    /// Only sync to the host with this alias
    #[arg(short, long)]
    to: Option<String>,

    /// Check ssh access to the destination hosts
    #[arg(short, long)]
    init: bool,

    /// Maximum number of external commands running at once
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Print the configured programs and hosts
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dispatch=info,dispatch_core=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let store = ConfigStore::locate(cli.config.clone())?;
    let config = store
        .load()
        .with_context(|| format!("Failed to load {}", store.config_path().display()))?;

    if cli.list {
        print_configuration(&config);
        return Ok(());
    }

    let mut ctx = RunContext::from_config(config);
    if let Some(jobs) = cli.jobs {
        ctx = ctx.with_max_parallel(jobs);
    }
    ctx.journal().provision();

    let orchestrator = Orchestrator::new(ctx);

    if cli.init {
        run_probe(&orchestrator, cli.to.as_deref()).await?;
        if cli.programs.is_none() {
            return Ok(());
        }
    }

    let Some(programs) = cli.programs.as_deref() else {
        anyhow::bail!("No programs given. Pass -p <name,name|all>, or --list to see them");
    };

    let mut request = RunRequest::new(ProgramSelection::parse(programs)).with_revert(cli.revert);
    if let Some(targets) = cli.go_programs.as_deref() {
        request = request.with_build_targets(split_list(targets));
    }
    if let Some(alias) = cli.to.clone() {
        request = request.with_only_host(alias);
    }

    let report = orchestrator.run(request).await?;
    print_report(&report);

    Ok(())
}

async fn run_probe(orchestrator: &Orchestrator, only: Option<&str>) -> Result<()> {
    let hosts = orchestrator.resolve_hosts(only)?;
    let results = probe_hosts(orchestrator.context(), &hosts).await;

    let mut failed = Vec::new();
    for result in &results {
        match &result.error {
            None => println!("{} {} [{}]", style("✓").green(), result.alias, result.target),
            Some(reason) => {
                println!(
                    "{} {} [{}]: {}",
                    style("✗").red(),
                    result.alias,
                    result.target,
                    reason
                );
                failed.push(result.alias.as_str());
            }
        }
    }

    if !failed.is_empty() {
        anyhow::bail!("Could not reach: {}", failed.join(","));
    }
    Ok(())
}

fn print_configuration(config: &DispatchConfig) {
    if config.programs.is_empty() {
        println!("No programs configured.");
    } else {
        println!("Programs ({}):", config.programs.len());
        println!("  {:<20} {:<8} Path", "Name", "Build");
        println!("  {}", "-".repeat(70));
        for program in &config.programs {
            let build = if program.build_exec().is_some() { "yes" } else { "-" };
            println!(
                "  {:<20} {:<8} {}",
                program.name,
                build,
                program.path.display()
            );
        }
    }
    println!();

    if config.dest_hosts.is_empty() {
        println!("No destination hosts configured.");
        return;
    }
    println!("Destination hosts ({}):", config.dest_hosts.len());
    println!("  {:<15} {:<30} Port", "Alias", "Target");
    println!("  {}", "-".repeat(70));
    for host in &config.dest_hosts {
        println!("  {:<15} {:<30} {}", host.alias, host.target(), host.port);
    }
}

fn print_report(report: &DeploymentReport) {
    println!();
    for outcome in &report.outcomes {
        let symbol = if outcome.verdict.is_synced() {
            style("✓").green()
        } else if outcome.hosts.iter().any(|h| h.success) {
            style("~").yellow()
        } else {
            style("✗").red()
        };
        match &outcome.error {
            Some(error) => println!("{} {}: {}", symbol, outcome.program, error),
            None => println!("{} {} ({})", symbol, outcome.program, outcome.verdict),
        }
        for host in outcome.hosts.iter().filter(|h| !h.success) {
            println!("    {} {} [{}]", style("✗").red(), host.alias, host.host);
        }
    }

    println!("{}", "-".repeat(70));
    println!(
        "Summary: {} programs, {} synced, {} partial, {} failed",
        report.total(),
        style(report.synced()).green(),
        style(report.partial()).yellow(),
        style(report.failed()).red()
    );

    let failed = report.failed_programs();
    if !failed.is_empty() {
        println!("Failed: {}", style(failed.join(",")).red().bold());
    }
}
