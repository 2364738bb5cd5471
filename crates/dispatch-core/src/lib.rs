//! Dispatch Core Library
//!
//! Updates or rolls back Subversion working copies, runs their post-update
//! and build steps, and rsyncs the result to every destination host. Programs
//! deploy concurrently, and so do the hosts of each program.

pub mod command;
pub mod config;
pub mod context;
pub mod exec;
pub mod journal;
pub mod orchestrator;
pub mod pipeline;
pub mod probe;
pub mod sync;
pub mod types;
pub mod vcs;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{ConfigStore, DestHost, DispatchConfig, ProgramConfig};

    // Execution
    pub use crate::context::RunContext;
    pub use crate::exec::{CommandOutput, CommandRunner, ExecError, ShellRunner};
    pub use crate::journal::Journal;

    // Deployment
    pub use crate::orchestrator::{DispatchError, Orchestrator};
    pub use crate::probe::{ProbeResult, probe_hosts};
    pub use crate::types::{
        DeploymentReport, HostSyncOutcome, ProgramOutcome, ProgramSelection, RunRequest,
        SyncVerdict,
    };
}
