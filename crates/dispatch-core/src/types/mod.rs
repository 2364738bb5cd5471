//! Shared run-level types: what was asked for and what came out.

/// Which programs a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramSelection {
    /// Every program in the configuration, in declaration order.
    All,
    /// Explicit program names, de-duplicated, first occurrence wins.
    Named(Vec<String>),
}

impl ProgramSelection {
    /// Parse a `-p` style value: `all` or a comma-separated list of names.
    pub fn parse(value: &str) -> Self {
        if value.trim() == "all" {
            return Self::All;
        }
        Self::Named(split_list(value))
    }
}

/// Split a comma-separated CLI value, dropping blanks and duplicates.
pub fn split_list(value: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !names.iter().any(|existing| existing == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Everything the orchestrator needs to know about one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub programs: ProgramSelection,
    /// Restrict the sync fan-out to the host with this alias.
    pub only_host: Option<String>,
    /// Redeploy the previous revision instead of the latest.
    pub revert: bool,
    /// Build targets, only honored for buildable programs.
    pub build_targets: Vec<String>,
}

impl RunRequest {
    pub fn new(programs: ProgramSelection) -> Self {
        Self {
            programs,
            only_host: None,
            revert: false,
            build_targets: Vec::new(),
        }
    }

    pub fn all() -> Self {
        Self::new(ProgramSelection::All)
    }

    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for name in names.into_iter().map(Into::into) {
            if !unique.contains(&name) {
                unique.push(name);
            }
        }
        Self::new(ProgramSelection::Named(unique))
    }

    pub fn with_only_host(mut self, alias: impl Into<String>) -> Self {
        self.only_host = Some(alias.into());
        self
    }

    pub fn with_revert(mut self, revert: bool) -> Self {
        self.revert = revert;
        self
    }

    pub fn with_build_targets(mut self, targets: Vec<String>) -> Self {
        self.build_targets = targets;
        self
    }
}

/// Program-level result of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncVerdict {
    /// Every targeted host received the tree.
    Synced,
    /// Some, but not all, targeted hosts received the tree.
    Partial,
    /// The pipeline aborted before sync, or no host succeeded.
    Failed,
}

impl SyncVerdict {
    /// Aggregate per-host results: all succeeded, none succeeded, or some.
    pub fn from_counts(successes: usize, targeted: usize) -> Self {
        if successes == 0 {
            Self::Failed
        } else if successes >= targeted {
            Self::Synced
        } else {
            Self::Partial
        }
    }

    pub fn is_synced(self) -> bool {
        self == Self::Synced
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::Partial => "partially synced",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SyncVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of syncing one program to one destination host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSyncOutcome {
    pub alias: String,
    pub host: String,
    pub success: bool,
}

/// Final result for one selected program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramOutcome {
    pub program: String,
    pub verdict: SyncVerdict,
    /// Per-host results; empty when the pipeline never reached sync.
    pub hosts: Vec<HostSyncOutcome>,
    /// Why the program failed before sync, if it did.
    pub error: Option<String>,
}

impl ProgramOutcome {
    pub fn synced(program: impl Into<String>, verdict: SyncVerdict, hosts: Vec<HostSyncOutcome>) -> Self {
        Self {
            program: program.into(),
            verdict,
            hosts,
            error: None,
        }
    }

    pub fn failed(program: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            verdict: SyncVerdict::Failed,
            hosts: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Aggregate of every program outcome in a run, in request order.
#[derive(Debug, Clone, Default)]
pub struct DeploymentReport {
    pub outcomes: Vec<ProgramOutcome>,
}

impl DeploymentReport {
    pub fn new(outcomes: Vec<ProgramOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn synced(&self) -> usize {
        self.outcomes.iter().filter(|o| o.verdict.is_synced()).count()
    }

    pub fn partial(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.verdict == SyncVerdict::Partial)
            .count()
    }

    /// Anything short of a full sync counts as a failure in the tally.
    pub fn failed(&self) -> usize {
        self.total() - self.synced()
    }

    pub fn failed_programs(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| !o.verdict.is_synced())
            .map(|o| o.program.as_str())
            .collect()
    }

    pub fn outcome(&self, program: &str) -> Option<&ProgramOutcome> {
        self.outcomes.iter().find(|o| o.program == program)
    }
}
