//! Command-line builders for the external tools a deployment drives.
//!
//! Every shell string the pipeline executes is composed here, so path and
//! flag construction can be checked without spawning anything.

use std::path::Path;

use crate::config::{DestHost, ProgramConfig};

/// Number of history entries fetched when looking for the previous revision.
pub const HISTORY_DEPTH: usize = 2;

/// Subversion commands.
pub struct Svn;

impl Svn {
    /// Bring the working copy up to the latest revision.
    pub fn update(dir: &Path) -> String {
        in_dir(dir, "svn up")
    }

    /// Move the working copy to a specific revision.
    pub fn update_to(dir: &Path, revision: u64) -> String {
        in_dir(dir, &format!("svn up -r {revision}"))
    }

    /// Most recent `limit` log entries as XML.
    pub fn log(dir: &Path, limit: usize) -> String {
        format!("svn log -l {limit} --xml {}", dir.display())
    }
}

/// Run an arbitrary script line inside `dir`.
pub fn in_dir(dir: &Path, script: &str) -> String {
    format!("cd {} && {}", dir.display(), script)
}

/// Build one target of a buildable program with its toolchain.
///
/// The target directory is `<program path><source prefix>/<target>/` and the
/// entry file is `<target>.go`, matching the Go project layout these
/// programs use.
pub fn build(program: &ProgramConfig, exec_path: &str, target: &str) -> String {
    format!(
        "cd {}{}/{}/ && {} build {}.go",
        program.path.display(),
        program.build_source_prefix,
        target,
        exec_path,
        target
    )
}

/// `rsync` over `ssh` from a program's local tree to one host.
#[derive(Debug, Clone)]
pub struct Rsync<'a> {
    program: &'a ProgramConfig,
    host: &'a DestHost,
    excludes: Vec<&'a str>,
}

impl<'a> Rsync<'a> {
    pub fn new(program: &'a ProgramConfig, host: &'a DestHost) -> Self {
        Self {
            program,
            host,
            excludes: Vec::new(),
        }
    }

    pub fn exclude<I>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        self.excludes.extend(patterns.into_iter().map(String::as_str));
        self
    }

    pub fn render(&self) -> String {
        let mut command = format!(
            r#"rsync -rtzPv --progress -e "ssh -i {} -p {}" {} {}@{}:{}"#,
            self.host.key_file.display(),
            self.host.port,
            self.program.path.display(),
            self.host.username,
            self.host.host,
            self.program.dest_path
        );
        for pattern in &self.excludes {
            command.push_str(" --exclude=");
            command.push_str(pattern);
        }
        command
    }
}

/// Non-interactive login check used by `--init`.
pub fn ssh_probe(host: &DestHost) -> String {
    format!(
        "ssh {}@{} -i {} -p {} exit",
        host.username,
        host.host,
        host.key_file.display(),
        host.port
    )
}
