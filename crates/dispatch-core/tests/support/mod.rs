#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use dispatch_core::config::{DestHost, DispatchConfig, ProgramConfig};
use dispatch_core::context::RunContext;
use dispatch_core::exec::{CommandOutput, CommandRunner, ExecError};
use dispatch_core::journal::Journal;

/// Records every command and answers from a list of substring rules.
/// Commands matching no rule succeed with empty output.
#[derive(Default)]
pub struct ScriptedRunner {
    commands: Mutex<Vec<String>>,
    rules: Vec<(String, Reply)>,
}

#[derive(Clone)]
enum Reply {
    Stdout(String),
    Fail,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, pattern: &str, stdout: &str) -> Self {
        self.rules
            .push((pattern.to_string(), Reply::Stdout(stdout.to_string())));
        self
    }

    pub fn fail_on(mut self, pattern: &str) -> Self {
        self.rules.push((pattern.to_string(), Reply::Fail));
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn count_matching(&self, pattern: &str) -> usize {
        self.commands()
            .iter()
            .filter(|c| c.contains(pattern))
            .count()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &str) -> CommandOutput {
        self.commands.lock().unwrap().push(command.to_string());
        let reply = self
            .rules
            .iter()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map(|(_, reply)| reply.clone());
        match reply {
            Some(Reply::Stdout(stdout)) => CommandOutput::success(stdout, ""),
            Some(Reply::Fail) => {
                CommandOutput::failure("", "scripted failure", ExecError::Exit { code: Some(1) })
            }
            None => CommandOutput::success("", ""),
        }
    }
}

pub fn program(name: &str, path: &Path) -> ProgramConfig {
    ProgramConfig {
        name: name.to_string(),
        path: path.to_path_buf(),
        dest_path: format!("/srv/www/{name}/"),
        scripts: Vec::new(),
        ignore_files: Vec::new(),
        build_exec_path: None,
        build_source_prefix: String::new(),
    }
}

pub fn host(alias: &str) -> DestHost {
    DestHost {
        alias: alias.to_string(),
        username: "deploy".to_string(),
        host: format!("{alias}.example.com"),
        port: 22,
        key_file: PathBuf::from("/home/deploy/.ssh/id_ed25519"),
    }
}

pub fn config(programs: Vec<ProgramConfig>, hosts: &[&str]) -> DispatchConfig {
    DispatchConfig {
        programs,
        ignore_files: vec![".svn".to_string()],
        dest_hosts: hosts.iter().map(|alias| host(alias)).collect(),
        save_path: PathBuf::new(),
        max_parallel: None,
    }
}

pub fn context(config: DispatchConfig, runner: Arc<ScriptedRunner>) -> RunContext {
    RunContext::new(config, Arc::new(Journal::disabled()), runner)
}

pub fn journaled_context(config: DispatchConfig, runner: Arc<ScriptedRunner>, dir: &Path) -> RunContext {
    RunContext::new(config, Arc::new(Journal::new(dir)), runner)
}

pub fn svn_log(revisions: &[u64]) -> String {
    let entries: String = revisions
        .iter()
        .map(|rev| {
            format!(
                "<logentry\n   revision=\"{rev}\">\n<author>alice</author>\n<date>2024-03-09T10:00:00.000000Z</date>\n<msg>r{rev}</msg>\n</logentry>\n"
            )
        })
        .collect();
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<log>\n{entries}</log>\n")
}
