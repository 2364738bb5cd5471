//! Revision lookup for rollbacks.
//!
//! `svn log --xml` is asked for the two most recent entries of a working
//! copy; the second one is the revision a revert moves back to.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::command::{HISTORY_DEPTH, Svn};
use crate::exec::{CommandRunner, ExecError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VcsError {
    #[error("history query failed: {0}")]
    Command(#[from] ExecError),

    #[error("unreadable svn log output: {0}")]
    Parse(String),

    #[error("{} has no previous revision to roll back to", .dir.display())]
    NoPreviousRevision { dir: PathBuf },
}

/// One entry of the version-control history.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RevisionRecord {
    #[serde(rename = "@revision")]
    pub revision: u64,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub msg: String,
}

#[derive(Debug, Deserialize)]
struct SvnLog {
    #[serde(rename = "logentry", default)]
    entries: Vec<RevisionRecord>,
}

const XML_PROLOG: &str = "<?xml";
const LOG_OPEN: &str = "<log";
const LOG_CLOSE: &str = "</log>";

/// Cut the `<?xml ...> <log> ... </log>` document out of raw tool output.
pub fn extract_log_payload(raw: &str) -> Option<&str> {
    let start = raw.find(XML_PROLOG).or_else(|| raw.find(LOG_OPEN))?;
    let end = raw[start..].find(LOG_CLOSE)? + start + LOG_CLOSE.len();
    Some(&raw[start..end])
}

/// Parse `svn log --xml` output, tolerating noise around the document.
pub fn parse_svn_log(raw: &str) -> Result<Vec<RevisionRecord>, VcsError> {
    let payload = extract_log_payload(raw)
        .ok_or_else(|| VcsError::Parse("no <log> document in output".to_string()))?;
    let log: SvnLog =
        quick_xml::de::from_str(payload).map_err(|e| VcsError::Parse(e.to_string()))?;
    Ok(log.entries)
}

/// The revision immediately preceding the working copy's current one.
pub fn previous_revision(
    runner: &dyn CommandRunner,
    dir: &Path,
) -> Result<RevisionRecord, VcsError> {
    let (stdout, _) = runner.run(&Svn::log(dir, HISTORY_DEPTH)).into_result()?;
    let mut entries = parse_svn_log(&stdout)?;
    if entries.len() < HISTORY_DEPTH {
        return Err(VcsError::NoPreviousRevision {
            dir: dir.to_path_buf(),
        });
    }
    Ok(entries.swap_remove(1))
}
