use crate::command;
use crate::config::RunSettings;
use crate::errors::{Result, SyncError};
use crate::invoker::ProcessInvoker;
use serde::Serialize;

/// Entries found at the remote destination, at most five.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemoteListing {
    pub non_empty: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
}

/// Lists the remote destination over ssh so a first run against a
/// populated path can be flagged before `--delete` touches it.
pub async fn check(invoker: &dyn ProcessInvoker, settings: &RunSettings) -> Result<RemoteListing> {
    let args = command::remote_check_args(settings);
    let out = invoker
        .output("ssh".to_string(), args)
        .await
        .map_err(|e| SyncError::RemoteCheck(e.to_string()))?;

    if out.exit_code != 0 {
        let detail = out.stderr.trim();
        return Err(SyncError::RemoteCheck(if detail.is_empty() {
            format!("ssh exited with code {}", out.exit_code)
        } else {
            format!("ssh exited with code {}: {detail}", out.exit_code)
        }));
    }

    let files: Vec<String> = out
        .stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    Ok(RemoteListing {
        non_empty: !files.is_empty(),
        files,
    })
}
