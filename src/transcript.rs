//! Per-run transcript files: naming, banners and safe lookup.
//!
//! A transcript is named `backup-<run id>.log`, where the run id is the UTC
//! start time at second resolution. When a name is already taken a `_NN`
//! suffix is appended; `_` sorts after `.`, so name order stays start order.

use crate::errors::{Result, SyncError};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

pub const PREFIX: &str = "backup-";
pub const SUFFIX: &str = ".log";

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^backup-\d{8}-\d{6}(_\d{2,})?\.log$").expect("valid regex")
});

pub fn file_name(run_id: &str) -> String {
    format!("{PREFIX}{run_id}{SUFFIX}")
}

/// True for names produced by [`file_name`] from an allocated run id.
pub fn is_transcript_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

fn timestamp_id(at: OffsetDateTime) -> String {
    at.format(format_description!(
        "[year][month][day]-[hour][minute][second]"
    ))
    .unwrap_or_else(|_| at.unix_timestamp().to_string())
}

/// Allocates a run id for a run starting at `at`.
///
/// Ids never go backwards within one second: after `previous` the suffix
/// keeps counting up even if older transcripts have since been pruned.
pub fn allocate_run_id(dir: &Path, at: OffsetDateTime, previous: Option<&str>) -> String {
    let base = timestamp_id(at);
    let mut n = match previous {
        Some(prev) if prev == base => 1,
        Some(prev) => prev
            .strip_prefix(base.as_str())
            .and_then(|rest| rest.strip_prefix('_'))
            .and_then(|suffix| suffix.parse::<u32>().ok())
            .map_or(0, |last| last + 1),
        None => 0,
    };

    loop {
        let candidate = if n == 0 {
            base.clone()
        } else {
            format!("{base}_{n:02}")
        };
        if !dir.join(file_name(&candidate)).exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Rejects anything that could be read as a path rather than a bare name.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.contains('\0')
    {
        return Err(SyncError::InvalidTranscriptName(name.to_string()));
    }
    Ok(())
}

pub fn read(dir: &Path, name: &str) -> Result<String> {
    validate_name(name)?;
    fs::read_to_string(dir.join(name)).map_err(|source| SyncError::TranscriptRead {
        name: name.to_string(),
        source,
    })
}

pub fn start_banner(started: OffsetDateTime, command_line: &str) -> String {
    format!(
        "=== Backup started at {} ===\nCommand: {command_line}\n\n",
        rfc3339(started)
    )
}

pub fn finish_banner(finished: OffsetDateTime, exit_code: i32) -> String {
    format!(
        "\n=== Backup finished at {} (exit code: {exit_code}) ===\n",
        rfc3339(finished)
    )
}

fn rfc3339(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_else(|_| at.to_string())
}
