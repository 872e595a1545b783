use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use time::OffsetDateTime;

/// Aggregate status shown for the backup job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupStatus {
    Idle,
    Running,
    Success,
    Warning,
    Failed,
}

impl BackupStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BackupStatus::Idle => "idle",
            BackupStatus::Running => "running",
            BackupStatus::Success => "success",
            BackupStatus::Warning => "warning",
            BackupStatus::Failed => "failed",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "idle" => Some(BackupStatus::Idle),
            "running" => Some(BackupStatus::Running),
            "success" => Some(BackupStatus::Success),
            "warning" => Some(BackupStatus::Warning),
            "failed" => Some(BackupStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for BackupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome tier of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Success,
    Warning,
    Failed,
}

impl From<Tier> for BackupStatus {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::Success => BackupStatus::Success,
            Tier::Warning => BackupStatus::Warning,
            Tier::Failed => BackupStatus::Failed,
        }
    }
}

/// Classified result of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub tier: Tier,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_time: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub duration: String,
    pub status: BackupStatus,
    pub exit_code: i32,
    pub log_file: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
}

impl RunRecord {
    /// A freshly started run: no end time, exit code 0, status running.
    pub fn started(id: String, log_file: String, start_time: OffsetDateTime) -> Self {
        Self {
            id,
            start_time,
            end_time: None,
            duration: String::new(),
            status: BackupStatus::Running,
            exit_code: 0,
            log_file,
            summary: String::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.end_time.is_some()
    }

    /// Consumes the live record and returns its frozen, completed form.
    pub fn complete(self, end_time: OffsetDateTime, exit_code: i32, outcome: Outcome) -> Self {
        let elapsed = (end_time - self.start_time).whole_seconds().max(0) as u64;
        Self {
            end_time: Some(end_time),
            duration: humantime::format_duration(Duration::from_secs(elapsed)).to_string(),
            status: outcome.tier.into(),
            exit_code,
            summary: outcome.summary,
            ..self
        }
    }
}
