use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("backup already in progress")]
    Busy,

    #[error("invalid log filename {0:?}")]
    InvalidTranscriptName(String),

    #[error("read log {name}: {source}")]
    TranscriptRead {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid cron schedule {expression:?}: {message}")]
    InvalidSchedule { expression: String, message: String },

    #[error("SSH check failed: {0}")]
    RemoteCheck(String),

    #[error("backup task aborted: {0}")]
    RunTask(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
