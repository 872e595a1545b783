use crate::errors::SyncError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    RuntimeFailure = 1,
    Usage = 2,
    Internal = 3,
    Conflict = 4,
}

/// Error surfaced by a CLI command, classified by process exit code.
#[derive(Debug)]
pub struct AppError {
    code: ExitCode,
    message: String,
}

impl AppError {
    pub fn usage<T: Into<String>>(message: T) -> Self {
        Self::with_code(ExitCode::Usage, message)
    }

    pub fn runtime<T: Into<String>>(message: T) -> Self {
        Self::with_code(ExitCode::RuntimeFailure, message)
    }

    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::with_code(ExitCode::Internal, message)
    }

    pub fn conflict<T: Into<String>>(message: T) -> Self {
        Self::with_code(ExitCode::Conflict, message)
    }

    fn with_code<T: Into<String>>(code: ExitCode, message: T) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> i32 {
        self.code as i32
    }
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        let message = err.to_string();
        match err {
            SyncError::Busy => Self::conflict(message),
            SyncError::InvalidTranscriptName(_) | SyncError::InvalidSchedule { .. } => {
                Self::usage(message)
            }
            SyncError::TranscriptRead { .. } | SyncError::RemoteCheck(_) => Self::runtime(message),
            SyncError::RunTask(_) => Self::internal(message),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}
