//! Pluggable process invocation.
//!
//! The orchestrator never builds a `Command` itself; it asks a
//! [`ProcessInvoker`] to run a program. Production uses [`TokioInvoker`],
//! tests substitute a fake that returns canned exit codes.

use std::fs::File;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

pub type InvokeFuture<T> = Pin<Box<dyn Future<Output = io::Result<T>> + Send>>;

/// Captured result of a short-lived command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

pub trait ProcessInvoker: Send + Sync {
    /// Runs `program` to completion with stdout and stderr both appended to
    /// `transcript`, resolving to its exit code.
    ///
    /// An `Err` means the process could not be started or waited on.
    fn run(&self, program: String, args: Vec<String>, transcript: File) -> InvokeFuture<i32>;

    /// Runs `program` and captures its output streams.
    fn output(&self, program: String, args: Vec<String>) -> InvokeFuture<ProcessOutput>;
}

/// Spawns real OS processes on the Tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioInvoker;

impl ProcessInvoker for TokioInvoker {
    fn run(&self, program: String, args: Vec<String>, transcript: File) -> InvokeFuture<i32> {
        Box::pin(async move {
            let stderr = transcript.try_clone()?;
            let mut child = Command::new(&program)
                .args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::from(transcript))
                .stderr(Stdio::from(stderr))
                .spawn()?;

            debug!(program = %program, pid = ?child.id(), "process started");

            let status = child.wait().await?;
            Ok(status.code().unwrap_or(-1))
        })
    }

    fn output(&self, program: String, args: Vec<String>) -> InvokeFuture<ProcessOutput> {
        Box::pin(async move {
            let out = Command::new(&program)
                .args(&args)
                .stdin(Stdio::null())
                .output()
                .await?;

            Ok(ProcessOutput {
                exit_code: out.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            })
        })
    }
}
