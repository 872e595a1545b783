use crate::model::{Outcome, Tier};

/// Maps an rsync exit code to its outcome tier and a human-readable summary.
///
/// Only 23 and 24 count as partial-but-usable transfers. Every other non-zero
/// code is a failure, however benign its message reads.
pub fn classify(exit_code: i32) -> Outcome {
    let tier = match exit_code {
        0 => Tier::Success,
        code if is_partial_transfer(code) => Tier::Warning,
        _ => Tier::Failed,
    };

    Outcome {
        tier,
        summary: exit_summary(exit_code),
    }
}

pub fn is_partial_transfer(exit_code: i32) -> bool {
    matches!(exit_code, 23 | 24)
}

pub fn exit_summary(exit_code: i32) -> String {
    let text = match exit_code {
        0 => "completed successfully",
        1 => "syntax or usage error",
        2 => "protocol incompatibility",
        3 => "errors selecting input/output files",
        5 => "error starting client-server protocol",
        10 => "error in socket I/O",
        11 => "error in file I/O",
        12 => "error in rsync protocol data stream",
        14 => "error in IPC code",
        20 => "interrupted by signal",
        23 => "partial transfer — some files could not be transferred",
        24 => "partial transfer — some source files vanished during sync",
        25 => "max-delete limit reached",
        30 => "timeout in data send/receive",
        35 => "timeout waiting for daemon connection",
        255 => "SSH connection failed — remote host unreachable or auth denied",
        code => return format!("rsync error (exit code {code})"),
    };
    text.to_string()
}
