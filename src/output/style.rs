use crate::model::BackupStatus;
use std::sync::atomic::{AtomicBool, Ordering};

static COLORS_ENABLED: AtomicBool = AtomicBool::new(true);

/// Decides once per process whether ANSI colors are written.
pub fn configure(no_color: bool) {
    let enabled = if std::env::var("CLICOLOR_FORCE").ok().as_deref() == Some("1") {
        true
    } else {
        !no_color
            && std::env::var_os("NO_COLOR").is_none()
            && !std::env::var("TERM").is_ok_and(|term| term.eq_ignore_ascii_case("dumb"))
    };

    COLORS_ENABLED.store(enabled, Ordering::Relaxed);
}

fn paint(code: &str, text: &str) -> String {
    if text.is_empty() || !COLORS_ENABLED.load(Ordering::Relaxed) {
        return text.to_string();
    }

    format!("\x1b[{code}m{text}\x1b[0m")
}

pub fn bold(text: &str) -> String {
    paint("1", text)
}

pub fn muted(text: &str) -> String {
    paint("2", text)
}

pub fn accent(text: &str) -> String {
    paint("36", text)
}

pub fn success(text: &str) -> String {
    paint("32", text)
}

pub fn failure(text: &str) -> String {
    paint("31", text)
}

pub fn warning(text: &str) -> String {
    paint("33", text)
}

pub fn info(text: &str) -> String {
    paint("96", text)
}

/// Status word colored by tier.
pub fn status(status: BackupStatus) -> String {
    let label = status.as_str();
    match status {
        BackupStatus::Success => success(&format!("ok {label}")),
        BackupStatus::Warning => warning(&format!("! {label}")),
        BackupStatus::Failed => failure(&format!("x {label}")),
        BackupStatus::Running => info(&format!("~ {label}")),
        BackupStatus::Idle => muted(&format!("- {label}")),
    }
}
