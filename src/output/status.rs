use crate::model::{BackupStatus, RunRecord};
use crate::output::{bold, format_timestamp, muted, status, warning};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::io::Write;

/// Everything the status command reports.
#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub status: BackupStatus,
    pub last_run: Option<RunRecord>,
    pub schedule: String,
    pub next_run: Option<DateTime<Local>>,
    pub source: String,
    pub dest: String,
    pub configured: bool,
}

pub fn print_status(mut w: impl Write, view: &StatusView) -> std::io::Result<()> {
    writeln!(w, "{} {}", bold("status"), status(view.status))?;

    match &view.last_run {
        Some(run) => {
            writeln!(
                w,
                "  last run: {} ({})",
                format_timestamp(run.start_time),
                run.summary
            )?;
        }
        None => writeln!(w, "  last run: {}", muted("never"))?,
    }

    let next = view
        .next_run
        .map(|at| at.format("%Y-%m-%d %H:%M:%S %Z").to_string())
        .unwrap_or_else(|| "-".to_string());
    writeln!(w, "  schedule: {} (next: {next})", view.schedule)?;

    if view.configured {
        writeln!(w, "  source: {}", view.source)?;
        writeln!(w, "  dest: {}", view.dest)?;
    } else {
        writeln!(w, "  {}", warning("transfer settings are incomplete"))?;
    }

    Ok(())
}
