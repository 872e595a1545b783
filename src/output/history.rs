use crate::model::RunRecord;
use crate::output::{accent, format_timestamp, info, muted, status};
use std::io::Write;

pub fn print_history(mut w: impl Write, rows: &[RunRecord]) -> std::io::Result<()> {
    if rows.is_empty() {
        writeln!(w, "{} No backup history yet.", info("i"))?;
        return Ok(());
    }

    for (idx, row) in rows.iter().enumerate() {
        writeln!(w, "{} {}", accent(&row.id), status(row.status))?;
        writeln!(w, "  started (UTC): {}", format_timestamp(row.start_time))?;
        if !row.duration.is_empty() {
            writeln!(w, "  duration: {}", row.duration)?;
        }
        writeln!(w, "  exit: {}", row.exit_code)?;
        if !row.summary.is_empty() {
            writeln!(w, "  summary: {}", row.summary)?;
        }
        writeln!(w, "  log: {}", muted(&row.log_file))?;

        if idx + 1 < rows.len() {
            writeln!(w)?;
        }
    }

    Ok(())
}
