use crate::transcript;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Deletes the oldest transcripts in `dir` so that at most `max_files`
/// remain. Returns how many files were removed.
///
/// Only names matching the transcript convention are considered, ordered by
/// name (the timestamp in the name). Failures are logged and skipped.
pub fn prune(dir: &Path, max_files: usize) -> usize {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %dir.display(), error = %err, "failed to list log directory");
            return 0;
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|ft| ft.is_file()))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| transcript::is_transcript_name(name))
        .collect();

    if names.len() <= max_files {
        return 0;
    }

    names.sort();
    let excess = names.len() - max_files;
    let mut removed = 0;

    for name in &names[..excess] {
        match fs::remove_file(dir.join(name)) {
            Ok(()) => {
                debug!(file = %name, "pruned old log");
                removed += 1;
            }
            Err(err) => warn!(file = %name, error = %err, "failed to prune old log"),
        }
    }

    removed
}
