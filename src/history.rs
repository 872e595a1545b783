use crate::model::{BackupStatus, RunRecord};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const FILE_NAME: &str = "history.json";
pub const MAX_ENTRIES: usize = 100;

#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub limit: Option<usize>,
    pub status: Option<BackupStatus>,
}

/// Newest-first run history persisted as a single JSON document.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted history. A missing file is an empty history; an
    /// unreadable or malformed one is logged and also treated as empty.
    pub fn load(&self) -> Vec<RunRecord> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to read history");
                return Vec::new();
            }
        };

        match serde_json::from_slice::<Vec<RunRecord>>(&data) {
            Ok(mut records) => {
                records.truncate(MAX_ENTRIES);
                records
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to parse history");
                Vec::new()
            }
        }
    }

    /// Prepends `record`, drops the oldest entries beyond the cap, then
    /// rewrites the whole file. The in-memory history is updated even when
    /// the write fails.
    pub fn append(&self, history: &mut Vec<RunRecord>, record: RunRecord) -> Result<(), String> {
        prepend(history, record);
        self.save(history)
    }

    pub fn save(&self, history: &[RunRecord]) -> Result<(), String> {
        self.write(&encode(history)?)
    }

    /// Atomically replaces the history file with already encoded bytes.
    pub fn write(&self, data: &[u8]) -> Result<(), String> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| format!("create history directory: {e}"))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, data).map_err(|e| format!("write history: {e}"))?;
        fs::rename(&tmp, &self.path).map_err(|e| format!("replace history file: {e}"))
    }

    pub fn list(&self, filter: &Filter) -> Vec<RunRecord> {
        let mut records: Vec<RunRecord> = self
            .load()
            .into_iter()
            .filter(|rec| filter.status.is_none_or(|status| rec.status == status))
            .collect();

        if let Some(limit) = filter.limit
            && records.len() > limit
        {
            records.truncate(limit);
        }

        records
    }
}

/// Inserts `record` as the newest entry and drops the oldest beyond the cap.
pub fn prepend(history: &mut Vec<RunRecord>, record: RunRecord) {
    history.insert(0, record);
    history.truncate(MAX_ENTRIES);
}

pub fn encode(history: &[RunRecord]) -> Result<Vec<u8>, String> {
    serde_json::to_vec_pretty(history).map_err(|e| format!("serialize history: {e}"))
}

/// Aggregate status implied by a newest-first history. Nothing is running
/// at startup, so a stray `running` entry never seeds the status.
pub fn seed_status(history: &[RunRecord]) -> BackupStatus {
    history
        .first()
        .map(|rec| rec.status)
        .filter(|status| *status != BackupStatus::Running)
        .unwrap_or(BackupStatus::Idle)
}
