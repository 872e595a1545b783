//! Run lifecycle: single-flight start, background execution, history.
//!
//! All shared state lives in one [`State`] behind a `std::sync::Mutex`. The
//! lock is taken for each discrete mutation and never held across an
//! `.await` or disk I/O, so status readers are never blocked by a running
//! transfer.
//!
//! One orchestrator owns a log directory at a time: construction takes an
//! exclusive lock on `syncwatch.lock` inside it, released on drop.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fs2::FileExt;
use time::OffsetDateTime;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::classify::classify;
use crate::command;
use crate::config::RunSettings;
use crate::errors::{Result, SyncError};
use crate::history::{self, Store};
use crate::invoker::ProcessInvoker;
use crate::model::{BackupStatus, Outcome, RunRecord, Tier};
use crate::remote::{self, RemoteListing};
use crate::retention;
use crate::transcript;

/// Exit code recorded when the tool could not be started at all.
const SPAWN_FAILURE_EXIT_CODE: i32 = 1;

pub const LOCK_FILE_NAME: &str = "syncwatch.lock";

#[derive(Debug)]
struct State {
    status: BackupStatus,
    current: Option<RunRecord>,
    history: Vec<RunRecord>,
    last_id: Option<String>,
}

struct Inner {
    settings: RunSettings,
    invoker: Arc<dyn ProcessInvoker>,
    store: Store,
    state: Mutex<State>,
    /// Serialises history writes so they land in completion order.
    persist: AsyncMutex<()>,
    _dir_lock: Option<File>,
}

/// Point-in-time copy of the orchestrator's externally visible state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub status: BackupStatus,
    pub current: Option<RunRecord>,
    pub last_run: Option<RunRecord>,
}

/// Returned by [`Orchestrator::start_run`]. Dropping it detaches the run.
#[derive(Debug)]
pub struct RunHandle {
    record: RunRecord,
    completion: JoinHandle<RunRecord>,
}

impl RunHandle {
    /// The record as it was when the run started.
    pub fn record(&self) -> &RunRecord {
        &self.record
    }

    /// Waits for the run to finish and returns its completed record.
    pub async fn wait(self) -> Result<RunRecord> {
        Ok(self.completion.await?)
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    /// Builds the orchestrator and loads persisted history from the log
    /// directory, seeding the aggregate status from the newest entry.
    ///
    /// Fails with [`SyncError::Busy`] when another orchestrator, in this or
    /// another process, already owns the log directory. A directory that
    /// cannot be created is logged and left unlocked; runs then record the
    /// setup failure themselves.
    pub fn new(settings: RunSettings, invoker: Arc<dyn ProcessInvoker>) -> Result<Self> {
        let dir_lock = lock_log_dir(&settings.log_dir)?;
        let store = Store::in_dir(&settings.log_dir);
        let history = store.load();
        let status = history::seed_status(&history);

        info!(
            entries = history.len(),
            status = %status,
            "loaded backup history"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                settings,
                invoker,
                store,
                state: Mutex::new(State {
                    status,
                    current: None,
                    history,
                    last_id: None,
                }),
                persist: AsyncMutex::new(()),
                _dir_lock: dir_lock,
            }),
        })
    }

    pub fn settings(&self) -> &RunSettings {
        &self.inner.settings
    }

    /// Starts a run in the background and returns immediately.
    ///
    /// Fails with [`SyncError::Busy`] without touching any state when a run is
    /// already active. Must be called from within a Tokio runtime.
    pub fn start_run(&self) -> Result<RunHandle> {
        let record = {
            let mut state = self.inner.lock();
            if state.status == BackupStatus::Running {
                return Err(SyncError::Busy);
            }

            let started = OffsetDateTime::now_utc();
            let id = transcript::allocate_run_id(
                &self.inner.settings.log_dir,
                started,
                state.last_id.as_deref(),
            );
            let record = RunRecord::started(id.clone(), transcript::file_name(&id), started);

            state.status = BackupStatus::Running;
            state.current = Some(record.clone());
            state.last_id = Some(id);
            record
        };

        info!(run_id = %record.id, log_file = %record.log_file, "backup started");

        let inner = Arc::clone(&self.inner);
        let live = record.clone();
        let completion = tokio::spawn(async move { inner.execute(live).await });

        Ok(RunHandle { record, completion })
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.inner.lock();
        Snapshot {
            status: state.status,
            current: state.current.clone(),
            last_run: state.history.first().cloned(),
        }
    }

    pub fn status(&self) -> BackupStatus {
        self.inner.lock().status
    }

    pub fn current(&self) -> Option<RunRecord> {
        self.inner.lock().current.clone()
    }

    /// Completed runs, newest first.
    pub fn history(&self) -> Vec<RunRecord> {
        self.inner.lock().history.clone()
    }

    pub fn last_run(&self) -> Option<RunRecord> {
        self.inner.lock().history.first().cloned()
    }

    /// Reads a transcript by bare file name.
    pub fn read_transcript(&self, name: &str) -> Result<String> {
        transcript::read(&self.inner.settings.log_dir, name)
    }

    pub async fn check_remote(&self) -> Result<RemoteListing> {
        remote::check(self.inner.invoker.as_ref(), &self.inner.settings).await
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn execute(&self, record: RunRecord) -> RunRecord {
        let log_dir = &self.settings.log_dir;

        if let Err(err) = fs::create_dir_all(log_dir).await {
            error!(dir = %log_dir.display(), error = %err, "failed to create log dir");
        }

        let log_path = log_dir.join(&record.log_file);
        let mut file = match fs::File::create(&log_path).await {
            Ok(file) => file,
            Err(err) => {
                error!(path = %log_path.display(), error = %err, "failed to create log file");
                let outcome = Outcome {
                    tier: Tier::Failed,
                    summary: "failed to create log file".to_string(),
                };
                return self.finish(record, SPAWN_FAILURE_EXIT_CODE, outcome).await;
            }
        };

        let program = self.settings.rsync_path.clone();
        let args = command::rsync_args(&self.settings);
        let banner = transcript::start_banner(
            record.start_time,
            &command::command_line(&program, &args),
        );

        if let Err(err) = write_banner(&mut file, &banner).await {
            warn!(path = %log_path.display(), error = %err, "failed to write log banner");
        }
        let file = file.into_std().await;

        let exit_code = self.invoke(&record, &file, program, args).await;
        let outcome = classify(exit_code);

        let mut file = fs::File::from_std(file);
        let footer = transcript::finish_banner(OffsetDateTime::now_utc(), exit_code);
        if let Err(err) = write_banner(&mut file, &footer).await {
            warn!(path = %log_path.display(), error = %err, "failed to write log banner");
        }
        drop(file);

        let completed = self.finish(record, exit_code, outcome).await;

        let dir: PathBuf = log_dir.clone();
        let max_files = self.settings.max_log_files;
        match tokio::task::spawn_blocking(move || retention::prune(&dir, max_files)).await {
            Ok(0) => {}
            Ok(removed) => info!(removed, "pruned old logs"),
            Err(err) => warn!(error = %err, "log pruning task failed"),
        }

        completed
    }

    async fn invoke(
        &self,
        record: &RunRecord,
        transcript: &File,
        program: String,
        args: Vec<String>,
    ) -> i32 {
        let sink = match transcript.try_clone() {
            Ok(sink) => sink,
            Err(err) => {
                error!(run_id = %record.id, error = %err, "failed to share log file");
                return SPAWN_FAILURE_EXIT_CODE;
            }
        };

        match self.invoker.run(program.clone(), args, sink).await {
            Ok(code) => code,
            Err(err) => {
                error!(run_id = %record.id, program = %program, error = %err, "failed to run sync tool");
                let mut out = transcript;
                let note = format!("failed to start {program}: {err}\n");
                if let Err(err) = std::io::Write::write_all(&mut out, note.as_bytes()) {
                    warn!(run_id = %record.id, error = %err, "failed to write log");
                }
                SPAWN_FAILURE_EXIT_CODE
            }
        }
    }

    /// Freezes the record and publishes it: clears the current run, updates
    /// the aggregate status and prepends to the history under one lock
    /// acquisition, then writes the encoded history off the runtime.
    async fn finish(&self, record: RunRecord, exit_code: i32, outcome: Outcome) -> RunRecord {
        let completed = record.complete(OffsetDateTime::now_utc(), exit_code, outcome);
        let _persist = self.persist.lock().await;

        let encoded = {
            let mut state = self.lock();
            state.current = None;
            state.status = completed.status;
            history::prepend(&mut state.history, completed.clone());
            history::encode(&state.history)
        };

        info!(
            run_id = %completed.id,
            status = %completed.status,
            exit_code,
            duration = %completed.duration,
            summary = %completed.summary,
            "backup finished"
        );

        let store = self.store.clone();
        let written = match encoded {
            Ok(data) => tokio::task::spawn_blocking(move || store.write(&data))
                .await
                .unwrap_or_else(|err| Err(format!("history write task failed: {err}"))),
            Err(err) => Err(err),
        };
        if let Err(err) = written {
            warn!(path = %self.store.path().display(), error = %err, "failed to persist history");
        }

        completed
    }
}

fn lock_log_dir(dir: &Path) -> Result<Option<File>> {
    let path = dir.join(LOCK_FILE_NAME);
    let file = match std::fs::create_dir_all(dir).and_then(|()| {
        OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
    }) {
        Ok(file) => file,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "cannot open lock file; continuing unlocked");
            return Ok(None);
        }
    };

    match file.try_lock_exclusive() {
        Ok(()) => {
            debug!(path = %path.display(), "log directory locked");
            Ok(Some(file))
        }
        Err(err) if is_contended(&err) => {
            warn!(path = %path.display(), "log directory is owned by another syncwatch instance");
            Err(SyncError::Busy)
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "cannot lock log directory; continuing unlocked");
            Ok(None)
        }
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == fs2::lock_contended_error().kind()
}

async fn write_banner(file: &mut fs::File, text: &str) -> std::io::Result<()> {
    file.write_all(text.as_bytes()).await?;
    file.flush().await
}
