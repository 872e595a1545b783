//! Cron-driven trigger for the orchestrator.
//!
//! One background task sleeps until the next fire time and calls
//! [`Orchestrator::start_run`]. A tick that lands while a run is active is
//! logged and dropped; ticks never queue.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Local};
use cron::Schedule as CronSchedule;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::errors::{Result, SyncError};
use crate::orchestrator::Orchestrator;

const DAY_NAMES: [&str; 8] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

/// Parses a 5-field crontab or 6-field (seconds first) expression.
///
/// Five-field expressions get a `0` seconds field, and numeric days of week
/// (0-7, Sunday = 0 or 7) are rewritten to names.
pub fn parse_schedule(expression: &str) -> Result<CronSchedule> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    let normalized = match fields.len() {
        5 => format!(
            "0 {} {} {} {} {}",
            fields[0],
            fields[1],
            fields[2],
            fields[3],
            day_of_week_names(fields[4])
        ),
        6 => fields.join(" "),
        0 => {
            return Err(SyncError::InvalidSchedule {
                expression: expression.to_string(),
                message: "empty expression".to_string(),
            });
        }
        n => {
            return Err(SyncError::InvalidSchedule {
                expression: expression.to_string(),
                message: format!("expected 5 or 6 fields, found {n}"),
            });
        }
    };

    CronSchedule::from_str(&normalized).map_err(|e| SyncError::InvalidSchedule {
        expression: expression.to_string(),
        message: e.to_string(),
    })
}

fn day_of_week_names(field: &str) -> String {
    field
        .split(',')
        .map(day_of_week_part)
        .collect::<Vec<_>>()
        .join(",")
}

fn day_of_week_part(part: &str) -> String {
    let (base, step) = match part.split_once('/') {
        Some((base, step)) => (base, Some(step)),
        None => (part, None),
    };

    // A range ending at 7 wraps past SAT, which the cron crate cannot express
    // as a single range.
    if let Some((start, end)) = base.split_once('-')
        && let (Ok(start), Ok(7)) = (start.parse::<usize>(), end.parse::<usize>())
        && start <= 7
    {
        return match step.map(str::parse::<usize>) {
            None => match start {
                0 => "SUN-SAT".to_string(),
                7 => "SUN".to_string(),
                _ => format!("{}-SAT,SUN", DAY_NAMES[start]),
            },
            Some(Ok(step)) if step > 0 => {
                let mut names: Vec<&str> = Vec::new();
                for day in (start..=7).step_by(step) {
                    if !names.contains(&DAY_NAMES[day]) {
                        names.push(DAY_NAMES[day]);
                    }
                }
                names.join(",")
            }
            Some(_) => part.to_string(),
        };
    }

    let base = base
        .split('-')
        .map(|item| match item.parse::<usize>() {
            Ok(n) if n < DAY_NAMES.len() => DAY_NAMES[n].to_string(),
            _ => item.to_string(),
        })
        .collect::<Vec<_>>()
        .join("-");
    match step {
        Some(step) => format!("{base}/{step}"),
        None => base,
    }
}

pub struct Scheduler {
    expression: String,
    schedule: CronSchedule,
    orchestrator: Orchestrator,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(orchestrator: Orchestrator, expression: &str) -> Result<Self> {
        let schedule = parse_schedule(expression)?;
        Ok(Self {
            expression: expression.to_string(),
            schedule,
            orchestrator,
            shutdown: None,
            task: None,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Next time the schedule fires, in local time.
    pub fn next_fire_time(&self) -> Option<DateTime<Local>> {
        self.schedule.upcoming(Local).next()
    }

    /// Spawns the dispatch loop. Calling it again while running is a no-op.
    pub fn start(&mut self) {
        if self.task.is_some() {
            return;
        }

        let (tx, rx) = oneshot::channel();
        let schedule = self.schedule.clone();
        let orchestrator = self.orchestrator.clone();
        self.task = Some(tokio::spawn(dispatch_loop(schedule, orchestrator, rx)));
        self.shutdown = Some(tx);

        info!(schedule = %self.expression, "scheduler started");
    }

    /// Stops the dispatch loop and waits at most `limit` for it to exit.
    /// Runs already in flight are not waited for. Returns false on timeout.
    pub async fn stop(&mut self, limit: Duration) -> bool {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        let Some(mut task) = self.task.take() else {
            return true;
        };

        match tokio::time::timeout(limit, &mut task).await {
            Ok(_) => {
                info!("scheduler stopped");
                true
            }
            Err(_) => {
                warn!(limit = ?limit, "scheduler did not stop in time; aborting");
                task.abort();
                false
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn dispatch_loop(
    schedule: CronSchedule,
    orchestrator: Orchestrator,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        let Some(next) = schedule.upcoming(Local).next() else {
            warn!("schedule has no upcoming fire times");
            return;
        };
        let wait = (next - Local::now()).to_std().unwrap_or(Duration::ZERO);

        tokio::select! {
            _ = tokio::time::sleep(wait) => fire(&orchestrator),
            _ = &mut shutdown => return,
        }
    }
}

fn fire(orchestrator: &Orchestrator) {
    info!("scheduled backup triggered");
    match orchestrator.start_run() {
        Ok(handle) => drop(handle),
        Err(err) => info!(error = %err, "scheduled backup skipped"),
    }
}
