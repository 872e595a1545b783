use crate::scheduler;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

pub const SETTINGS_FILE_NAME: &str = "settings.json";

const DEFAULT_LOG_DIR: &str = "./logs";
const DEFAULT_MAX_LOG_FILES: usize = 30;
const DEFAULT_RSYNC_PATH: &str = "rsync";
const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);

static REMOTE_HOST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s:]+(@[^@\s:]+)?$").expect("valid regex"));

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub source_path: String,
    pub source_is_file: bool,
    pub remote_host: String,
    pub remote_path: String,
    pub ssh_key_path: String,
    pub schedule: String,
    pub bandwidth_limit: u32,
    pub log_dir: PathBuf,
    pub max_log_files: usize,
    pub rsync_path: String,
    pub stop_timeout: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_path: String::new(),
            source_is_file: false,
            remote_host: String::new(),
            remote_path: String::new(),
            ssh_key_path: String::new(),
            schedule: String::new(),
            bandwidth_limit: 0,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            max_log_files: DEFAULT_MAX_LOG_FILES,
            rsync_path: DEFAULT_RSYNC_PATH.to_string(),
            stop_timeout: String::new(),
        }
    }
}

/// Immutable settings a run is executed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub rsync_path: String,
    pub source_path: String,
    pub source_is_file: bool,
    pub remote_host: String,
    pub remote_path: String,
    pub ssh_key_path: String,
    pub bandwidth_limit: u32,
    pub log_dir: PathBuf,
    pub max_log_files: usize,
}

/// The user-editable transfer fields, persisted next to the logs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferSettings {
    pub source_path: String,
    pub source_is_file: bool,
    pub remote_host: String,
    pub remote_path: String,
    pub ssh_key_path: String,
}

impl TransferSettings {
    /// Names of required fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("source_path", &self.source_path),
            ("remote_host", &self.remote_host),
            ("remote_path", &self.remote_path),
            ("ssh_key_path", &self.ssh_key_path),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationErrors {
    pub issues: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F: Into<String>, M: Into<String>>(&mut self, field: F, message: M) {
        self.issues.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(first) = self.issues.first() {
            write!(
                f,
                "configuration validation failed: {}: {}",
                first.field, first.message
            )
        } else {
            write!(f, "configuration validation failed")
        }
    }
}

impl std::error::Error for ValidationErrors {}

pub fn load(path: &Path) -> Result<Config, String> {
    let cfg = parse(path)?;
    validate(&cfg).map_err(|e| e.to_string())?;
    Ok(cfg)
}

pub fn parse(path: &Path) -> Result<Config, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("read config: {e}"))?;
    let cfg: Config = serde_yaml::from_str(&text).map_err(|e| format!("parse config yaml: {e}"))?;
    Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<(), ValidationErrors> {
    let mut issues = ValidationErrors::new();

    if cfg.schedule.trim().is_empty() {
        issues.add("schedule", "is required");
    } else if let Err(err) = scheduler::parse_schedule(&cfg.schedule) {
        issues.add("schedule", err.to_string());
    }

    if cfg.max_log_files == 0 {
        issues.add("max_log_files", "must be at least 1");
    }

    if !cfg.remote_host.is_empty() && !REMOTE_HOST_RE.is_match(&cfg.remote_host) {
        issues.add("remote_host", "must be host or user@host");
    }

    if cfg.rsync_path.trim().is_empty() {
        issues.add("rsync_path", "must not be empty");
    }

    if !cfg.stop_timeout.is_empty() && humantime::parse_duration(&cfg.stop_timeout).is_err() {
        issues.add("stop_timeout", "must be a valid duration");
    }

    if issues.has_issues() {
        Err(issues)
    } else {
        Ok(())
    }
}

impl Config {
    pub fn resolve(&self) -> RunSettings {
        RunSettings {
            rsync_path: self.rsync_path.clone(),
            source_path: self.source_path.clone(),
            source_is_file: self.source_is_file,
            remote_host: self.remote_host.clone(),
            remote_path: self.remote_path.clone(),
            ssh_key_path: self.ssh_key_path.clone(),
            bandwidth_limit: self.bandwidth_limit,
            log_dir: self.log_dir.clone(),
            max_log_files: self.max_log_files,
        }
    }

    pub fn stop_timeout(&self) -> Duration {
        if self.stop_timeout.is_empty() {
            return DEFAULT_STOP_TIMEOUT;
        }
        humantime::parse_duration(&self.stop_timeout).unwrap_or(DEFAULT_STOP_TIMEOUT)
    }

    pub fn transfer_configured(&self) -> bool {
        self.transfer_settings().missing_fields().is_empty()
    }

    pub fn destination(&self) -> String {
        format!("{}:{}", self.remote_host, self.remote_path)
    }

    pub fn settings_file_path(&self) -> PathBuf {
        self.log_dir.join(SETTINGS_FILE_NAME)
    }

    pub fn transfer_settings(&self) -> TransferSettings {
        TransferSettings {
            source_path: self.source_path.clone(),
            source_is_file: self.source_is_file,
            remote_host: self.remote_host.clone(),
            remote_path: self.remote_path.clone(),
            ssh_key_path: self.ssh_key_path.clone(),
        }
    }

    pub fn apply_transfer_settings(&mut self, settings: TransferSettings) {
        self.source_path = settings.source_path;
        self.source_is_file = settings.source_is_file;
        self.remote_host = settings.remote_host;
        self.remote_path = settings.remote_path;
        self.ssh_key_path = settings.ssh_key_path;
    }

    /// Applies saved transfer settings over the file-based ones. A missing
    /// settings file leaves the config untouched.
    pub fn load_transfer_settings(&mut self) -> Result<(), String> {
        let data = match fs::read(self.settings_file_path()) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(format!("read settings file: {err}")),
        };

        let settings: TransferSettings =
            serde_json::from_slice(&data).map_err(|e| format!("parse settings file: {e}"))?;
        self.apply_transfer_settings(settings);
        Ok(())
    }

    pub fn save_transfer_settings(&self) -> Result<(), String> {
        let path = self.settings_file_path();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| format!("create settings directory: {e}"))?;
        }

        let data = serde_json::to_vec_pretty(&self.transfer_settings())
            .map_err(|e| format!("serialize settings: {e}"))?;
        fs::write(&path, data).map_err(|e| format!("write settings file: {e}"))
    }
}
