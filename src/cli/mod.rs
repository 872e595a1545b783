use crate::app_error::AppError;
use crate::config::{self, Config, TransferSettings};
use crate::history::{Filter, Store};
use crate::invoker::TokioInvoker;
use crate::logging;
use crate::model::BackupStatus;
use crate::orchestrator::Orchestrator;
use crate::output::{self, StatusView};
use crate::remote;
use crate::scheduler::{self, Scheduler};
use crate::transcript;
use crate::version;
use chrono::Local;
use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Generator, generate};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_CONFIG_PATH: &str = "./syncwatch.yml";

const DEFAULT_CONFIG_TEMPLATE: &str = r#"# what to back up
source_path: "/srv/media"
source_is_file: false       # true when source_path is a single file

# where to send it (rsync over ssh)
remote_host: "backup@nas.local"
remote_path: "/backups/media"
ssh_key_path: "~/.ssh/id_ed25519"

schedule: "0 3 * * *"       # crontab syntax, local time
bandwidth_limit: 0          # KB/s, 0 = unlimited

log_dir: "./logs"           # transcripts, history.json, settings.json
max_log_files: 30
# rsync_path: "rsync"
# stop_timeout: "10s"
"#;

#[derive(Debug, Parser)]
#[command(
    name = "syncwatch",
    version = version::VALUE,
    about = "Scheduled rsync backups with run history and log retention",
    styles = clap_styles()
)]
struct Cli {
    #[arg(long = "no-color", global = true)]
    no_color: bool,
    /// Log filter, e.g. "debug" or "syncwatch=trace" (overrides SYNCWATCH_LOG)
    #[arg(long = "log-level", global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write a starter configuration file
    Init(InitArgs),
    /// Run the scheduler until interrupted
    Serve(ConfigArgs),
    /// Run one backup now and wait for it
    Run(RunArgs),
    /// Show recorded backup runs, newest first
    History(HistoryArgs),
    /// Show the current backup status and next scheduled run
    Status(JsonArgs),
    /// Print the transcript of a run
    Logs(LogsArgs),
    /// List what already exists at the remote destination
    CheckRemote(JsonArgs),
    /// Show or change the saved transfer settings
    Settings(SettingsArgs),
    /// Check the configuration file for problems
    Validate(JsonArgs),
    Version,
    Completion(CompletionArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct JsonArgs {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct InitArgs {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    force: bool,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct HistoryArgs {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value_t = 20)]
    limit: usize,
    #[arg(long)]
    status: Option<String>,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct LogsArgs {
    /// Log file name as shown by `history`
    name: String,
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct SettingsArgs {
    #[command(subcommand)]
    action: SettingsAction,
}

#[derive(Debug, Subcommand)]
enum SettingsAction {
    Show(JsonArgs),
    Set(SetSettingsArgs),
}

#[derive(Debug, Args)]
struct SetSettingsArgs {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long = "source-path", default_value = "")]
    source_path: String,
    #[arg(long = "source-is-file")]
    source_is_file: bool,
    #[arg(long = "remote-host", default_value = "")]
    remote_host: String,
    #[arg(long = "remote-path", default_value = "")]
    remote_path: String,
    #[arg(long = "ssh-key-path", default_value = "")]
    ssh_key_path: String,
}

#[derive(Debug, Args)]
struct CompletionArgs {
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

fn clap_styles() -> Styles {
    Styles::plain()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .error(AnsiColor::Red.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default())
        .literal(AnsiColor::Cyan.on_default())
        .placeholder(AnsiColor::Cyan.on_default())
        .valid(AnsiColor::Cyan.on_default())
        .invalid(AnsiColor::Cyan.on_default())
}

pub async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    output::configure(cli.no_color);
    logging::init(cli.log_level.as_deref());

    match cli.command {
        Commands::Init(args) => run_init(args),
        Commands::Serve(args) => run_serve(args).await,
        Commands::Run(args) => run_run(args).await,
        Commands::History(args) => run_history(args),
        Commands::Status(args) => run_status(args),
        Commands::Logs(args) => run_logs(args),
        Commands::CheckRemote(args) => run_check_remote(args).await,
        Commands::Settings(args) => match args.action {
            SettingsAction::Show(args) => run_settings_show(args),
            SettingsAction::Set(args) => run_settings_set(args),
        },
        Commands::Validate(args) => run_validate(args),
        Commands::Version => {
            println!("{}", version::VALUE);
            Ok(())
        }
        Commands::Completion(args) => run_completion(args),
    }
}

fn config_path(path: Option<PathBuf>) -> PathBuf {
    path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn run_init(args: InitArgs) -> Result<(), AppError> {
    let path = config_path(args.config);

    if path.exists() && !args.force {
        return Err(AppError::usage(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    fs::write(&path, DEFAULT_CONFIG_TEMPLATE)
        .map_err(|e| AppError::internal(format!("write {}: {e}", path.display())))?;

    println!("created {}", output::accent(&path.display().to_string()));
    Ok(())
}

async fn run_serve(args: ConfigArgs) -> Result<(), AppError> {
    let cfg = load_runtime_config(&config_path(args.config))?;

    if !cfg.transfer_configured() {
        warn!("transfer settings are incomplete; scheduled backups will fail until they are set");
    }

    info!(source = %cfg.source_path, dest = %cfg.destination(), "backup target");

    let orchestrator = Orchestrator::new(cfg.resolve(), Arc::new(TokioInvoker))?;
    let mut scheduler = Scheduler::new(orchestrator.clone(), &cfg.schedule)?;
    scheduler.start();

    if let Some(next) = scheduler.next_fire_time() {
        info!(next = %next.format("%Y-%m-%d %H:%M:%S %Z"), "next scheduled backup");
    }

    shutdown_signal().await;
    info!("shutting down");

    scheduler.stop(cfg.stop_timeout()).await;

    if let Some(current) = orchestrator.current() {
        warn!(
            run_id = %current.id,
            "exiting with a backup in progress; the next run resumes from partial files"
        );
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

async fn run_run(args: RunArgs) -> Result<(), AppError> {
    let cfg = load_runtime_config(&config_path(args.config))?;
    require_transfer(&cfg)?;

    let orchestrator = Orchestrator::new(cfg.resolve(), Arc::new(TokioInvoker))?;
    let handle = orchestrator.start_run()?;

    if !args.json {
        println!(
            "{} backup {} started",
            output::info("~"),
            output::accent(&handle.record().id)
        );
    }

    let record = handle.wait().await?;

    if args.json {
        write_json(&record)?;
    } else {
        output::print_history(io::stdout().lock(), std::slice::from_ref(&record))
            .map_err(|e| AppError::internal(format!("print run: {e}")))?;
    }

    match record.status {
        BackupStatus::Failed => Err(AppError::runtime(format!(
            "backup failed: {}",
            record.summary
        ))),
        BackupStatus::Warning => {
            eprintln!("{} {}", output::warning("warn"), record.summary);
            Ok(())
        }
        _ => Ok(()),
    }
}

fn run_history(args: HistoryArgs) -> Result<(), AppError> {
    let status = match args.status.as_deref() {
        None => None,
        Some(text) => match BackupStatus::parse(text) {
            Some(s @ (BackupStatus::Success | BackupStatus::Warning | BackupStatus::Failed)) => {
                Some(s)
            }
            _ => {
                return Err(AppError::usage(
                    "--status must be success, warning, or failed",
                ));
            }
        },
    };

    let log_dir = read_log_dir(&config_path(args.config))?;
    let rows = Store::in_dir(&log_dir).list(&Filter {
        limit: Some(args.limit),
        status,
    });

    if args.json {
        return write_json(&rows);
    }

    output::print_history(io::stdout().lock(), &rows)
        .map_err(|e| AppError::internal(format!("print history: {e}")))
}

fn run_status(args: JsonArgs) -> Result<(), AppError> {
    let cfg = load_runtime_config(&config_path(args.config))?;
    let history = Store::in_dir(&cfg.log_dir).load();
    let schedule = scheduler::parse_schedule(&cfg.schedule)?;

    let view = StatusView {
        status: crate::history::seed_status(&history),
        last_run: history.first().cloned(),
        schedule: cfg.schedule.clone(),
        next_run: schedule.upcoming(Local).next(),
        source: cfg.source_path.clone(),
        dest: cfg.destination(),
        configured: cfg.transfer_configured(),
    };

    if args.json {
        return write_json(&view);
    }

    output::print_status(io::stdout().lock(), &view)
        .map_err(|e| AppError::internal(format!("print status: {e}")))
}

fn run_logs(args: LogsArgs) -> Result<(), AppError> {
    let log_dir = read_log_dir(&config_path(args.config))?;
    let content = transcript::read(&log_dir, &args.name)?;

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(content.as_bytes())
        .map_err(|e| AppError::internal(format!("write output: {e}")))
}

async fn run_check_remote(args: JsonArgs) -> Result<(), AppError> {
    let cfg = load_runtime_config(&config_path(args.config))?;
    require_transfer(&cfg)?;

    let listing = remote::check(&TokioInvoker, &cfg.resolve()).await?;

    if args.json {
        return write_json(&listing);
    }

    if listing.non_empty {
        let mut preview = listing.files.join(", ");
        if listing.files.len() >= 5 {
            preview.push_str(", ...");
        }
        println!(
            "{} remote path already contains files: {}",
            output::warning("!"),
            preview
        );
        println!(
            "  {}",
            output::muted("rsync --delete will remove destination files missing from the source")
        );
    } else {
        println!("{} remote path is empty", output::success("ok"));
    }

    Ok(())
}

fn run_settings_show(args: JsonArgs) -> Result<(), AppError> {
    let cfg = load_runtime_config(&config_path(args.config))?;
    let settings = cfg.transfer_settings();

    if args.json {
        return write_json(&settings);
    }

    println!("{}", output::bold("transfer settings"));
    println!("  source_path: {}", settings.source_path);
    println!("  source_is_file: {}", settings.source_is_file);
    println!("  remote_host: {}", settings.remote_host);
    println!("  remote_path: {}", settings.remote_path);
    println!("  ssh_key_path: {}", settings.ssh_key_path);
    Ok(())
}

fn run_settings_set(args: SetSettingsArgs) -> Result<(), AppError> {
    let mut cfg = load_config_classified(&config_path(args.config))?;

    let settings = TransferSettings {
        source_path: args.source_path,
        source_is_file: args.source_is_file,
        remote_host: args.remote_host,
        remote_path: args.remote_path,
        ssh_key_path: args.ssh_key_path,
    };

    let missing = settings.missing_fields();
    if !missing.is_empty() {
        return Err(AppError::usage(format!(
            "missing required settings: {}",
            missing.join(", ")
        )));
    }

    cfg.apply_transfer_settings(settings);
    config::validate(&cfg).map_err(|e| AppError::usage(e.to_string()))?;
    cfg.save_transfer_settings().map_err(AppError::internal)?;

    println!(
        "{} saved {}",
        output::success("ok"),
        output::accent(&cfg.settings_file_path().display().to_string())
    );
    Ok(())
}

fn run_validate(args: JsonArgs) -> Result<(), AppError> {
    #[derive(Serialize)]
    struct Issue<'a> {
        field: &'a str,
        message: &'a str,
    }

    #[derive(Serialize)]
    struct ValidateOutput<'a> {
        valid: bool,
        config: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        issues: Option<Vec<Issue<'a>>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<&'a str>,
    }

    let path = config_path(args.config);
    let path_text = path.display().to_string();

    let cfg = match config::parse(&path) {
        Ok(cfg) => cfg,
        Err(err) => {
            if args.json {
                write_json(&ValidateOutput {
                    valid: false,
                    config: &path_text,
                    issues: None,
                    error: Some(&err),
                })?;
            }
            return Err(AppError::usage(err));
        }
    };

    match config::validate(&cfg) {
        Ok(()) => {
            if args.json {
                write_json(&ValidateOutput {
                    valid: true,
                    config: &path_text,
                    issues: None,
                    error: None,
                })?;
            } else {
                println!("valid {}", output::accent(&path_text));
            }
            Ok(())
        }
        Err(err) => {
            let message = err.to_string();
            if args.json {
                let issues = err
                    .issues
                    .iter()
                    .map(|issue| Issue {
                        field: &issue.field,
                        message: &issue.message,
                    })
                    .collect();
                write_json(&ValidateOutput {
                    valid: false,
                    config: &path_text,
                    issues: Some(issues),
                    error: Some(&message),
                })?;
            } else {
                for issue in &err.issues {
                    eprintln!("{} {}: {}", output::failure("x"), issue.field, issue.message);
                }
            }
            Err(AppError::usage(message))
        }
    }
}

fn run_completion(args: CompletionArgs) -> Result<(), AppError> {
    let mut cmd = Cli::command();
    let mut stdout = io::stdout().lock();

    match args.shell {
        Shell::Bash => generate_completion(clap_complete::shells::Bash, &mut cmd, &mut stdout),
        Shell::Zsh => generate_completion(clap_complete::shells::Zsh, &mut cmd, &mut stdout),
        Shell::Fish => generate_completion(clap_complete::shells::Fish, &mut cmd, &mut stdout),
        Shell::Powershell => {
            generate_completion(clap_complete::shells::PowerShell, &mut cmd, &mut stdout)
        }
    }
    .map_err(|e| AppError::internal(format!("generate completion: {e}")))
}

fn generate_completion<G: Generator>(
    generator: G,
    cmd: &mut clap::Command,
    writer: &mut impl Write,
) -> Result<(), io::Error> {
    generate(generator, cmd, "syncwatch", writer);
    writer.flush()
}

fn load_config_classified(path: &Path) -> Result<Config, AppError> {
    config::load(path).map_err(classify_config_error)
}

/// Log directory from a config that is parsed but not validated, for the
/// read-only commands that never touch the schedule or transfer fields.
fn read_log_dir(path: &Path) -> Result<PathBuf, AppError> {
    config::parse(path)
        .map(|cfg| cfg.log_dir)
        .map_err(classify_config_error)
}

fn classify_config_error(err: String) -> AppError {
    if err.starts_with("read config:") && !err.contains("No such file") {
        AppError::internal(err)
    } else {
        AppError::usage(err)
    }
}

/// Config with saved transfer settings applied on top.
fn load_runtime_config(path: &Path) -> Result<Config, AppError> {
    let mut cfg = load_config_classified(path)?;
    cfg.load_transfer_settings().map_err(AppError::internal)?;
    Ok(cfg)
}

fn require_transfer(cfg: &Config) -> Result<(), AppError> {
    let missing = cfg.transfer_settings().missing_fields();
    if missing.is_empty() {
        return Ok(());
    }
    Err(AppError::usage(format!(
        "transfer settings are incomplete: missing {}",
        missing.join(", ")
    )))
}

fn write_json<T: Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)
        .map_err(|e| AppError::internal(format!("encode json: {e}")))?;
    writeln!(stdout).map_err(|e| AppError::internal(format!("write output: {e}")))
}
