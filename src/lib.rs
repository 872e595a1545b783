pub mod app_error;
pub mod classify;
pub mod cli;
pub mod command;
pub mod config;
pub mod errors;
pub mod history;
pub mod invoker;
pub mod logging;
pub mod model;
pub mod orchestrator;
pub mod output;
pub mod remote;
pub mod retention;
pub mod scheduler;
pub mod transcript;
pub mod version;

use app_error::ExitCode;

pub fn run() -> i32 {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("start async runtime: {err}");
            return ExitCode::Internal as i32;
        }
    };

    match runtime.block_on(cli::run_cli()) {
        Ok(()) => ExitCode::Success as i32,
        Err(err) => {
            eprintln!("{err}");
            err.code()
        }
    }
}
