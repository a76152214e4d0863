mod auth;
mod cli;
mod config;
mod error;
mod lifecycle;
mod output;
mod providers;

use std::process::ExitCode;

use clap::Parser;
use cli::Cli;
use log::{debug, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting pipeline-trigger");

    match cli.execute().await {
        Ok(pipeline_id) => {
            debug!("Pipeline {pipeline_id} done");
            ExitCode::SUCCESS
        }
        Err(err) => {
            if let Some(pipeline_id) = err.pipeline_id() {
                debug!("Run for pipeline {pipeline_id} failed");
            }
            if !err.is_reported() {
                eprintln!("{}", output::bright_red(format!("Error: {err}")).for_stderr());
            }
            ExitCode::from(err.exit_code())
        }
    }
}
