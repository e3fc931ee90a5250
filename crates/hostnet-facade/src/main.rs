//! hostnetctl - command line front end for hostnet
//!
//! Prints each result as pretty JSON on stdout; logs go to stderr.

use anyhow::Result;
use clap::Parser;
use serde_json::Value;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;

use hostnet_facade::cli::{dispatch, error_body, load_config, Cli};
use hostnet_facade::logging::init_logging;
use hostnet_facade::Facade;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let (body, code) = match run(cli).await {
        Ok(value) => (value, ExitCode::SUCCESS),
        Err(e) => (error_body(&e), ExitCode::FAILURE),
    };
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(code)
}

async fn run(cli: Cli) -> Result<Value> {
    let config = load_config(&cli.config)?;
    init_logging(&config.log.level);
    debug!(config = %cli.config.display(), "Configuration loaded");

    let facade = Facade::new(Arc::new(config));
    dispatch(&facade, cli.command).await
}
