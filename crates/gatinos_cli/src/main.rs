//! Command-line front end for the colony registry.
//!
//! # Responsibility
//! - Parse arguments, load configuration and open the database.
//! - Dispatch to core services and print text or JSON.
//! - Report failures on stderr with a non-zero exit status.

mod commands;
mod render;

use clap::Parser;
use commands::{Cli, Context};
use gatinos_core::logging::init_from_config;
use gatinos_core::{core_version, open_db, Config};
use log::{error, info};
use std::process::ExitCode;

pub(crate) type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let config = match cli.config.as_deref() {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    // The logger reads its settings from the config, so the load is
    // reported once the logger is up.
    if init_from_config(&config.logging)? {
        info!(
            "event=cli_start module=cli status=ok core_version={}",
            core_version()
        );
        info!(
            "event=config_load module=cli status=ok source={} groups={}",
            cli.config
                .as_deref()
                .map_or_else(|| "defaults".to_string(), |path| path.display().to_string()),
            config.groups.len()
        );
    }

    let db_path = cli
        .db
        .clone()
        .unwrap_or_else(|| config.database.path.clone());
    let conn = open_db(&db_path)?;
    let ctx = Context::new(&conn, config, cli.json)?;
    commands::execute(&ctx, cli.command)
}
