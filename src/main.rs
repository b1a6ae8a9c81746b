use clap::Parser;
use std::process::ExitCode;

use anyhow::Result;

mod cli;
mod commands;
mod config;
mod daemon;
mod dict;
mod index;
mod utils;

use cli::args::{Cli, Commands};
use commands::LookupOptions;
use config::DictPaths;
use utils::error::exit_code;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("ondict=debug")
            .with_writer(std::io::stderr)
            .init();
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!("Exiting with error: {err:?}");
            eprintln!("Error: {err:#}");
            exit_code(&err)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let paths = DictPaths::resolve(cli.dict, cli.css)?;

    match cli.command {
        Commands::Lookup { word, options } => {
            let options = LookupOptions::from(options);
            commands::handle_lookup_command(&word, &options, &paths, cli.verbose, cli.color).await
        }
        Commands::Interactive { options } => {
            let options = LookupOptions::from(options);
            commands::handle_interactive_command(&options, &paths, cli.verbose, cli.color).await
        }
        Commands::Serve { listen, idle_timeout } => {
            commands::handle_serve_command(&listen, idle_timeout, &paths).await
        }
        Commands::Daemon { command } => commands::handle_daemon_command(command, cli.color).await,
    }
}
