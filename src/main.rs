use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chatops_ssh_bridge::cli::{Cli, Commands, run_dispatch, run_serve, run_status};
use chatops_ssh_bridge::config::{ConnectionConfig, resolve_config};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let is_server_mode = matches!(cli.command, None | Some(Commands::Serve { .. }));

    // Logs go to stderr so `dispatch` output on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(!is_server_mode)
        .init();

    let config = resolve_config(cli.config.as_deref(), cli.commands.as_deref())
        .context("Failed to load configuration")?;

    // Missing host or credentials abort startup, never a single request
    let connection = ConnectionConfig::from_env()
        .context("Remote host configuration is incomplete (SSH_HOST, SSH_PORT, SSH_USER, SSH_PASS)")?;

    info!(
        host = %connection.target(),
        user = %connection.username,
        commands = config.commands.len(),
        "Configuration loaded"
    );

    let config = Arc::new(config);
    let connection = Arc::new(connection);

    match cli.command {
        None => run_serve(config, connection, None).await?,
        Some(Commands::Serve { bind }) => run_serve(config, connection, bind.as_deref()).await?,
        Some(Commands::Dispatch { text }) => run_dispatch(config, connection, &text).await?,
        Some(Commands::Status) => run_status(&config, &connection)?,
    }

    Ok(())
}
