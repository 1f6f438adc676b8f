//! CLI runner functions
//!
//! Every mode goes through the same `CommandDispatcher`; only the
//! front-end differs.

use std::fmt::Write as FmtWrite;
use std::io::{self, Write};
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{Config, ConnectionConfig};
use crate::domain::{AllowList, CommandDispatcher, CommandRequest};
use crate::error::Result;
use crate::http::{AppState, HttpScriptSource, SlackClient, serve};
use crate::ssh::RealSshConnector;

/// Wire the dispatcher to the real SSH and HTTP adapters
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built.
pub fn build_dispatcher(
    config: &Config,
    connection: Arc<ConnectionConfig>,
) -> Result<CommandDispatcher<RealSshConnector, HttpScriptSource>> {
    let source = HttpScriptSource::new(&config.artifacts)?;
    Ok(CommandDispatcher::new(
        Arc::new(RealSshConnector::new()),
        Arc::new(source),
        connection,
        config,
    ))
}

/// Start the HTTP gateway
///
/// # Errors
///
/// Returns an error if the adapters cannot be built or the listen address
/// cannot be bound.
pub async fn run_serve(
    config: Arc<Config>,
    connection: Arc<ConnectionConfig>,
    bind: Option<&str>,
) -> Result<()> {
    let dispatcher = build_dispatcher(&config, connection)?;
    let slack = SlackClient::new(&config.slack)?;
    if !slack.has_token() {
        warn!("SLACK_BOT_TOKEN not set: Slack events will be handled but replies cannot be posted");
    }

    if config.server.api_token.is_none() {
        warn!("API_TOKEN not set: /api/messages accepts unauthenticated requests");
    }

    let addr = bind.unwrap_or(&config.server.bind);
    info!(
        addr = %addr,
        commands = config.commands.len(),
        "Starting gateway"
    );
    let state =
        AppState::new(Arc::new(dispatcher), slack).with_api_token(config.server.api_token.clone());
    serve(addr, state).await
}

/// Dispatch one message and print the reply on stdout
///
/// # Errors
///
/// Returns an error if the adapters cannot be built or stdout cannot be
/// written.
pub async fn run_dispatch(
    config: Arc<Config>,
    connection: Arc<ConnectionConfig>,
    text: &str,
) -> Result<()> {
    let dispatcher = build_dispatcher(&config, connection)?;
    let reply = dispatcher.dispatch(&CommandRequest::from_user(text)).await;

    let mut stdout = io::stdout().lock();
    if let Some(reply) = reply {
        writeln!(stdout, "{reply}")?;
    }
    stdout.flush()?;
    Ok(())
}

/// Show the target host, limits and allow-listed keywords
///
/// # Errors
///
/// Returns an error if stdout cannot be written.
pub fn run_status(config: &Config, connection: &ConnectionConfig) -> Result<()> {
    let mut stdout = io::stdout().lock();
    write!(stdout, "{}", status_report(config, connection))?;
    Ok(())
}

/// Render the status page. The SSH secret is never included.
#[must_use]
pub fn status_report(config: &Config, connection: &ConnectionConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "ChatOps SSH Bridge Status");
    let _ = writeln!(out, "=========================\n");

    let _ = writeln!(out, "Remote Host:");
    let _ = writeln!(out, "  Address: {}", connection.target());
    let _ = writeln!(out, "  User: {}", connection.username);
    let _ = writeln!(
        out,
        "  Connect timeout: {}ms",
        connection.connect_timeout.as_millis()
    );
    let _ = writeln!(
        out,
        "  Host key algorithms: {}",
        connection.accepted_host_key_algorithms.join(", ")
    );
    let _ = writeln!(
        out,
        "  Host key verification: {:?}",
        connection.host_key_verification
    );

    let allow_list = AllowList::new(config.commands.clone());
    let _ = writeln!(out, "\nAllow-listed Commands ({}):", allow_list.len());
    let _ = writeln!(out, "{:-<60}", "");
    if allow_list.is_empty() {
        let _ = writeln!(out, "  (no commands configured)");
    } else {
        for keyword in allow_list.keywords() {
            if let Ok(command) = allow_list.lookup(keyword) {
                let _ = writeln!(out, "  /{keyword:<12} {command}");
            }
        }
    }

    let _ = writeln!(out, "\nArtifacts:");
    let _ = writeln!(out, "  Script URL: {}", config.artifacts.script_url("<name>"));
    let _ = writeln!(
        out,
        "  Remote staging dir: {}",
        config.artifacts.remote_staging_dir
    );

    let _ = writeln!(out, "\nDownloads:");
    let _ = writeln!(out, "  Directory: {}", config.downloads.dir.display());

    let _ = writeln!(out, "\nLimits:");
    let _ = writeln!(
        out,
        "  Command timeout: {}s",
        config.limits.command_timeout_seconds
    );
    let _ = writeln!(out, "  Max output: {} bytes", config.limits.max_output_bytes);

    let _ = writeln!(out, "\nServer:");
    let _ = writeln!(out, "  Bind: {}", config.server.bind);
    let _ = writeln!(
        out,
        "  Slack token: {}",
        if config.slack.bot_token.is_some() {
            "configured"
        } else {
            "not set"
        }
    );
    out
}
