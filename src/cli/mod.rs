//! CLI module
//!
//! Runs the HTTP gateway, or dispatches a single command from the terminal
//! through the same dispatcher the chat front-ends use.

mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use runner::{build_dispatcher, run_dispatch, run_serve, run_status, status_report};

/// ChatOps SSH Bridge - run allow-listed commands on a remote host from chat
#[derive(Parser)]
#[command(name = "chatops-ssh-bridge")]
#[command(about = "Chat-driven gateway for allow-listed SSH commands, log retrieval and scripts")]
#[command(version)]
#[command(after_help = "ENVIRONMENT:
    SSH_HOST, SSH_PORT, SSH_USER, SSH_PASS     remote host (required)
    SSH_READY_TIMEOUT_MS                       connect timeout (default 20000)
    NEXUS_HOST                                 artifact repository base URL
    SLACK_BOT_TOKEN                            token used to post Slack replies
    API_TOKEN                                  bearer token required on /api/messages
    PORT                                       HTTP port (default 3978)

EXAMPLES:
    # Start the HTTP gateway (default mode)
    chatops-ssh-bridge

    # Use a separate allow-list file
    chatops-ssh-bridge --commands allowed-commands.yaml serve

    # Dispatch one command and print the reply
    chatops-ssh-bridge dispatch \"/df\"

    # Show the target host and allow-listed keywords
    chatops-ssh-bridge status")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to an allow-list file (keyword: command mapping)
    #[arg(long, global = true)]
    pub commands: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP gateway - same as running without arguments
    Serve {
        /// Listen address, overrides `server.bind` and PORT
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Dispatch one message and print the reply
    Dispatch {
        /// Message text, e.g. "/df" or "/getlog /var/log/syslog"
        text: String,
    },

    /// Show the target host, limits and allow-listed keywords
    Status,
}
