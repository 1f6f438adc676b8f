//! Command Dispatcher
//!
//! Turns one inbound message into at most one reply. Errors never escape
//! a dispatch: each is logged and rendered as a `❌` reply.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use super::allowlist::AllowList;
use super::command::{Command, CommandRequest, Greeting};
use super::replies;
use super::stager::ScriptStager;
use super::transfer::FileTransfer;
use super::transport::TransportSession;
use crate::config::{Config, ConnectionConfig};
use crate::error::BridgeError;
use crate::ports::{ChatHandler, ScriptSource, SshConnector};

pub struct CommandDispatcher<C, S> {
    allow_list: AllowList,
    session: TransportSession<C>,
    transfer: Arc<FileTransfer<C>>,
    stager: ScriptStager<C, S>,
}

impl<C: SshConnector, S: ScriptSource> CommandDispatcher<C, S> {
    /// Build a dispatcher staging scripts in the system temp directory
    #[must_use]
    pub fn new(
        connector: Arc<C>,
        source: Arc<S>,
        connection: Arc<ConnectionConfig>,
        config: &Config,
    ) -> Self {
        Self::with_script_dir(connector, source, connection, config, std::env::temp_dir())
    }

    #[must_use]
    pub fn with_script_dir(
        connector: Arc<C>,
        source: Arc<S>,
        connection: Arc<ConnectionConfig>,
        config: &Config,
        script_dir: PathBuf,
    ) -> Self {
        let session = TransportSession::new(connector, connection, config.limits.clone());
        let transfer = Arc::new(FileTransfer::new(
            session.clone(),
            config.downloads.dir.clone(),
        ));
        let stager = ScriptStager::new(
            source,
            session.clone(),
            Arc::clone(&transfer),
            config.artifacts.clone(),
            script_dir,
        );
        Self {
            allow_list: AllowList::new(config.commands.clone()),
            session,
            transfer,
            stager,
        }
    }

    #[must_use]
    pub const fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    /// Handle one inbound message
    ///
    /// # Returns
    /// The reply, or `None` for messages that are dropped silently
    pub async fn dispatch(&self, request: &CommandRequest) -> Option<String> {
        match Command::parse(request, &self.allow_list) {
            Command::Ignored => {
                debug!(role = ?request.source_role, "Ignoring message");
                None
            }
            Command::PlainText(greeting) => Some(self.greet(greeting)),
            Command::GetLog { path } => Some(self.get_log(&path).await),
            Command::RunScript { name } => Some(self.run_script(&name).await),
            Command::AllowListed { keyword, command } => {
                Some(self.run_allow_listed(&keyword, &command).await)
            }
            Command::Unrecognized { keyword } => {
                let err = BridgeError::CommandNotAllowed {
                    keyword: keyword.clone(),
                };
                warn!(kind = ?err.kind(), error = %err, "Rejected command");
                Some(replies::not_allowed(&keyword))
            }
        }
    }

    fn greet(&self, greeting: Greeting) -> String {
        match greeting {
            Greeting::Hi => replies::HI.to_string(),
            Greeting::Hello => replies::HELLO.to_string(),
            Greeting::Help => replies::help(&self.allow_list),
            Greeting::Intro => replies::INTRO.to_string(),
        }
    }

    async fn get_log(&self, remote_path: &str) -> String {
        info!(remote = %remote_path, "Retrieving remote file");
        match self.transfer.download(remote_path).await {
            Ok(local_path) => replies::log_saved(remote_path, &local_path),
            Err(e) => {
                report("getlog", &e);
                replies::log_failed(&e)
            }
        }
    }

    async fn run_script(&self, name: &str) -> String {
        info!(script = %name, "Running script");
        match self.stager.fetch_and_run(name).await {
            Ok(reply) => reply,
            Err(e) => {
                report("runscript", &e);
                replies::script_failed(&e)
            }
        }
    }

    async fn run_allow_listed(&self, keyword: &str, command: &str) -> String {
        info!(keyword = %keyword, host = %self.session.host(), "Running allow-listed command");
        match self.session.run(command).await {
            Ok(result) => replies::command_result(&result.output),
            Err(e) => {
                report(keyword, &e);
                replies::command_failed(&e)
            }
        }
    }
}

/// Record a failure converted into a reply
fn report(keyword: &str, err: &BridgeError) {
    error!(keyword = %keyword, kind = ?err.kind(), error = %err, "Command failed");
}

#[async_trait]
impl<C: SshConnector, S: ScriptSource> ChatHandler for CommandDispatcher<C, S> {
    async fn handle(&self, request: CommandRequest) -> Option<String> {
        self.dispatch(&request).await
    }
}
