//! Transport Session
//!
//! Every operation opens its own SSH connection and tears it down before
//! returning, whatever the outcome. Nothing is shared between operations.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::{ConnectionConfig, LimitsConfig};
use crate::error::Result;
use crate::ports::{SftpChannel, SshClientTrait, SshConnector};

/// Merged, trimmed output of one remote command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub output: String,
    pub exit_code: Option<u32>,
    pub duration_ms: u64,
}

/// Combine an operation result with its teardown result.
///
/// The operation's own error always wins. A teardown failure after a
/// successful operation is logged and otherwise ignored.
pub(crate) fn settle<T>(result: Result<T>, teardown: Result<()>, host: &str) -> Result<T> {
    if let Err(e) = teardown {
        warn!(host = %host, error = %e, "Error while closing SSH connection");
    }
    result
}

/// Connection factory for one configured host
pub struct TransportSession<C> {
    connector: Arc<C>,
    connection: Arc<ConnectionConfig>,
    limits: LimitsConfig,
}

impl<C> Clone for TransportSession<C> {
    fn clone(&self) -> Self {
        Self {
            connector: Arc::clone(&self.connector),
            connection: Arc::clone(&self.connection),
            limits: self.limits.clone(),
        }
    }
}

impl<C: SshConnector> TransportSession<C> {
    #[must_use]
    pub const fn new(
        connector: Arc<C>,
        connection: Arc<ConnectionConfig>,
        limits: LimitsConfig,
    ) -> Self {
        Self {
            connector,
            connection,
            limits,
        }
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.connection.host
    }

    /// Connect, run `command`, close, and return the trimmed output
    ///
    /// # Errors
    ///
    /// Returns a connection error if the host cannot be reached or
    /// authentication fails, and an exec error if the command cannot start,
    /// times out or produces too much output.
    pub async fn run(&self, command: &str) -> Result<ExecutionResult> {
        let client = self.connector.connect(&self.connection, &self.limits).await?;
        debug!(host = %client.host_name(), command = %command, "Executing remote command");

        let result = client.exec(command, &self.limits).await;
        let closed = client.close().await;

        settle(result, closed, self.host()).map(|output| ExecutionResult {
            output: output.output.trim().to_string(),
            exit_code: output.exit_code,
            duration_ms: output.duration_ms,
        })
    }

    /// Connect and open an SFTP channel
    ///
    /// The caller must [`FileChannel::close`] the returned channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or the SFTP subsystem cannot be
    /// opened; the connection is closed before returning.
    pub async fn open_file_channel(&self) -> Result<FileChannel<C::Client>> {
        let client = self.connector.connect(&self.connection, &self.limits).await?;
        match client.open_sftp().await {
            Ok(sftp) => Ok(FileChannel {
                host: self.connection.host.clone(),
                client,
                sftp,
            }),
            Err(e) => {
                let closed = client.close().await;
                settle(Err(e), closed, self.host())
            }
        }
    }
}

/// SFTP channel together with the connection that carries it
pub struct FileChannel<Client: SshClientTrait> {
    host: String,
    client: Client,
    sftp: Client::Sftp,
}

impl<Client: SshClientTrait> FileChannel<Client> {
    #[must_use]
    pub const fn sftp(&self) -> &Client::Sftp {
        &self.sftp
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Close the SFTP session, then the connection
    ///
    /// The connection is closed even if closing the SFTP session fails.
    ///
    /// # Errors
    ///
    /// Returns the first teardown error encountered.
    pub async fn close(self) -> Result<()> {
        let sftp_closed = self.sftp.close().await;
        let client_closed = self.client.close().await;
        sftp_closed.and(client_closed)
    }

    /// Close the channel and fold the teardown outcome into `result`
    pub async fn finish<T>(self, result: Result<T>) -> Result<T> {
        let host = self.host.clone();
        let closed = self.close().await;
        settle(result, closed, &host)
    }
}
