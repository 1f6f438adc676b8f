use std::borrow::Cow;
use std::sync::Arc;
use std::time::{Duration, Instant};

use russh::client::{self, Config, Handle, Handler};
use russh::keys::{Algorithm, PublicKey};
use russh::{ChannelMsg, Preferred};
use russh_sftp::client::SftpSession;
use tokio::time::timeout;

use crate::config::{ConnectionConfig, HostKeyVerification, LimitsConfig};
use crate::error::{BridgeError, Result};
use crate::ssh::known_hosts;
use crate::ssh::sftp::SftpClient;

/// Sanitize SSH error messages to prevent credential leakage.
/// Masks authentication method names and truncates long messages.
pub(crate) fn sanitize_ssh_error(error: &impl std::fmt::Display) -> String {
    let mut msg = error.to_string();
    for method in &["publickey", "keyboard-interactive", "gssapi-with-mic"] {
        msg = msg.replace(method, "***");
    }
    if msg.len() > 500 {
        let mut cut = 500;
        while !msg.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... (truncated)", &msg[..cut])
    } else {
        msg
    }
}

/// Output from a command execution, stdout and stderr merged in arrival order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub output: String,
    /// `None` when the server closed the channel without reporting a status
    pub exit_code: Option<u32>,
    pub duration_ms: u64,
}

/// SSH client handler for russh with host key verification
struct ClientHandler {
    hostname: String,
    port: u16,
    verification_mode: HostKeyVerification,
}

impl ClientHandler {
    const fn new(hostname: String, port: u16, verification_mode: HostKeyVerification) -> Self {
        Self {
            hostname,
            port,
            verification_mode,
        }
    }
}

impl Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match known_hosts::verify_host_key(
            &self.hostname,
            self.port,
            server_public_key,
            self.verification_mode,
        ) {
            Ok(()) => Ok(true),
            Err(e) => {
                tracing::error!(error = %e, "Host key verification failed");
                Ok(false)
            }
        }
    }
}

/// Parse the accepted host key algorithm names, skipping unknown ones
fn host_key_algorithms(names: &[String]) -> Vec<Algorithm> {
    names
        .iter()
        .filter_map(|name| match name.parse::<Algorithm>() {
            Ok(algorithm) => Some(algorithm),
            Err(e) => {
                tracing::warn!(algorithm = %name, error = %e, "Ignoring unknown host key algorithm");
                None
            }
        })
        .collect()
}

/// One authenticated SSH connection
pub struct SshClient {
    handle: Handle<ClientHandler>,
    host_name: String,
}

impl SshClient {
    /// Connect and authenticate with the configured password
    ///
    /// The connect timeout covers TCP setup, key exchange and authentication.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The SSH connection cannot be established (network error, timeout)
    /// - Host key verification fails
    /// - Authentication is rejected
    #[must_use = "the SSH client must be used or closed"]
    pub async fn connect(connection: &ConnectionConfig, limits: &LimitsConfig) -> Result<Self> {
        let timeout_ms = connection.connect_timeout.as_millis();
        timeout(connection.connect_timeout, async {
            let handle = Self::establish_connection(connection, limits).await?;
            Self::auth_with_password(handle, connection).await
        })
        .await
        .map_err(|_| {
            tracing::error!(host = %connection.host, timeout_ms, "SSH connection timeout");
            BridgeError::SshConnection {
                host: connection.host.clone(),
                reason: format!("Connection timeout after {timeout_ms}ms"),
            }
        })?
    }

    async fn establish_connection(
        connection: &ConnectionConfig,
        limits: &LimitsConfig,
    ) -> Result<Handle<ClientHandler>> {
        let mut preferred = Preferred::default();
        let algorithms = host_key_algorithms(&connection.accepted_host_key_algorithms);
        if !algorithms.is_empty() {
            preferred.key = Cow::Owned(algorithms);
        }

        let config = Config {
            inactivity_timeout: Some(Duration::from_secs(limits.command_timeout_seconds)),
            keepalive_interval: Some(Duration::from_secs(limits.keepalive_interval_seconds)),
            keepalive_max: 3,
            preferred,
            ..Default::default()
        };

        let handler = ClientHandler::new(
            connection.host.clone(),
            connection.port,
            connection.host_key_verification,
        );
        let addr = connection.target();

        client::connect(Arc::new(config), addr.as_str(), handler)
            .await
            .map_err(|e| {
                tracing::error!(host = %connection.host, addr = %addr, error = %sanitize_ssh_error(&e), "SSH connection failed");
                BridgeError::SshConnection {
                    host: connection.host.clone(),
                    reason: sanitize_ssh_error(&e),
                }
            })
    }

    async fn auth_with_password(
        mut handle: Handle<ClientHandler>,
        connection: &ConnectionConfig,
    ) -> Result<Self> {
        let user = connection.username.as_str();
        let auth_result = match handle
            .authenticate_password(user, connection.secret.as_str())
            .await
        {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(host = %connection.host, user = %user, error = %sanitize_ssh_error(&e), "SSH password authentication error");
                Self::abandon(handle, &connection.host).await;
                return Err(BridgeError::SshAuth {
                    user: user.to_string(),
                    host: connection.host.clone(),
                });
            }
        };

        if !auth_result.success() {
            tracing::error!(host = %connection.host, user = %user, "SSH password authentication failed");
            Self::abandon(handle, &connection.host).await;
            return Err(BridgeError::SshAuth {
                user: user.to_string(),
                host: connection.host.clone(),
            });
        }

        tracing::debug!(host = %connection.host, user = %user, "SSH session authenticated");
        Ok(Self {
            handle,
            host_name: connection.host.clone(),
        })
    }

    /// Release a connection that never reached the authenticated state
    async fn abandon(handle: Handle<ClientHandler>, host: &str) {
        if let Err(e) = handle
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
        {
            tracing::debug!(host = %host, error = %e, "Disconnect after failed authentication");
        }
    }

    /// Execute a command and collect its merged output
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The SSH channel cannot be opened
    /// - The server rejects the exec request
    /// - The command times out
    /// - The output exceeds the maximum allowed size
    pub async fn exec(&self, command: &str, limits: &LimitsConfig) -> Result<CommandOutput> {
        let start = Instant::now();

        let mut channel =
            self.handle
                .channel_open_session()
                .await
                .map_err(|e| BridgeError::SshExec {
                    reason: format!("Failed to open channel: {e}"),
                })?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| BridgeError::SshExec {
                reason: format!("Failed to execute command: {e}"),
            })?;

        let (output, exit_code) = Self::read_command_output(&mut channel, limits).await?;

        #[expect(clippy::cast_possible_truncation)]
        let duration_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(host = %self.host_name, exit_code = ?exit_code, duration_ms, "Command finished");

        Ok(CommandOutput {
            output: String::from_utf8_lossy(&output).into_owned(),
            exit_code,
            duration_ms,
        })
    }

    /// Read command output from channel with timeout
    async fn read_command_output(
        channel: &mut russh::Channel<russh::client::Msg>,
        limits: &LimitsConfig,
    ) -> Result<(Vec<u8>, Option<u32>)> {
        let mut output = Vec::new();
        let mut exit_code = None;
        let command_timeout = Duration::from_secs(limits.command_timeout_seconds);

        let result = timeout(command_timeout, async {
            loop {
                match channel.wait().await {
                    Some(ChannelMsg::Data { data }) => {
                        append_capped(&mut output, &data, limits.max_output_bytes)?;
                    }
                    Some(ChannelMsg::ExtendedData { data, ext }) => {
                        if ext == 1 {
                            append_capped(&mut output, &data, limits.max_output_bytes)?;
                        }
                    }
                    Some(ChannelMsg::ExitStatus { exit_status }) => {
                        exit_code = Some(exit_status);
                    }
                    Some(ChannelMsg::Failure) => {
                        return Err(BridgeError::SshExec {
                            reason: "Exec request rejected by server".to_string(),
                        });
                    }
                    None => break,
                    // ExitStatus may arrive before or after Eof; keep reading
                    // until the channel is fully closed.
                    _ => {}
                }
            }
            Ok((std::mem::take(&mut output), exit_code))
        })
        .await;

        match result {
            Ok(Ok(collected)) => Ok(collected),
            Ok(Err(e)) => {
                let _ = channel.close().await;
                Err(e)
            }
            Err(_) => {
                let _ = channel.close().await;
                Err(BridgeError::SshTimeout {
                    seconds: limits.command_timeout_seconds,
                })
            }
        }
    }

    /// Get the host name
    #[must_use]
    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    /// Close the connection (with 5s timeout to avoid blocking)
    ///
    /// # Errors
    ///
    /// Returns an error if the disconnect message cannot be sent to the server.
    pub async fn close(self) -> Result<()> {
        match timeout(
            Duration::from_secs(5),
            self.handle
                .disconnect(russh::Disconnect::ByApplication, "", "en"),
        )
        .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(BridgeError::SshConnection {
                host: self.host_name,
                reason: e.to_string(),
            }),
            Err(_) => {
                tracing::warn!(host = %self.host_name, "Timeout closing SSH connection, forcing drop");
                Ok(())
            }
        }
    }

    /// Create an SFTP session for file transfers
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The SSH channel cannot be opened
    /// - The SFTP subsystem request fails
    /// - SFTP initialization fails
    pub async fn sftp_session(&self) -> Result<SftpClient> {
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| BridgeError::Sftp {
                reason: format!("Failed to open channel: {e}"),
            })?;

        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| BridgeError::Sftp {
                reason: format!("Failed to request SFTP subsystem: {e}"),
            })?;

        let sftp_session =
            SftpSession::new(channel.into_stream())
                .await
                .map_err(|e| BridgeError::Sftp {
                    reason: format!("Failed to initialize SFTP session: {e}"),
                })?;

        Ok(SftpClient::new(sftp_session))
    }
}

fn append_capped(buffer: &mut Vec<u8>, data: &[u8], limit: usize) -> Result<()> {
    if buffer.len() + data.len() > limit {
        return Err(BridgeError::SshOutputTooLarge { limit_bytes: limit });
    }
    buffer.extend_from_slice(data);
    Ok(())
}
