//! SSH Connector Port
//!
//! This module defines traits for SSH connection creation, command execution
//! and SFTP transfers, abstracting away the underlying SSH implementation
//! for testability.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use async_trait::async_trait;

use crate::config::{ConnectionConfig, LimitsConfig};
use crate::error::Result;
use crate::ssh::CommandOutput;

/// Trait for creating authenticated SSH connections
///
/// Every call opens a fresh connection; nothing is pooled.
#[async_trait]
pub trait SshConnector: Send + Sync {
    /// The type of client returned by this connector
    type Client: SshClientTrait;

    /// Connect and authenticate to the configured host
    ///
    /// # Arguments
    /// * `connection` - Host, credentials and connect timeout
    /// * `limits` - Keepalive and command limits
    async fn connect(
        &self,
        connection: &ConnectionConfig,
        limits: &LimitsConfig,
    ) -> Result<Self::Client>;
}

/// Trait for operations on an established SSH connection
#[async_trait]
pub trait SshClientTrait: Send + Sync {
    /// File channel opened over this connection
    type Sftp: SftpChannel;

    /// Execute a command, merging stdout and stderr in arrival order
    async fn exec(&self, command: &str, limits: &LimitsConfig) -> Result<CommandOutput>;

    /// Open the SFTP subsystem on a new channel
    async fn open_sftp(&self) -> Result<Self::Sftp>;

    /// Get the host name
    fn host_name(&self) -> &str;

    /// Close the connection
    fn close(self) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>;
}

/// Trait for streaming files over an SFTP channel
#[async_trait]
pub trait SftpChannel: Send + Sync {
    /// Stream a remote file into `local_path`, returning the bytes copied
    async fn download(&self, remote_path: &str, local_path: &Path) -> Result<u64>;

    /// Create or overwrite `remote_path` with the content of `local_path`
    /// and the given permission bits, returning the bytes copied
    async fn upload(&self, local_path: &Path, remote_path: &str, mode: u32) -> Result<u64>;

    /// Close the SFTP session
    fn close(self) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>;
}
