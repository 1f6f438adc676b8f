//! SSH Connector Adapter
//!
//! Concrete implementation of the `SshConnector`, `SshClientTrait` and
//! `SftpChannel` ports using the russh SSH client.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use async_trait::async_trait;

use crate::config::{ConnectionConfig, LimitsConfig};
use crate::error::Result;
use crate::ports::{SftpChannel, SshClientTrait, SshConnector};
use crate::ssh::{CommandOutput, SftpClient, SshClient};

/// Real SSH connector using russh
#[derive(Default, Clone)]
pub struct RealSshConnector;

impl RealSshConnector {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SshConnector for RealSshConnector {
    type Client = SshClient;

    async fn connect(
        &self,
        connection: &ConnectionConfig,
        limits: &LimitsConfig,
    ) -> Result<Self::Client> {
        SshClient::connect(connection, limits).await
    }
}

#[async_trait]
impl SshClientTrait for SshClient {
    type Sftp = SftpClient;

    async fn exec(&self, command: &str, limits: &LimitsConfig) -> Result<CommandOutput> {
        self.exec(command, limits).await
    }

    async fn open_sftp(&self) -> Result<Self::Sftp> {
        self.sftp_session().await
    }

    fn host_name(&self) -> &str {
        self.host_name()
    }

    fn close(self) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
        Box::pin(async move { self.close().await })
    }
}

#[async_trait]
impl SftpChannel for SftpClient {
    async fn download(&self, remote_path: &str, local_path: &Path) -> Result<u64> {
        self.download_file(remote_path, local_path).await
    }

    async fn upload(&self, local_path: &Path, remote_path: &str, mode: u32) -> Result<u64> {
        self.upload_file(local_path, remote_path, mode).await
    }

    fn close(self) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
        Box::pin(async move { self.close().await })
    }
}
