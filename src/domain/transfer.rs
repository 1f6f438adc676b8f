//! File Transfer
//!
//! Single-file download and upload, each over its own SSH connection.

use std::path::{Path, PathBuf};

use tracing::info;

use super::transport::TransportSession;
use crate::error::{BridgeError, Result};
use crate::ports::{SftpChannel, SshConnector};

pub struct FileTransfer<C> {
    session: TransportSession<C>,
    download_dir: PathBuf,
}

impl<C: SshConnector> FileTransfer<C> {
    #[must_use]
    pub const fn new(session: TransportSession<C>, download_dir: PathBuf) -> Self {
        Self {
            session,
            download_dir,
        }
    }

    #[must_use]
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Local destination of a download: the remote base name inside the
    /// download directory
    ///
    /// # Errors
    ///
    /// Returns an error if the remote path has no file name (`/`, `/var/log/`).
    pub fn local_path_for(&self, remote_path: &str) -> Result<PathBuf> {
        let file_name = Path::new(remote_path)
            .file_name()
            .filter(|_| !remote_path.ends_with('/'))
            .ok_or_else(|| BridgeError::FileTransfer {
                reason: format!("Cannot derive a local file name from {remote_path}"),
            })?;
        Ok(self.download_dir.join(file_name))
    }

    /// Stream a remote file into the download directory
    ///
    /// The directory is created when missing. An existing local file with
    /// the same name is overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails or if either side cannot
    /// be read or written.
    pub async fn download(&self, remote_path: &str) -> Result<PathBuf> {
        let local_path = self.local_path_for(remote_path)?;

        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|e| BridgeError::FileTransfer {
                reason: format!(
                    "Cannot create download directory {}: {e}",
                    self.download_dir.display()
                ),
            })?;

        let channel = self.session.open_file_channel().await?;
        let result = channel.sftp().download(remote_path, &local_path).await;
        let bytes = channel.finish(result).await?;

        info!(
            host = %self.session.host(),
            remote = %remote_path,
            local = %local_path.display(),
            bytes,
            "File downloaded"
        );
        Ok(local_path)
    }

    /// Create or overwrite `remote_path` with the content of `local_path`
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails or if either side cannot
    /// be read or written.
    pub async fn upload(&self, local_path: &Path, remote_path: &str, mode: u32) -> Result<u64> {
        let channel = self.session.open_file_channel().await?;
        let result = channel.sftp().upload(local_path, remote_path, mode).await;
        let bytes = channel.finish(result).await?;

        info!(
            host = %self.session.host(),
            local = %local_path.display(),
            remote = %remote_path,
            bytes,
            mode = format!("{mode:o}"),
            "File uploaded"
        );
        Ok(bytes)
    }
}
