//! SFTP client for streaming single-file transfers
//!
//! Files are copied chunk by chunk so neither side is held in memory.

use std::path::Path;

use russh_sftp::client::SftpSession;
use russh_sftp::protocol::{FileAttributes, OpenFlags};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

use crate::error::{BridgeError, Result};

/// Validate that a path doesn't contain path traversal components.
pub(crate) fn validate_remote_path(path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(BridgeError::FileTransfer {
            reason: "Remote path cannot be empty".to_string(),
        });
    }
    if path.split('/').any(|component| component == "..") {
        return Err(BridgeError::FileTransfer {
            reason: "Path traversal ('..') is not allowed in remote paths".to_string(),
        });
    }
    Ok(())
}

/// Close a remote handle whose bytes are already on disk
///
/// A failed close does not fail the download; it is only logged.
async fn close_after_download<F: AsyncWrite + Unpin>(remote_file: &mut F, remote_path: &str) {
    if let Err(e) = remote_file.shutdown().await {
        tracing::debug!(remote = %remote_path, error = %e, "Close after download");
    }
}

/// Chunk size for streaming transfers (64 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

pub struct SftpClient {
    session: SftpSession,
}

impl SftpClient {
    /// Create a new SFTP client from a session
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // SftpSession is not const-compatible
    pub fn new(session: SftpSession) -> Self {
        Self { session }
    }

    /// Create or overwrite `remote_path` with the bytes of `local_path`
    ///
    /// The permission bits are applied when the file is created and again
    /// once the write completes, so an existing file also ends up with `mode`.
    ///
    /// # Errors
    /// Returns an error if either side cannot be opened, read or written.
    pub async fn upload_file(&self, local_path: &Path, remote_path: &str, mode: u32) -> Result<u64> {
        validate_remote_path(remote_path)?;

        let local_file = File::open(local_path)
            .await
            .map_err(|e| BridgeError::FileTransfer {
                reason: format!("Cannot open local file: {e}"),
            })?;

        let mut attrs = FileAttributes::empty();
        attrs.permissions = Some(mode);

        let mut remote_file = self
            .session
            .open_with_flags_and_attributes(
                remote_path,
                OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE,
                attrs.clone(),
            )
            .await
            .map_err(sftp_error)?;

        let mut reader = BufReader::with_capacity(DEFAULT_CHUNK_SIZE, local_file);
        let mut buffer = vec![0u8; DEFAULT_CHUNK_SIZE];
        let mut total_written = 0u64;

        loop {
            let n = reader
                .read(&mut buffer)
                .await
                .map_err(|e| BridgeError::FileTransfer {
                    reason: format!("Read error: {e}"),
                })?;

            if n == 0 {
                break;
            }

            remote_file
                .write_all(&buffer[..n])
                .await
                .map_err(|e| BridgeError::FileTransfer {
                    reason: format!("Write error: {e}"),
                })?;

            total_written += n as u64;
        }

        remote_file
            .flush()
            .await
            .map_err(|e| BridgeError::FileTransfer {
                reason: format!("Flush error: {e}"),
            })?;

        // The transfer is complete once the remote handle is closed
        remote_file
            .shutdown()
            .await
            .map_err(|e| BridgeError::FileTransfer {
                reason: format!("Close error: {e}"),
            })?;

        self.session
            .set_metadata(remote_path, attrs)
            .await
            .map_err(sftp_error)?;

        tracing::debug!(remote = %remote_path, bytes = total_written, mode = format!("{mode:o}"), "Upload complete");
        Ok(total_written)
    }

    /// Stream `remote_path` into `local_path`, creating or truncating it
    ///
    /// # Errors
    /// Returns an error if either side cannot be opened, read or written.
    pub async fn download_file(&self, remote_path: &str, local_path: &Path) -> Result<u64> {
        validate_remote_path(remote_path)?;

        let mut remote_file = self.session.open(remote_path).await.map_err(sftp_error)?;

        let local_file = File::create(local_path)
            .await
            .map_err(|e| BridgeError::FileTransfer {
                reason: format!("Cannot create local file: {e}"),
            })?;

        let mut writer = BufWriter::with_capacity(DEFAULT_CHUNK_SIZE, local_file);
        let mut buffer = vec![0u8; DEFAULT_CHUNK_SIZE];
        let mut total_read = 0u64;

        loop {
            let n = remote_file
                .read(&mut buffer)
                .await
                .map_err(|e| BridgeError::FileTransfer {
                    reason: format!("Read error: {e}"),
                })?;

            if n == 0 {
                break;
            }

            writer
                .write_all(&buffer[..n])
                .await
                .map_err(|e| BridgeError::FileTransfer {
                    reason: format!("Write error: {e}"),
                })?;

            total_read += n as u64;
        }

        writer
            .flush()
            .await
            .map_err(|e| BridgeError::FileTransfer {
                reason: format!("Flush error: {e}"),
            })?;

        close_after_download(&mut remote_file, remote_path).await;

        tracing::debug!(remote = %remote_path, local = %local_path.display(), bytes = total_read, "Download complete");
        Ok(total_read)
    }

    /// Close the SFTP session
    ///
    /// # Errors
    ///
    /// Returns an error if the SFTP session cannot be closed cleanly.
    pub async fn close(self) -> Result<()> {
        self.session.close().await.map_err(sftp_error)
    }
}

/// Convert an SFTP error to a `BridgeError`
#[expect(clippy::needless_pass_by_value)]
fn sftp_error(e: russh_sftp::client::error::Error) -> BridgeError {
    BridgeError::Sftp {
        reason: e.to_string(),
    }
}
