mod client;
mod connector;
pub mod known_hosts;
mod sftp;

pub use client::{CommandOutput, SshClient};
pub use connector::RealSshConnector;
pub use known_hosts::{KnownHostStatus, verify_host_key};
pub use sftp::{DEFAULT_CHUNK_SIZE, SftpClient};
