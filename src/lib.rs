#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod ports;
pub mod ssh;

pub use config::{Config, ConnectionConfig};
pub use domain::{Command, CommandDispatcher, CommandRequest, SourceRole};
pub use error::{BridgeError, ErrorKind, Result};
pub use ports::{ChatHandler, ScriptSource, SftpChannel, SshClientTrait, SshConnector};
