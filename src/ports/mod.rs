//! Ports module - Trait definitions for hexagonal architecture
//!
//! This module contains the trait definitions (ports) that define
//! the boundaries between the domain logic and external adapters.

mod chat;
mod connector;
mod script_source;

pub use chat::ChatHandler;
pub use connector::{SftpChannel, SshClientTrait, SshConnector};
pub use script_source::{HttpResponse, ScriptSource};

#[cfg(test)]
pub use chat::mock::MockChatHandler;
#[cfg(test)]
pub use connector::mock::{MockSftpChannel, MockSshClient, MockSshConnector};
#[cfg(test)]
pub use script_source::mock::MockScriptSource;
