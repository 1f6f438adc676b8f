//! Domain module - Core business logic
//!
//! Command parsing, the allow-list, and the connection-per-operation
//! transport, transfer and script pipeline built on the ports.

pub mod allowlist;
pub mod command;
pub mod dispatcher;
pub mod replies;
pub mod stager;
pub mod transfer;
pub mod transport;

pub use allowlist::{AllowList, GETLOG_KEYWORD, RUNSCRIPT_KEYWORD};
pub use command::{Command, CommandRequest, Greeting, ParsedCommand, SourceRole};
pub use dispatcher::CommandDispatcher;
pub use stager::{ScriptStager, StagedScript, interpreter_command, validate_script_name};
pub use transfer::FileTransfer;
pub use transport::{ExecutionResult, FileChannel, TransportSession};
