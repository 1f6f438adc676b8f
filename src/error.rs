use std::fmt;

use thiserror::Error;

/// Phase of the fetch → stage → execute script pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptPhase {
    Fetch,
    Stage,
    Execute,
}

impl fmt::Display for ScriptPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fetch => "fetch",
            Self::Stage => "stage",
            Self::Execute => "execute",
        })
    }
}

/// Coarse classification used for operator diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connect,
    Exec,
    Transfer,
    ScriptNotFound,
    CommandNotAllowed,
    MalformedRequest,
    Config,
    Internal,
}

#[derive(Error, Debug)]
pub enum BridgeError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Invalid configuration: {field} - {reason}")]
    ConfigInvalid { field: String, reason: String },

    #[error("Missing required environment variable: {name}")]
    MissingEnv { name: String },

    // SSH errors
    #[error("SSH connection failed to {host}: {reason}")]
    SshConnection { host: String, reason: String },

    #[error("SSH host key mismatch for {host}: expected {expected}, got {actual}")]
    SshHostKeyMismatch {
        host: String,
        expected: String,
        actual: String,
    },

    #[error("SSH host key unknown for {host} (fingerprint: {fingerprint})")]
    SshHostKeyUnknown { host: String, fingerprint: String },

    #[error("SSH authentication failed for {user}@{host}")]
    SshAuth { user: String, host: String },

    #[error("SSH command execution failed: {reason}")]
    SshExec { reason: String },

    #[error("SSH command timeout after {seconds}s")]
    SshTimeout { seconds: u64 },

    #[error("SSH output too large (limit: {limit_bytes} bytes)")]
    SshOutputTooLarge { limit_bytes: usize },

    // File transfer errors
    #[error("File transfer error: {reason}")]
    FileTransfer { reason: String },

    #[error("SFTP error: {reason}")]
    Sftp { reason: String },

    // Script pipeline errors
    #[error("Fichier non trouvé : {url}")]
    ScriptNotFound { url: String },

    #[error("{phase} failed: {source}")]
    ScriptStage {
        phase: ScriptPhase,
        #[source]
        source: Box<BridgeError>,
    },

    #[error("HTTP request failed: {reason}")]
    Http { reason: String },

    // Dispatch errors
    #[error("Command \"/{keyword}\" is not allowed")]
    CommandNotAllowed { keyword: String },

    #[error("Malformed /{keyword} request: {reason}")]
    MalformedRequest { keyword: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // YAML errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl BridgeError {
    /// Wrap this error with the script pipeline phase it happened in.
    #[must_use]
    pub fn in_phase(self, phase: ScriptPhase) -> Self {
        Self::ScriptStage {
            phase,
            source: Box::new(self),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_)
            | Self::ConfigNotFound { .. }
            | Self::ConfigInvalid { .. }
            | Self::MissingEnv { .. }
            | Self::Yaml(_) => ErrorKind::Config,
            Self::SshConnection { .. }
            | Self::SshHostKeyMismatch { .. }
            | Self::SshHostKeyUnknown { .. }
            | Self::SshAuth { .. } => ErrorKind::Connect,
            Self::SshExec { .. } | Self::SshTimeout { .. } | Self::SshOutputTooLarge { .. } => {
                ErrorKind::Exec
            }
            Self::FileTransfer { .. } | Self::Sftp { .. } | Self::Io(_) => ErrorKind::Transfer,
            Self::ScriptNotFound { .. } => ErrorKind::ScriptNotFound,
            Self::ScriptStage { source, .. } => source.kind(),
            Self::CommandNotAllowed { .. } => ErrorKind::CommandNotAllowed,
            Self::MalformedRequest { .. } => ErrorKind::MalformedRequest,
            Self::Http { .. } | Self::Json(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
