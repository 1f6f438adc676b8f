use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use zeroize::Zeroizing;

use crate::error::{BridgeError, Result};

/// Process-wide settings loaded from the YAML config file and the environment.
///
/// The remote host credentials are not part of this struct; they live in
/// [`ConnectionConfig`], which is built separately and must be complete
/// before the process starts serving.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Allow-list: chat keyword -> literal shell command
    #[serde(default)]
    pub commands: HashMap<String, String>,

    #[serde(default)]
    pub artifacts: ArtifactsConfig,

    #[serde(default)]
    pub downloads: DownloadsConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub slack: SlackConfig,
}

/// Artifact repository holding installable scripts
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArtifactsConfig {
    #[serde(default = "default_artifacts_base_url")]
    pub base_url: String,

    #[serde(default = "default_repository_path")]
    pub repository_path: String,

    /// Remote directory scripts are staged into before running
    #[serde(default = "default_remote_staging_dir")]
    pub remote_staging_dir: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u64,

    /// Largest script body accepted from the repository
    #[serde(default = "default_artifact_max_bytes")]
    pub max_bytes: usize,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            base_url: default_artifacts_base_url(),
            repository_path: default_repository_path(),
            remote_staging_dir: default_remote_staging_dir(),
            timeout_seconds: default_http_timeout(),
            max_bytes: default_artifact_max_bytes(),
        }
    }
}

impl ArtifactsConfig {
    /// Build the download URL of a script in the repository.
    #[must_use]
    pub fn script_url(&self, script_name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.repository_path.trim_matches('/'),
            script_name
        )
    }
}

fn default_artifacts_base_url() -> String {
    "http://192.168.1.6:8081".to_string()
}

fn default_repository_path() -> String {
    "repository/install-scripts".to_string()
}

fn default_remote_staging_dir() -> String {
    "/tmp".to_string()
}

const fn default_http_timeout() -> u64 {
    60
}

const fn default_artifact_max_bytes() -> usize {
    32 * 1024 * 1024
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadsConfig {
    /// Local directory retrieved log files are written into
    #[serde(default = "default_download_dir")]
    pub dir: PathBuf,
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            dir: default_download_dir(),
        }
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    /// Upper bound for a single remote command
    #[serde(default = "default_command_timeout")]
    pub command_timeout_seconds: u64,

    #[serde(default = "default_max_output")]
    pub max_output_bytes: usize,

    #[serde(default = "default_keepalive")]
    pub keepalive_interval_seconds: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            command_timeout_seconds: default_command_timeout(),
            max_output_bytes: default_max_output(),
            keepalive_interval_seconds: default_keepalive(),
        }
    }
}

const fn default_command_timeout() -> u64 {
    300
}

const fn default_max_output() -> usize {
    1024 * 1024
}

const fn default_keepalive() -> u64 {
    30
}

#[derive(Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Bearer token required on `POST /api/messages` when set
    #[serde(default)]
    pub api_token: Option<Zeroizing<String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            api_token: None,
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind", &self.bind)
            .field("api_token", &self.api_token.as_ref().map(|_| "***"))
            .finish()
    }
}

fn default_bind() -> String {
    "0.0.0.0:3978".to_string()
}

#[derive(Clone, Deserialize, Serialize)]
pub struct SlackConfig {
    /// Bot token used for `chat.postMessage`
    #[serde(default)]
    pub bot_token: Option<Zeroizing<String>>,

    #[serde(default = "default_slack_api_url")]
    pub api_url: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_url: default_slack_api_url(),
        }
    }
}

impl fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackConfig")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "***"))
            .field("api_url", &self.api_url)
            .finish()
    }
}

fn default_slack_api_url() -> String {
    "https://slack.com/api".to_string()
}

/// Host key verification mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyVerification {
    /// Strict: reject unknown hosts, reject mismatched keys
    Strict,
    /// Accept new: add unknown hosts to `known_hosts`, reject mismatched keys
    AcceptNew,
    /// Off: accept any key offered with an accepted algorithm
    #[default]
    Off,
}

impl HostKeyVerification {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "accept-new" | "accept_new" | "acceptnew" => Some(Self::AcceptNew),
            "off" | "none" | "no" => Some(Self::Off),
            _ => None,
        }
    }
}

/// Credentials and connection parameters for the single remote host.
///
/// Built once at startup (see [`ConnectionConfig::from_env`]) and shared by
/// reference; every operation opens its own connection from it.
#[derive(Clone)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub secret: Zeroizing<String>,
    pub connect_timeout: Duration,
    pub accepted_host_key_algorithms: Vec<String>,
    pub host_key_verification: HostKeyVerification,
}

pub const ENV_SSH_HOST: &str = "SSH_HOST";
pub const ENV_SSH_PORT: &str = "SSH_PORT";
pub const ENV_SSH_USER: &str = "SSH_USER";
pub const ENV_SSH_PASS: &str = "SSH_PASS";
pub const ENV_SSH_READY_TIMEOUT_MS: &str = "SSH_READY_TIMEOUT_MS";
pub const ENV_SSH_HOST_KEY_ALGORITHMS: &str = "SSH_HOST_KEY_ALGORITHMS";
pub const ENV_SSH_HOST_KEY_VERIFICATION: &str = "SSH_HOST_KEY_VERIFICATION";

const DEFAULT_READY_TIMEOUT_MS: u64 = 20_000;
const DEFAULT_HOST_KEY_ALGORITHMS: &[&str] = &["ssh-rsa", "ssh-ed25519"];

impl ConnectionConfig {
    /// Read the connection parameters from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable (`SSH_HOST`, `SSH_PORT`,
    /// `SSH_USER`, `SSH_PASS`) is missing or empty, or if a value cannot be
    /// parsed. Callers treat this as fatal.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`ConnectionConfig::from_env`] with an explicit variable source.
    ///
    /// # Errors
    ///
    /// See [`ConnectionConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| -> Result<String> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| BridgeError::MissingEnv {
                    name: name.to_string(),
                })
        };

        let host = required(ENV_SSH_HOST)?;
        let port_raw = required(ENV_SSH_PORT)?;
        let port = port_raw
            .parse::<u16>()
            .map_err(|e| BridgeError::ConfigInvalid {
                field: ENV_SSH_PORT.to_string(),
                reason: format!("'{port_raw}' is not a valid port: {e}"),
            })?;
        let username = required(ENV_SSH_USER)?;
        // The password is taken verbatim, surrounding whitespace included.
        let secret = lookup(ENV_SSH_PASS)
            .filter(|v| !v.is_empty())
            .map(Zeroizing::new)
            .ok_or_else(|| BridgeError::MissingEnv {
                name: ENV_SSH_PASS.to_string(),
            })?;

        let connect_timeout = match lookup(ENV_SSH_READY_TIMEOUT_MS) {
            Some(raw) if !raw.trim().is_empty() => {
                let ms = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|e| BridgeError::ConfigInvalid {
                        field: ENV_SSH_READY_TIMEOUT_MS.to_string(),
                        reason: e.to_string(),
                    })?;
                Duration::from_millis(ms)
            }
            _ => Duration::from_millis(DEFAULT_READY_TIMEOUT_MS),
        };

        let accepted_host_key_algorithms = lookup(ENV_SSH_HOST_KEY_ALGORITHMS)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .filter(|algs| !algs.is_empty())
            .unwrap_or_else(|| {
                DEFAULT_HOST_KEY_ALGORITHMS
                    .iter()
                    .map(|s| (*s).to_string())
                    .collect()
            });

        let host_key_verification = match lookup(ENV_SSH_HOST_KEY_VERIFICATION) {
            Some(raw) if !raw.trim().is_empty() => HostKeyVerification::parse(&raw).ok_or_else(
                || BridgeError::ConfigInvalid {
                    field: ENV_SSH_HOST_KEY_VERIFICATION.to_string(),
                    reason: format!("unknown mode '{raw}' (expected strict, accept-new or off)"),
                },
            )?,
            _ => HostKeyVerification::default(),
        };

        Ok(Self {
            host,
            port,
            username,
            secret,
            connect_timeout,
            accepted_host_key_algorithms,
            host_key_verification,
        })
    }

    /// `host:port` label used in logs and error messages
    #[must_use]
    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("secret", &"***")
            .field("connect_timeout", &self.connect_timeout)
            .field(
                "accepted_host_key_algorithms",
                &self.accepted_host_key_algorithms,
            )
            .field("host_key_verification", &self.host_key_verification)
            .finish()
    }
}
