use super::types::Config;
use crate::domain::allowlist::{GETLOG_KEYWORD, RUNSCRIPT_KEYWORD};
use crate::error::{BridgeError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

pub const ENV_NEXUS_HOST: &str = "NEXUS_HOST";
pub const ENV_SLACK_BOT_TOKEN: &str = "SLACK_BOT_TOKEN";
pub const ENV_PORT: &str = "PORT";
pub const ENV_DOWNLOAD_DIR: &str = "DOWNLOAD_DIR";
pub const ENV_API_TOKEN: &str = "API_TOKEN";

/// Load configuration from a YAML file
///
/// # Errors
///
/// Returns an error if:
/// - The configuration file does not exist
/// - The file cannot be read
/// - The YAML content is invalid or cannot be parsed
/// - The configuration fails validation (e.g., an allow-list keyword shadows a built-in)
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Err(BridgeError::ConfigNotFound {
            path: path.display().to_string(),
        });
    }

    // Warn if config file has overly permissive permissions (may contain a bot token)
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        if let Ok(metadata) = std::fs::metadata(path) {
            let mode = metadata.mode() & 0o777;
            if mode & 0o037 != 0 {
                warn!(
                    config_path = %path.display(),
                    permissions = format!("{mode:04o}"),
                    "Config file may contain secrets and has permissive permissions. \
                     Consider: chmod 640 {}",
                    path.display()
                );
            }
        }
    }

    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_yaml::from_str(&content)?;

    validate_config(&config)?;

    Ok(config)
}

/// Resolve the effective configuration at startup.
///
/// An explicit `path` must exist. Without one, the default path is used when
/// present and built-in defaults otherwise. `commands_path` points at a
/// separate allow-list file whose entries override those of the config file.
/// Environment overrides are applied last.
///
/// # Errors
///
/// Returns an error if a file cannot be read or parsed, or if the merged
/// configuration fails validation.
pub fn resolve_config(path: Option<&Path>, commands_path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(p) => load_config(p)?,
        None => {
            let default_path = default_config_path();
            if default_path.exists() {
                load_config(&default_path)?
            } else {
                debug!(path = %default_path.display(), "No config file, using defaults");
                Config::default()
            }
        }
    };

    if let Some(commands_path) = commands_path {
        let commands = load_allowlist_file(commands_path)?;
        info!(
            path = %commands_path.display(),
            count = commands.len(),
            "Loaded allow-list file"
        );
        config.commands.extend(commands);
    }

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    validate_config(&config)?;

    if config.commands.is_empty() {
        warn!("Allow-list is empty: only /getlog and /runscript will be accepted");
    }

    Ok(config)
}

/// Load a keyword -> command mapping from a YAML (or JSON) file
///
/// # Errors
///
/// Returns an error if the file does not exist or is not a flat string map.
pub fn load_allowlist_file(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Err(BridgeError::ConfigNotFound {
            path: path.display().to_string(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    let commands: HashMap<String, String> = serde_yaml::from_str(&content)?;
    Ok(commands)
}

/// Apply the environment variable overrides understood by the gateway.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(base_url) = non_empty(ENV_NEXUS_HOST) {
        config.artifacts.base_url = base_url.trim().to_string();
    }
    if let Some(token) = non_empty(ENV_SLACK_BOT_TOKEN) {
        config.slack.bot_token = Some(Zeroizing::new(token.trim().to_string()));
    }
    if let Some(port) = non_empty(ENV_PORT) {
        match port.trim().parse::<u16>() {
            Ok(port) => {
                let host = config
                    .server
                    .bind
                    .rsplit_once(':')
                    .map_or("0.0.0.0", |(host, _)| host)
                    .to_string();
                config.server.bind = format!("{host}:{port}");
            }
            Err(e) => warn!(value = %port, error = %e, "Ignoring invalid PORT"),
        }
    }
    if let Some(dir) = non_empty(ENV_DOWNLOAD_DIR) {
        config.downloads.dir = PathBuf::from(dir.trim());
    }
    if let Some(token) = non_empty(ENV_API_TOKEN) {
        config.server.api_token = Some(Zeroizing::new(token.trim().to_string()));
    }
}

/// Validate the configuration
fn validate_config(config: &Config) -> Result<()> {
    for (keyword, command) in &config.commands {
        if keyword.is_empty() || keyword.chars().any(char::is_whitespace) {
            return Err(BridgeError::ConfigInvalid {
                field: format!("commands.{keyword}"),
                reason: "Keyword must be a single non-empty token".to_string(),
            });
        }
        if keyword.starts_with('/') {
            return Err(BridgeError::ConfigInvalid {
                field: format!("commands.{keyword}"),
                reason: "Keyword must be given without the leading '/'".to_string(),
            });
        }
        if keyword == GETLOG_KEYWORD || keyword == RUNSCRIPT_KEYWORD {
            return Err(BridgeError::ConfigInvalid {
                field: format!("commands.{keyword}"),
                reason: "Keyword is reserved for a built-in command".to_string(),
            });
        }
        if command.trim().is_empty() {
            return Err(BridgeError::ConfigInvalid {
                field: format!("commands.{keyword}"),
                reason: "Command cannot be empty".to_string(),
            });
        }
    }

    if config.artifacts.base_url.trim().is_empty() {
        return Err(BridgeError::ConfigInvalid {
            field: "artifacts.base_url".to_string(),
            reason: "Base URL cannot be empty".to_string(),
        });
    }

    if !config.artifacts.remote_staging_dir.starts_with('/') {
        return Err(BridgeError::ConfigInvalid {
            field: "artifacts.remote_staging_dir".to_string(),
            reason: "Staging directory must be an absolute remote path".to_string(),
        });
    }

    if config
        .server
        .api_token
        .as_ref()
        .is_some_and(|t| t.trim().is_empty())
    {
        return Err(BridgeError::ConfigInvalid {
            field: "server.api_token".to_string(),
            reason: "Token cannot be empty; remove it to disable authentication".to_string(),
        });
    }

    if config.artifacts.max_bytes == 0 {
        return Err(BridgeError::ConfigInvalid {
            field: "artifacts.max_bytes".to_string(),
            reason: "Limit must be greater than zero".to_string(),
        });
    }

    if config.limits.command_timeout_seconds == 0 {
        return Err(BridgeError::ConfigInvalid {
            field: "limits.command_timeout_seconds".to_string(),
            reason: "Timeout must be greater than zero".to_string(),
        });
    }

    Ok(())
}

/// Get the default config path
#[must_use]
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chatops-ssh-bridge")
        .join("config.yaml")
}

#[cfg(test)]
#[allow(clippy::needless_raw_string_hashes)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_yaml(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_config_not_found() {
        let result = load_config(Path::new("/nonexistent/config.yaml"));
        assert!(matches!(result, Err(BridgeError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("chatops-ssh-bridge/config.yaml"));
    }

    #[test]
    fn test_load_full_config() {
        let file = write_yaml(
            r#"
commands:
  df: "df -h"
  uptime: uptime
artifacts:
  base_url: "http://nexus.internal:8081"
downloads:
  dir: /var/lib/chatops/downloads
limits:
  command_timeout_seconds: 60
server:
  bind: "127.0.0.1:8080"
"#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.commands.get("df").map(String::as_str), Some("df -h"));
        assert_eq!(config.commands.len(), 2);
        assert_eq!(config.artifacts.base_url, "http://nexus.internal:8081");
        assert_eq!(config.artifacts.repository_path, "repository/install-scripts");
        assert_eq!(
            config.downloads.dir,
            PathBuf::from("/var/lib/chatops/downloads")
        );
        assert_eq!(config.limits.command_timeout_seconds, 60);
        assert_eq!(config.server.bind, "127.0.0.1:8080");
    }

    #[test]
    fn test_reserved_keyword_rejected() {
        let file = write_yaml(
            r#"
commands:
  getlog: "cat /etc/passwd"
"#,
        );
        let result = load_config(file.path());
        assert!(matches!(result, Err(BridgeError::ConfigInvalid { .. })));
    }

    #[test]
    fn test_multi_token_keyword_rejected() {
        let file = write_yaml(
            r#"
commands:
  "disk usage": "df -h"
"#,
        );
        let result = load_config(file.path());
        assert!(matches!(result, Err(BridgeError::ConfigInvalid { .. })));
    }

    #[test]
    fn test_empty_command_rejected() {
        let file = write_yaml(
            r#"
commands:
  df: "  "
"#,
        );
        let result = load_config(file.path());
        assert!(matches!(result, Err(BridgeError::ConfigInvalid { .. })));
    }

    #[test]
    fn test_invalid_yaml() {
        let file = write_yaml("commands: [df, uptime");
        let result = load_config(file.path());
        assert!(matches!(result, Err(BridgeError::Yaml(_))));
    }

    #[test]
    fn test_load_allowlist_json_file() {
        let file = write_yaml(r#"{"df": "df -h", "status": "systemctl status nginx"}"#);
        let commands = load_allowlist_file(file.path()).unwrap();
        assert_eq!(commands.len(), 2);
        assert_eq!(
            commands.get("status").map(String::as_str),
            Some("systemctl status nginx")
        );
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |name| match name {
            ENV_NEXUS_HOST => Some("http://10.1.1.1:8081".to_string()),
            ENV_SLACK_BOT_TOKEN => Some("xoxb-test".to_string()),
            ENV_PORT => Some("4000".to_string()),
            ENV_DOWNLOAD_DIR => Some("/srv/logs".to_string()),
            ENV_API_TOKEN => Some(" s3cr3t-hook ".to_string()),
            _ => None,
        });

        assert_eq!(config.artifacts.base_url, "http://10.1.1.1:8081");
        assert_eq!(
            config.slack.bot_token.as_ref().map(|t| t.as_str()),
            Some("xoxb-test")
        );
        assert_eq!(config.server.bind, "0.0.0.0:4000");
        assert_eq!(config.downloads.dir, PathBuf::from("/srv/logs"));
        assert_eq!(
            config.server.api_token.as_ref().map(|t| t.as_str()),
            Some("s3cr3t-hook")
        );
    }

    #[test]
    fn test_empty_api_token_rejected() {
        let file = write_yaml(
            r#"
server:
  api_token: "  "
"#,
        );
        let result = load_config(file.path());
        assert!(matches!(
            result,
            Err(BridgeError::ConfigInvalid { ref field, .. }) if field == "server.api_token"
        ));
    }

    #[test]
    fn test_env_invalid_port_ignored() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |name| {
            (name == ENV_PORT).then(|| "not-a-port".to_string())
        });
        assert_eq!(config.server.bind, "0.0.0.0:3978");
    }

    #[test]
    fn test_resolve_config_merges_commands_file() {
        let config_file = write_yaml(
            r#"
commands:
  df: "df -h"
"#,
        );
        let commands_file = write_yaml(
            r#"
df: "df -hT"
uptime: uptime
"#,
        );

        let config = resolve_config(Some(config_file.path()), Some(commands_file.path())).unwrap();
        assert_eq!(config.commands.get("df").map(String::as_str), Some("df -hT"));
        assert_eq!(config.commands.get("uptime").map(String::as_str), Some("uptime"));
    }
}
