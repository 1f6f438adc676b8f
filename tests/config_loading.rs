//! Configuration loading tests
//!
//! Exercises the YAML config file, the separate allow-list file, the
//! environment overrides and the remote host variables.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::NamedTempFile;

use chatops_ssh_bridge::config::{
    Config, ConnectionConfig, HostKeyVerification, apply_env_overrides, load_allowlist_file,
    load_config, resolve_config,
};
use chatops_ssh_bridge::error::{BridgeError, ErrorKind};

fn yaml_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |name| map.get(name).cloned()
}

// ===== Config File =====

#[test]
fn test_full_config_file() {
    let file = yaml_file(
        r#"
commands:
  df: "df -h"
  uptime: "uptime"
  services: "systemctl list-units --type=service --state=running"
artifacts:
  base_url: "http://nexus.internal:8081"
  repository_path: "repository/scripts"
  remote_staging_dir: "/opt/staging"
  timeout_seconds: 30
downloads:
  dir: "/var/lib/chatops/logs"
limits:
  command_timeout_seconds: 120
  max_output_bytes: 65536
server:
  bind: "127.0.0.1:9000"
"#,
    );

    let config = load_config(file.path()).unwrap();

    assert_eq!(config.commands.len(), 3);
    assert_eq!(config.commands["df"], "df -h");
    assert_eq!(
        config.artifacts.script_url("install.sh"),
        "http://nexus.internal:8081/repository/scripts/install.sh"
    );
    assert_eq!(config.artifacts.remote_staging_dir, "/opt/staging");
    assert_eq!(config.artifacts.timeout_seconds, 30);
    assert_eq!(config.downloads.dir, PathBuf::from("/var/lib/chatops/logs"));
    assert_eq!(config.limits.command_timeout_seconds, 120);
    assert_eq!(config.limits.max_output_bytes, 65536);
    assert_eq!(config.server.bind, "127.0.0.1:9000");
    assert!(config.slack.bot_token.is_none());
}

#[test]
fn test_minimal_config_uses_defaults() {
    let file = yaml_file("commands:\n  df: \"df -h\"\n");

    let config = load_config(file.path()).unwrap();

    assert_eq!(config.artifacts.remote_staging_dir, "/tmp");
    assert_eq!(config.downloads.dir, PathBuf::from("downloads"));
    assert_eq!(config.limits.command_timeout_seconds, 300);
    assert_eq!(config.server.bind, "0.0.0.0:3978");
    assert_eq!(config.slack.api_url, "https://slack.com/api");
}

#[test]
fn test_missing_config_file() {
    let err = load_config(&PathBuf::from("/nonexistent/chatops.yaml")).unwrap_err();
    assert!(matches!(err, BridgeError::ConfigNotFound { .. }));
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn test_invalid_yaml() {
    let file = yaml_file("commands: [df, uptime\n");
    let err = load_config(file.path()).unwrap_err();
    assert!(matches!(err, BridgeError::Yaml(_)), "{err:?}");
}

#[test]
fn test_reserved_keyword_rejected() {
    for keyword in ["getlog", "runscript"] {
        let file = yaml_file(&format!("commands:\n  {keyword}: \"cat /etc/passwd\"\n"));
        let err = load_config(file.path()).unwrap_err();
        match err {
            BridgeError::ConfigInvalid { field, .. } => {
                assert_eq!(field, format!("commands.{keyword}"));
            }
            other => panic!("expected ConfigInvalid, got {other:?}"),
        }
    }
}

#[test]
fn test_malformed_keywords_rejected() {
    for entry in ["\"/df\": \"df -h\"", "\"disk usage\": \"df -h\"", "df: \"  \""] {
        let file = yaml_file(&format!("commands:\n  {entry}\n"));
        let err = load_config(file.path()).unwrap_err();
        assert!(
            matches!(err, BridgeError::ConfigInvalid { .. }),
            "{entry}: {err:?}"
        );
    }
}

#[test]
fn test_relative_staging_dir_rejected() {
    let file = yaml_file("artifacts:\n  remote_staging_dir: \"tmp\"\n");
    let err = load_config(file.path()).unwrap_err();
    assert!(matches!(err, BridgeError::ConfigInvalid { field, .. } if field == "artifacts.remote_staging_dir"));
}

// ===== Allow-list File =====

#[test]
fn test_allowlist_file_overrides_config_entries() {
    let config_file = yaml_file("commands:\n  df: \"df\"\n  uptime: \"uptime\"\n");
    let commands_file = yaml_file("df: \"df -h\"\nmem: \"free -m\"\n");

    let config = resolve_config(Some(config_file.path()), Some(commands_file.path())).unwrap();

    assert_eq!(config.commands["df"], "df -h");
    assert_eq!(config.commands["uptime"], "uptime");
    assert_eq!(config.commands["mem"], "free -m");
}

#[test]
fn test_allowlist_file_accepts_json() {
    let file = yaml_file(r#"{"df": "df -h", "uptime": "uptime"}"#);
    let commands = load_allowlist_file(file.path()).unwrap();
    assert_eq!(commands.len(), 2);
    assert_eq!(commands["uptime"], "uptime");
}

#[test]
fn test_allowlist_file_must_be_flat() {
    let file = yaml_file("df:\n  command: \"df -h\"\n");
    assert!(load_allowlist_file(file.path()).is_err());
}

#[test]
fn test_reserved_keyword_in_allowlist_file_rejected() {
    let config_file = yaml_file("commands: {}\n");
    let commands_file = yaml_file("getlog: \"cat /etc/shadow\"\n");
    let err = resolve_config(Some(config_file.path()), Some(commands_file.path())).unwrap_err();
    assert!(matches!(err, BridgeError::ConfigInvalid { .. }));
}

// ===== Environment Overrides =====

#[test]
fn test_env_overrides() {
    let mut config = Config::default();
    apply_env_overrides(
        &mut config,
        vars(&[
            ("NEXUS_HOST", "http://10.0.0.9:8081"),
            ("SLACK_BOT_TOKEN", "xoxb-123"),
            ("PORT", "8080"),
            ("DOWNLOAD_DIR", "/srv/logs"),
        ]),
    );

    assert_eq!(config.artifacts.base_url, "http://10.0.0.9:8081");
    assert_eq!(
        config.slack.bot_token.as_ref().map(|t| t.as_str()),
        Some("xoxb-123")
    );
    assert_eq!(config.server.bind, "0.0.0.0:8080");
    assert_eq!(config.downloads.dir, PathBuf::from("/srv/logs"));
}

#[test]
fn test_env_invalid_port_is_ignored() {
    let mut config = Config::default();
    apply_env_overrides(&mut config, vars(&[("PORT", "http")]));
    assert_eq!(config.server.bind, "0.0.0.0:3978");
}

#[test]
fn test_env_empty_values_are_ignored() {
    let mut config = Config::default();
    let before = config.artifacts.base_url.clone();
    apply_env_overrides(&mut config, vars(&[("NEXUS_HOST", "  "), ("SLACK_BOT_TOKEN", "")]));
    assert_eq!(config.artifacts.base_url, before);
    assert!(config.slack.bot_token.is_none());
}

// ===== Remote Host Variables =====

#[test]
fn test_connection_from_variables() {
    let connection = ConnectionConfig::from_lookup(vars(&[
        ("SSH_HOST", "vm1.internal"),
        ("SSH_PORT", "22"),
        ("SSH_USER", "deploy"),
        ("SSH_PASS", "p@ss word"),
        ("SSH_READY_TIMEOUT_MS", "5000"),
        ("SSH_HOST_KEY_ALGORITHMS", "ssh-ed25519, rsa-sha2-256"),
        ("SSH_HOST_KEY_VERIFICATION", "accept-new"),
    ]))
    .unwrap();

    assert_eq!(connection.target(), "vm1.internal:22");
    assert_eq!(connection.secret.as_str(), "p@ss word");
    assert_eq!(connection.connect_timeout, Duration::from_millis(5000));
    assert_eq!(
        connection.accepted_host_key_algorithms,
        vec!["ssh-ed25519", "rsa-sha2-256"]
    );
    assert_eq!(connection.host_key_verification, HostKeyVerification::AcceptNew);
}

#[test]
fn test_connection_debug_hides_secret() {
    let connection = ConnectionConfig::from_lookup(vars(&[
        ("SSH_HOST", "vm1"),
        ("SSH_PORT", "22"),
        ("SSH_USER", "deploy"),
        ("SSH_PASS", "hunter2"),
    ]))
    .unwrap();
    let debug = format!("{connection:?}");
    assert!(!debug.contains("hunter2"));
    assert!(debug.contains("***"));
}

#[test]
fn test_connection_missing_password_is_fatal() {
    let err = ConnectionConfig::from_lookup(vars(&[
        ("SSH_HOST", "vm1"),
        ("SSH_PORT", "22"),
        ("SSH_USER", "deploy"),
    ]))
    .unwrap_err();
    assert!(matches!(err, BridgeError::MissingEnv { ref name } if name == "SSH_PASS"));
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn test_connection_bad_port() {
    let err = ConnectionConfig::from_lookup(vars(&[
        ("SSH_HOST", "vm1"),
        ("SSH_PORT", "70000"),
        ("SSH_USER", "deploy"),
        ("SSH_PASS", "x"),
    ]))
    .unwrap_err();
    assert!(matches!(err, BridgeError::ConfigInvalid { .. }));
}
