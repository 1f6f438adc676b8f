//! Snapshot tests for chat replies and the status page.
//!
//! Users and scripts match on these texts, so any wording change shows up
//! as a snapshot diff.

use std::path::Path;
use std::time::Duration;

use insta::assert_snapshot;
use zeroize::Zeroizing;

use chatops_ssh_bridge::cli::status_report;
use chatops_ssh_bridge::config::{Config, ConnectionConfig, HostKeyVerification};
use chatops_ssh_bridge::domain::{AllowList, replies};
use chatops_ssh_bridge::error::{BridgeError, ScriptPhase};

fn allow_list() -> AllowList {
    [("uptime", "uptime"), ("df", "df -h")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// ===== Conversation =====

#[test]
fn snapshot_help() {
    assert_snapshot!(replies::help(&allow_list()), @r"
📋 Available commands:
- `/df`
- `/uptime`
- `/getlog <path>`
- `/runscript <name>`
");
}

#[test]
fn snapshot_help_empty_allow_list() {
    assert_snapshot!(replies::help(&AllowList::default()), @r"
📋 Available commands:
- `/getlog <path>`
- `/runscript <name>`
");
}

#[test]
fn snapshot_intro() {
    assert_snapshot!(replies::INTRO, @r"
👋 Bonjour ! Je suis votre bot DevOps.
Je peux exécuter des commandes à distance sur votre VM.
🚀 Tapez une commande commençant par `/`, par exemple :
   • `/df` pour voir l’espace disque
   • `/uptime` pour voir la charge système
   • `/getlog /chemin/fichier.log` pour récupérer un fichier log
   • `/runscript install-example.sh` pour exécuter un script Nexus
");
}

// ===== Command Replies =====

#[test]
fn snapshot_command_result() {
    assert_snapshot!(replies::command_result(" 10:42:01 up 3 days,  load average: 0.00"), @r"
✅ Résultat:
 10:42:01 up 3 days,  load average: 0.00
");
}

#[test]
fn snapshot_command_failed() {
    let err = BridgeError::SshConnection {
        host: "vm1.internal".to_string(),
        reason: "Connection refused".to_string(),
    };
    assert_snapshot!(replies::command_failed(&err), @"❌ Erreur SSH : SSH connection failed to vm1.internal: Connection refused");
}

#[test]
fn snapshot_not_allowed() {
    assert_snapshot!(replies::not_allowed("reboot"), @r#"❌ Commande "/reboot" non autorisée."#);
}

#[test]
fn snapshot_log_saved() {
    assert_snapshot!(
        replies::log_saved("/var/log/syslog", Path::new("downloads/syslog")),
        @r"
✅ Fichier `/var/log/syslog` sauvegardé localement ici :

📁 downloads/syslog
"
    );
}

#[test]
fn snapshot_log_failed() {
    let err = BridgeError::Sftp {
        reason: "No such file".to_string(),
    };
    assert_snapshot!(replies::log_failed(&err), @"❌ Impossible de récupérer le fichier : SFTP error: No such file");
}

#[test]
fn snapshot_script_finished() {
    assert_snapshot!(
        replies::script_finished(
            "install-docker.sh",
            "http://192.168.1.6:8081/repository/install-scripts/install-docker.sh",
            "Docker installed"
        ),
        @r"
✅ Script [install-docker.sh](http://192.168.1.6:8081/repository/install-scripts/install-docker.sh) terminé.

Sortie :
Docker installed
"
    );
}

#[test]
fn snapshot_script_not_found() {
    let err = BridgeError::ScriptNotFound {
        url: "http://192.168.1.6:8081/repository/install-scripts/missing.sh".to_string(),
    }
    .in_phase(ScriptPhase::Fetch);
    assert_snapshot!(replies::script_failed(&err), @"❌ Échec lors de l'exécution du script : fetch failed: Fichier non trouvé : http://192.168.1.6:8081/repository/install-scripts/missing.sh");
}

#[test]
fn snapshot_script_execute_timeout() {
    let err = BridgeError::SshTimeout { seconds: 300 }.in_phase(ScriptPhase::Execute);
    assert_snapshot!(replies::script_failed(&err), @"❌ Échec lors de l'exécution du script : execute failed: SSH command timeout after 300s");
}

// ===== Status Page =====

#[test]
fn snapshot_status_report() {
    let mut config = Config::default();
    config.commands.insert("df".to_string(), "df -h".to_string());
    config
        .commands
        .insert("uptime".to_string(), "uptime".to_string());
    let connection = ConnectionConfig {
        host: "vm1.internal".to_string(),
        port: 22,
        username: "deploy".to_string(),
        secret: Zeroizing::new("hunter2".to_string()),
        connect_timeout: Duration::from_millis(20_000),
        accepted_host_key_algorithms: vec!["ssh-ed25519".to_string(), "ssh-rsa".to_string()],
        host_key_verification: HostKeyVerification::Off,
    };

    assert_snapshot!(status_report(&config, &connection), @r"
ChatOps SSH Bridge Status
=========================

Remote Host:
  Address: vm1.internal:22
  User: deploy
  Connect timeout: 20000ms
  Host key algorithms: ssh-ed25519, ssh-rsa
  Host key verification: Off

Allow-listed Commands (2):
------------------------------------------------------------
  /df           df -h
  /uptime       uptime

Artifacts:
  Script URL: http://192.168.1.6:8081/repository/install-scripts/<name>
  Remote staging dir: /tmp

Downloads:
  Directory: downloads

Limits:
  Command timeout: 300s
  Max output: 1048576 bytes

Server:
  Bind: 0.0.0.0:3978
  Slack token: not set
");
}
