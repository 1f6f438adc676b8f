//! Reply texts sent back to chat users

use std::fmt::Write;
use std::path::Path;

use super::allowlist::{AllowList, GETLOG_KEYWORD, RUNSCRIPT_KEYWORD};
use crate::error::BridgeError;

pub const HI: &str = "👋 Hi there! I'm your Command Bot.";
pub const HELLO: &str = "Hello! Ready to help you.";

/// Introduction sent for any plain text that is not a greeting
pub const INTRO: &str = "👋 Bonjour ! Je suis votre bot DevOps.\n\
Je peux exécuter des commandes à distance sur votre VM.\n\
🚀 Tapez une commande commençant par `/`, par exemple :\n   \
• `/df` pour voir l’espace disque\n   \
• `/uptime` pour voir la charge système\n   \
• `/getlog /chemin/fichier.log` pour récupérer un fichier log\n   \
• `/runscript install-example.sh` pour exécuter un script Nexus";

/// Command list built from the configured allow-list
#[must_use]
pub fn help(allow_list: &AllowList) -> String {
    let mut text = String::from("📋 Available commands:");
    for keyword in allow_list.keywords() {
        let _ = write!(text, "\n- `/{keyword}`");
    }
    let _ = write!(text, "\n- `/{GETLOG_KEYWORD} <path>`");
    let _ = write!(text, "\n- `/{RUNSCRIPT_KEYWORD} <name>`");
    text
}

#[must_use]
pub fn command_result(output: &str) -> String {
    format!("✅ Résultat:\n{output}")
}

#[must_use]
pub fn command_failed(error: &BridgeError) -> String {
    format!("❌ Erreur SSH : {error}")
}

#[must_use]
pub fn not_allowed(keyword: &str) -> String {
    format!("❌ Commande \"/{keyword}\" non autorisée.")
}

#[must_use]
pub fn log_saved(remote_path: &str, local_path: &Path) -> String {
    format!(
        "✅ Fichier `{remote_path}` sauvegardé localement ici :\n\n📁 {}",
        local_path.display()
    )
}

#[must_use]
pub fn log_failed(error: &BridgeError) -> String {
    format!("❌ Impossible de récupérer le fichier : {error}")
}

#[must_use]
pub fn script_finished(name: &str, source_url: &str, output: &str) -> String {
    format!("✅ Script [{name}]({source_url}) terminé.\n\nSortie :\n{output}")
}

#[must_use]
pub fn script_failed(error: &BridgeError) -> String {
    format!("❌ Échec lors de l'exécution du script : {error}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help_lists_allow_list_then_builtins() {
        let allow_list: AllowList = [("uptime", "uptime"), ("df", "df -h")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(
            help(&allow_list),
            "📋 Available commands:\n- `/df`\n- `/uptime`\n- `/getlog <path>`\n- `/runscript <name>`"
        );
    }

    #[test]
    fn test_failures_start_with_cross() {
        let err = BridgeError::SshExec {
            reason: "boom".to_string(),
        };
        for reply in [command_failed(&err), log_failed(&err), script_failed(&err)] {
            assert!(reply.starts_with('❌'));
            assert!(reply.contains("boom"));
        }
        assert!(not_allowed("reboot").starts_with('❌'));
    }

    #[test]
    fn test_intro_mentions_every_builtin() {
        assert!(INTRO.contains("/getlog"));
        assert!(INTRO.contains("/runscript"));
        assert!(INTRO.lines().count() >= 7);
    }
}
