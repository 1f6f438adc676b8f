//! Host key checks against the user's `known_hosts`, via russh's built-in support

use russh::keys::known_hosts::{check_known_hosts, learn_known_hosts};
use russh::keys::{Error as KeyError, HashAlg, PublicKey};
use tracing::{debug, warn};

use crate::config::HostKeyVerification;
use crate::error::{BridgeError, Result};

/// Outcome of looking a host key up in `known_hosts`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnownHostStatus {
    Match,
    /// Another key is recorded for this host (line of the conflicting entry)
    Mismatch { line: usize },
    Unknown,
}

fn lookup(hostname: &str, port: u16, key: &PublicKey) -> Result<KnownHostStatus> {
    match check_known_hosts(hostname, port, key) {
        Ok(true) => Ok(KnownHostStatus::Match),
        Ok(false) => Ok(KnownHostStatus::Unknown),
        Err(KeyError::KeyChanged { line }) => Ok(KnownHostStatus::Mismatch { line }),
        Err(e) => Err(BridgeError::Config(format!(
            "Failed to check known_hosts: {e}"
        ))),
    }
}

/// SHA256 fingerprint of a public key, `SHA256:...`
#[must_use]
pub fn fingerprint(key: &PublicKey) -> String {
    key.fingerprint(HashAlg::Sha256).to_string()
}

/// Check the server key according to the configured mode
///
/// # Errors
///
/// Returns an error if the key conflicts with a recorded one, if the host is
/// unknown in `Strict` mode, or if `known_hosts` cannot be read or updated.
pub fn verify_host_key(
    hostname: &str,
    port: u16,
    key: &PublicKey,
    mode: HostKeyVerification,
) -> Result<()> {
    if mode == HostKeyVerification::Off {
        debug!(hostname = %hostname, fingerprint = %fingerprint(key), "Host key accepted without verification");
        return Ok(());
    }

    match lookup(hostname, port, key)? {
        KnownHostStatus::Match => Ok(()),
        KnownHostStatus::Mismatch { line } => {
            warn!(hostname = %hostname, port, line, "Host key mismatch detected");
            Err(BridgeError::SshHostKeyMismatch {
                host: hostname.to_string(),
                expected: format!("key from known_hosts line {line}"),
                actual: fingerprint(key),
            })
        }
        KnownHostStatus::Unknown if mode == HostKeyVerification::AcceptNew => {
            warn!(hostname = %hostname, fingerprint = %fingerprint(key), "Adding new host key to known_hosts");
            learn_known_hosts(hostname, port, key).map_err(|e| {
                BridgeError::Config(format!("Failed to add host key to known_hosts: {e}"))
            })?;
            Ok(())
        }
        KnownHostStatus::Unknown => Err(BridgeError::SshHostKeyUnknown {
            host: hostname.to_string(),
            fingerprint: fingerprint(key),
        }),
    }
}
