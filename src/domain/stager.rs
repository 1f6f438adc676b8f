//! Script Stager
//!
//! fetch -> stage -> execute, strictly in that order. A failure in any
//! phase stops the pipeline and is reported with the phase name.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use super::allowlist::RUNSCRIPT_KEYWORD;
use super::replies;
use super::transfer::FileTransfer;
use super::transport::TransportSession;
use crate::config::ArtifactsConfig;
use crate::error::{BridgeError, Result, ScriptPhase};
use crate::ports::{ScriptSource, SshConnector};

/// Permission bits of staged scripts, locally and remotely
pub const SCRIPT_MODE: u32 = 0o755;

/// A fetched script and where it lives on each side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedScript {
    pub name: String,
    pub local_path: PathBuf,
    pub remote_path: String,
    pub source_url: String,
}

impl StagedScript {
    /// Remote command line: `java -jar` for `.jar`, `bash` otherwise
    #[must_use]
    pub fn command(&self) -> String {
        interpreter_command(&self.name, &self.remote_path)
    }
}

#[must_use]
pub fn interpreter_command(name: &str, remote_path: &str) -> String {
    if is_jar(name) {
        format!("java -jar {remote_path}")
    } else {
        format!("bash {remote_path}")
    }
}

fn is_jar(name: &str) -> bool {
    name.ends_with(".jar")
}

/// Script names end up in a URL, a local path and a remote command line,
/// so only plain file names are accepted.
///
/// # Errors
///
/// Returns `MalformedRequest` for empty names, names starting with `.`,
/// and names with characters outside `[A-Za-z0-9._-]`.
pub fn validate_script_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        Some("script name is empty")
    } else if name.starts_with('.') {
        Some("script name cannot start with '.'")
    } else if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        Some("script name may only contain letters, digits, '.', '_' and '-'")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(BridgeError::MalformedRequest {
            keyword: RUNSCRIPT_KEYWORD.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// Remove every carriage return, turning CRLF line endings into LF
#[must_use]
pub fn normalize_line_endings(body: &[u8]) -> Vec<u8> {
    body.iter().copied().filter(|&b| b != b'\r').collect()
}

pub struct ScriptStager<C, S> {
    source: Arc<S>,
    session: TransportSession<C>,
    transfer: Arc<FileTransfer<C>>,
    artifacts: ArtifactsConfig,
    local_dir: PathBuf,
}

impl<C: SshConnector, S: ScriptSource> ScriptStager<C, S> {
    #[must_use]
    pub const fn new(
        source: Arc<S>,
        session: TransportSession<C>,
        transfer: Arc<FileTransfer<C>>,
        artifacts: ArtifactsConfig,
        local_dir: PathBuf,
    ) -> Self {
        Self {
            source,
            session,
            transfer,
            artifacts,
            local_dir,
        }
    }

    fn remote_path(&self, name: &str) -> String {
        format!(
            "{}/{name}",
            self.artifacts.remote_staging_dir.trim_end_matches('/')
        )
    }

    /// Fetch `name` from the artifact repository, stage it on the remote
    /// host and run it
    ///
    /// # Returns
    /// The success reply, embedding a link to the script and its output
    ///
    /// # Errors
    ///
    /// Returns `MalformedRequest` for an unusable name; any other failure is
    /// wrapped in `ScriptStage` naming the phase it happened in.
    pub async fn fetch_and_run(&self, name: &str) -> Result<String> {
        validate_script_name(name)?;

        let body = self
            .fetch(name)
            .await
            .map_err(|e| e.in_phase(ScriptPhase::Fetch))?;

        let staged = self
            .stage(name, &body)
            .await
            .map_err(|e| e.in_phase(ScriptPhase::Stage))?;

        let command = staged.command();
        let result = self
            .session
            .run(&command)
            .await
            .map_err(|e| e.in_phase(ScriptPhase::Execute))?;

        info!(
            script = %staged.name,
            command = %command,
            exit_code = ?result.exit_code,
            duration_ms = result.duration_ms,
            "Script finished"
        );
        Ok(replies::script_finished(
            &staged.name,
            &staged.source_url,
            &result.output,
        ))
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        let url = self.artifacts.script_url(name);
        let response = self.source.fetch(&url).await?;
        if !response.is_ok() {
            tracing::warn!(url = %url, status = response.status, "Script fetch returned non-success status");
            return Err(BridgeError::ScriptNotFound { url });
        }
        Ok(response.body)
    }

    /// Write the script locally with executable bits and upload it
    ///
    /// Jar archives are binary and are copied untouched; everything else
    /// gets its line endings normalized.
    async fn stage(&self, name: &str, body: &[u8]) -> Result<StagedScript> {
        let staged = StagedScript {
            name: name.to_string(),
            local_path: self.local_dir.join(name),
            remote_path: self.remote_path(name),
            source_url: self.artifacts.script_url(name),
        };

        let content = if is_jar(name) {
            body.to_vec()
        } else {
            normalize_line_endings(body)
        };
        write_executable(&staged.local_path, &content).await?;

        self.transfer
            .upload(&staged.local_path, &staged.remote_path, SCRIPT_MODE)
            .await?;

        Ok(staged)
    }
}

async fn write_executable(path: &Path, content: &[u8]) -> Result<()> {
    tokio::fs::write(path, content)
        .await
        .map_err(|e| BridgeError::FileTransfer {
            reason: format!("Cannot write {}: {e}", path.display()),
        })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(SCRIPT_MODE))
            .await
            .map_err(|e| BridgeError::FileTransfer {
                reason: format!("Cannot make {} executable: {e}", path.display()),
            })?;
    }

    Ok(())
}
