use crate::config::UpdaterConfig;
use crate::error::{Result, UpdateError};
use crate::store::LocalFileStore;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    Launched,
    /// Nothing on this system can handle the package
    NotFound,
    /// The installer refused the request
    Rejected(String),
}

/// Hands a downloaded package to the system installer.
#[async_trait]
pub trait InstallerLauncher: Send + Sync {
    async fn launch_install(&self, uri: &Url, mime_type: &str) -> Result<LaunchOutcome>;
}

/// Runs an installer program with the package path appended, e.g.
/// `adb install -r <file>`.
pub struct CommandLauncher {
    program: String,
    args: Vec<String>,
    store: LocalFileStore,
}

impl CommandLauncher {
    pub fn new(program: impl Into<String>, args: Vec<String>, store: LocalFileStore) -> Self {
        Self {
            program: program.into(),
            args,
            store,
        }
    }

    pub fn from_config(config: &UpdaterConfig, store: LocalFileStore) -> Self {
        Self::new(
            config.installer_program.clone(),
            config.installer_args.clone(),
            store,
        )
    }

    fn locate_program(&self) -> Option<PathBuf> {
        which::which(&self.program).ok()
    }
}

#[async_trait]
impl InstallerLauncher for CommandLauncher {
    async fn launch_install(&self, uri: &Url, mime_type: &str) -> Result<LaunchOutcome> {
        let Some(program) = self.locate_program() else {
            log::warn!("Installer '{}' not found on PATH", self.program);
            return Ok(LaunchOutcome::NotFound);
        };

        let file = self.store.resolve(uri)?;
        log::info!(
            "Launching {} for {} ({mime_type})",
            program.display(),
            uri
        );

        let output = Command::new(&program)
            .args(&self.args)
            .arg(&file)
            .output()
            .await
            .map_err(|e| {
                UpdateError::Install(format!("failed to execute '{}': {e}", self.program))
            })?;

        if output.status.success() {
            return Ok(LaunchOutcome::Launched);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            format!("{} exited with {}", self.program, output.status)
        } else {
            stderr
        };
        Ok(LaunchOutcome::Rejected(message))
    }
}
