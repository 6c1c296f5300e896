use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{SessionHost, SessionInfo, SessionStatus};
use crate::error::{one_line, Error, Result};

/// [`SessionHost`] backed by the `zellij` executable.
///
/// Attach and create hand the terminal to zellij and return once the user
/// detaches; the other operations are short-lived `zellij` invocations.
#[derive(Debug, Clone)]
pub struct ZellijManager {
    program: String,
}

impl ZellijManager {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn zellij_cmd(&self) -> Command {
        Command::new(&self.program)
    }

    /// A missing binary gets its own message instead of a bare io error.
    fn spawn_error(&self, e: std::io::Error) -> Error {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::zellij(format!("{} not found in PATH", self.program))
        } else {
            Error::Io(e)
        }
    }

    async fn run_checked(&self, mut cmd: Command, what: &str) -> Result<()> {
        debug!(?cmd, "zellij");
        let output = cmd.output().await.map_err(|e| self.spawn_error(e))?;
        if !output.status.success() {
            let stderr = one_line(&String::from_utf8_lossy(&output.stderr));
            return Err(Error::zellij(format!("Failed to {what}: {stderr}")));
        }
        Ok(())
    }
}

impl Default for ZellijManager {
    fn default() -> Self {
        Self::new("zellij")
    }
}

#[async_trait]
impl SessionHost for ZellijManager {
    async fn list_sessions(&self) -> Result<Vec<SessionInfo>> {
        let output = self
            .zellij_cmd()
            .args(["list-sessions", "--no-formatting"])
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            // No server running or no sessions
            return Ok(Vec::new());
        }

        Ok(parse_session_list(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn create_session(&self, name: &str, working_dir: &Path) -> Result<()> {
        let mut cmd = self.zellij_cmd();
        cmd.current_dir(working_dir)
            .args(["attach", "--create", name, "options", "--default-cwd"])
            .arg(working_dir);
        debug!(?cmd, "zellij");

        let status = cmd.status().await.map_err(|e| Error::SessionCreationFailed {
            name: name.to_string(),
            reason: self.spawn_error(e).to_string(),
        })?;
        if !status.success() {
            return Err(Error::SessionCreationFailed {
                name: name.to_string(),
                reason: format!("zellij exited with {status}"),
            });
        }
        Ok(())
    }

    async fn attach_session(&self, name: &str, default_cwd: &Path) -> Result<()> {
        let mut cmd = self.zellij_cmd();
        cmd.args(["attach", name, "options", "--default-cwd"])
            .arg(default_cwd);
        debug!(?cmd, "zellij");

        let status = cmd.status().await.map_err(|e| self.spawn_error(e))?;
        if !status.success() {
            return Err(Error::zellij(format!("Failed to attach to session {name}")));
        }
        Ok(())
    }

    async fn new_tab(&self, working_dir: &Path, name: &str) -> Result<()> {
        let mut cmd = self.zellij_cmd();
        cmd.args(["action", "new-tab", "--cwd"])
            .arg(working_dir)
            .args(["--name", name]);
        self.run_checked(cmd, "open tab").await
    }

    async fn kill_session(&self, name: &str) -> Result<()> {
        let mut cmd = self.zellij_cmd();
        cmd.args(["delete-session", "--force", name]);
        self.run_checked(cmd, &format!("kill session {name}")).await
    }
}

/// Parse `zellij list-sessions --no-formatting`.
///
/// Lines look like `name [Created 2h ago] (current)` or
/// `name [Created 1d ago] (EXITED - attach to resurrect)`.
pub fn parse_session_list(output: &str) -> Vec<SessionInfo> {
    output
        .lines()
        .filter_map(|line| {
            let name = line.split_whitespace().next()?;
            let status = if line.contains("EXITED") {
                SessionStatus::Exited
            } else {
                SessionStatus::Active
            };
            Some(SessionInfo {
                name: name.to_string(),
                status,
            })
        })
        .collect()
}
