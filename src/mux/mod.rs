mod manager;
mod orchestrator;

use std::fmt;
use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

pub use manager::{parse_session_list, ZellijManager};
pub use orchestrator::SessionOrchestrator;

/// Session state as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    /// Retained by the host, resurrected on attach.
    Exited,
}

impl SessionStatus {
    pub fn marker(self) -> &'static str {
        match self {
            SessionStatus::Active => "●",
            SessionStatus::Exited => "○",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub name: String,
    pub status: SessionStatus,
}

/// Terminal multiplexer operations used by the orchestrator.
#[async_trait]
pub trait SessionHost: Send + Sync {
    /// Every session the host knows about, managed or not.
    async fn list_sessions(&self) -> Result<Vec<SessionInfo>>;

    /// Create `name` rooted at `working_dir` and attach to it (blocking).
    async fn create_session(&self, name: &str, working_dir: &Path) -> Result<()>;

    /// Attach to `name` (blocking), pointing new tabs at `default_cwd`.
    async fn attach_session(&self, name: &str, default_cwd: &Path) -> Result<()>;

    /// Open a tab in the session this process runs in.
    async fn new_tab(&self, working_dir: &Path, name: &str) -> Result<()>;

    async fn kill_session(&self, name: &str) -> Result<()>;
}
