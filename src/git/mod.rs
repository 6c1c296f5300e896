mod command;
mod remote;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Result;

pub use command::GitCli;
pub use remote::repo_id_from_url;

/// One entry of `git worktree list --porcelain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeEntry {
    pub path: PathBuf,
    /// Short branch name; `None` for detached or bare entries.
    pub branch: Option<String>,
    pub bare: bool,
}

/// The git operations this tool needs, nothing more.
#[async_trait]
pub trait Vcs: Send + Sync {
    /// Full ref names under `refs/heads` and `refs/remotes`.
    async fn list_refs(&self, repo: &Path) -> Result<Vec<String>>;

    /// Short name of `refs/remotes/<remote>/HEAD` (e.g. `origin/main`), if set.
    async fn remote_head(&self, repo: &Path, remote: &str) -> Result<Option<String>>;

    /// Branch checked out by `repo` itself (`None` when detached or unborn).
    async fn current_branch(&self, repo: &Path) -> Result<Option<String>>;

    async fn add_worktree(
        &self,
        repo: &Path,
        path: &Path,
        branch: &str,
        create_branch: bool,
    ) -> Result<()>;

    async fn remove_worktree(&self, repo: &Path, path: &Path) -> Result<()>;

    /// Drop metadata of worktrees whose directories are gone.
    async fn prune_worktrees(&self, repo: &Path) -> Result<()>;

    /// All worktrees, main (or bare) entry first.
    async fn list_worktrees(&self, repo: &Path) -> Result<Vec<WorktreeEntry>>;

    /// Absolute common git directory for the repository containing `dir`.
    async fn common_dir(&self, dir: &Path) -> Result<PathBuf>;

    async fn clone_repository(&self, url: &str, dest: &Path, bare: bool) -> Result<()>;
}

/// Parse `git worktree list --porcelain`: attribute lines, blank-line separated.
pub fn parse_worktree_porcelain(output: &str) -> Vec<WorktreeEntry> {
    let mut entries = Vec::new();
    let mut current: Option<WorktreeEntry> = None;

    for line in output.lines() {
        if let Some(path) = line.strip_prefix("worktree ") {
            if let Some(done) = current.take() {
                entries.push(done);
            }
            current = Some(WorktreeEntry {
                path: PathBuf::from(path),
                branch: None,
                bare: false,
            });
            continue;
        }

        let Some(entry) = current.as_mut() else {
            continue;
        };
        if let Some(rest) = line.strip_prefix("branch ") {
            entry.branch = Some(rest.strip_prefix("refs/heads/").unwrap_or(rest).to_string());
        } else if line == "bare" {
            entry.bare = true;
        }
    }

    if let Some(done) = current {
        entries.push(done);
    }
    entries
}
