use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::codec::RepoId;
use crate::error::{Error, Result};
use crate::git::{Vcs, WorktreeEntry};

/// Owns the `<base>/<repo>/<branch>` worktree layout.
pub struct WorktreeManager {
    base: PathBuf,
    vcs: Arc<dyn Vcs>,
}

impl WorktreeManager {
    pub fn new(base: impl Into<PathBuf>, vcs: Arc<dyn Vcs>) -> Self {
        Self {
            base: base.into(),
            vcs,
        }
    }

    /// Canonical worktree directory for `(repo, branch)`.
    pub fn worktree_path(&self, repo: &RepoId, branch: &str) -> PathBuf {
        self.base.join(repo.to_path()).join(branch)
    }

    /// Directory to work in for `(repo, branch)`.
    ///
    /// A plain clone already has one branch checked out and git refuses to
    /// check it out twice, so that branch resolves to the clone itself.
    pub async fn resolve_worktree(&self, source: &Path, repo: &RepoId, branch: &str) -> Result<PathBuf> {
        if source.join(".git").exists() {
            let current = self.vcs.current_branch(source).await?;
            if current.as_deref() == Some(branch) {
                return Ok(source.to_path_buf());
            }
        }
        Ok(self.worktree_path(repo, branch))
    }

    /// Make sure `target` is a worktree of `source` with `branch` checked out.
    ///
    /// A no-op when git already lists `target` as a worktree of `source`.
    /// Otherwise the parent directories are created and a single worktree is
    /// added; with `create_branch` the branch is created from `HEAD` at the
    /// same time. An existing directory that is not a registered worktree,
    /// or any existing target when a new branch is requested, is an error.
    pub async fn ensure_worktree(
        &self,
        source: &Path,
        branch: &str,
        target: &Path,
        create_branch: bool,
    ) -> Result<()> {
        let creation_failed = |reason: String| Error::WorktreeCreationFailed {
            path: target.display().to_string(),
            reason,
        };

        if target.exists() {
            if create_branch {
                return Err(creation_failed(format!(
                    "{} already exists",
                    target.display()
                )));
            }
            if self.is_registered(source, target).await? {
                return Ok(());
            }
            return Err(creation_failed(format!(
                "{} exists but is not a worktree of {}",
                target.display(),
                source.display()
            )));
        }

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| creation_failed(e.to_string()))?;
        }

        self.vcs
            .add_worktree(source, target, branch, create_branch)
            .await
            .map_err(|e| match e {
                Error::Git(reason) => creation_failed(reason),
                other => creation_failed(other.to_string()),
            })?;

        info!(path = %target.display(), branch, create_branch, "worktree created");
        Ok(())
    }

    async fn is_registered(&self, source: &Path, target: &Path) -> Result<bool> {
        let canonical = tokio::fs::canonicalize(target)
            .await
            .unwrap_or_else(|_| target.to_path_buf());
        Ok(self
            .vcs
            .list_worktrees(source)
            .await?
            .iter()
            .any(|e| e.path == target || e.path == canonical))
    }

    /// Remove a worktree, forcibly if git refuses.
    ///
    /// Falls back to deleting the directory and pruning git's stale
    /// metadata, so no orphan is left behind either way.
    pub async fn prune_worktree(&self, source: &Path, worktree: &Path) -> Result<()> {
        match self.vcs.remove_worktree(source, worktree).await {
            Ok(()) => {
                info!(path = %worktree.display(), "worktree removed");
                return Ok(());
            }
            Err(e) => warn!(path = %worktree.display(), error = %e, "clean removal failed, forcing"),
        }

        match tokio::fs::remove_dir_all(worktree).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.vcs.prune_worktrees(source).await?;
        info!(path = %worktree.display(), "worktree removed forcibly");
        Ok(())
    }

    /// Linked worktrees of `source`, minus the main/bare entry and `excluding`.
    pub async fn list_active_worktrees(
        &self,
        source: &Path,
        excluding: &HashSet<PathBuf>,
    ) -> Result<Vec<WorktreeEntry>> {
        let entries = self.vcs.list_worktrees(source).await?;
        Ok(entries
            .into_iter()
            .enumerate()
            .filter(|(i, e)| *i > 0 && !e.bare && !excluding.contains(&e.path))
            .map(|(_, e)| e)
            .collect())
    }
}
