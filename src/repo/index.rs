use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use crate::codec::RepoId;
use crate::error::{Error, Result};
use crate::git::{repo_id_from_url, Vcs};

/// Fallback when the remote `HEAD` cannot be resolved.
pub const FALLBACK_BRANCH: &str = "main";

/// Known repositories under the registry root.
pub struct RepositoryIndex {
    root: PathBuf,
    max_depth: usize,
    remote: String,
    vcs: Arc<dyn Vcs>,
}

impl RepositoryIndex {
    pub fn new(
        root: impl Into<PathBuf>,
        max_depth: usize,
        remote: impl Into<String>,
        vcs: Arc<dyn Vcs>,
    ) -> Self {
        Self {
            root: root.into(),
            max_depth,
            remote: remote.into(),
            vcs,
        }
    }

    pub fn repository_path(&self, repo: &RepoId) -> PathBuf {
        self.root.join(repo.to_path())
    }

    /// Repositories found under the root, in traversal order.
    ///
    /// Each call starts a fresh walk. Nested repositories below a match are
    /// not reported.
    pub fn list_repositories(&self) -> impl Iterator<Item = RepoId> + '_ {
        let mut walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(self.max_depth)
            .into_iter()
            .filter_entry(|e| e.file_type().is_dir() && !is_hidden(e));

        std::iter::from_fn(move || loop {
            let entry = match walker.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !is_repository(entry.path()) {
                continue;
            }
            walker.skip_current_dir();

            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            match RepoId::from_relative_path(relative) {
                Ok(id) => return Some(id),
                Err(e) => debug!(error = %e, "ignoring repository"),
            }
        })
    }

    /// Local and remote-tracking branch names, remote prefix stripped,
    /// deduplicated and sorted. `HEAD` is never included.
    pub async fn list_branches(&self, repo: &RepoId) -> Result<Vec<String>> {
        let refs = self.vcs.list_refs(&self.repository_path(repo)).await?;
        Ok(branch_names(&refs))
    }

    pub async fn branch_exists(&self, repo: &RepoId, branch: &str) -> Result<bool> {
        Ok(self
            .list_branches(repo)
            .await?
            .iter()
            .any(|b| b == branch))
    }

    /// Branch the remote `HEAD` points at.
    ///
    /// Best-effort: when the remote `HEAD` is unset (no remote, detached,
    /// offline bare clone) this returns [`FALLBACK_BRANCH`].
    pub async fn default_branch(&self, repo: &RepoId) -> Result<String> {
        let head = self
            .vcs
            .remote_head(&self.repository_path(repo), &self.remote)
            .await?;
        let branch = head.and_then(|h| {
            h.strip_prefix(&format!("{}/", self.remote))
                .map(str::to_string)
                .filter(|b| !b.is_empty() && b != "HEAD")
        });
        Ok(branch.unwrap_or_else(|| FALLBACK_BRANCH.to_string()))
    }

    /// Clone `url` into the registry unless it is already there.
    pub async fn clone_repository(&self, url: &str, bare: bool) -> Result<RepoId> {
        let id = repo_id_from_url(url)?;
        let dest = self.repository_path(&id);
        if is_repository(&dest) {
            info!(repo = %id, "already cloned");
            return Ok(id);
        }
        if dest.exists() {
            return Err(Error::InvalidState(format!(
                "{} exists but is not a repository",
                dest.display()
            )));
        }
        info!(repo = %id, bare, "cloning");
        self.vcs.clone_repository(url, &dest, bare).await?;
        Ok(id)
    }

    /// Repository (and its on-disk source) containing `dir`.
    pub async fn repo_for_dir(&self, dir: &Path) -> Result<(RepoId, PathBuf)> {
        let common = self.vcs.common_dir(dir).await?;
        // Plain clones share `<repo>/.git`; bare clones are the repository.
        let source = if common.file_name().is_some_and(|n| n == ".git") {
            common.parent().map(Path::to_path_buf).unwrap_or(common)
        } else {
            common
        };

        let root = tokio::fs::canonicalize(&self.root)
            .await
            .unwrap_or_else(|_| self.root.clone());
        let relative = source.strip_prefix(&root).map_err(|_| {
            Error::InvalidState(format!(
                "{} is not under {}",
                source.display(),
                self.root.display()
            ))
        })?;
        let id = RepoId::from_relative_path(relative)?;
        let source = self.repository_path(&id);
        Ok((id, source))
    }
}

/// Strip `refs/heads/` and `refs/remotes/<remote>/`, drop `HEAD`, dedupe, sort.
pub fn branch_names(refs: &[String]) -> Vec<String> {
    let mut names = BTreeSet::new();
    for r in refs {
        let name = if let Some(local) = r.strip_prefix("refs/heads/") {
            local
        } else if let Some(remote) = r.strip_prefix("refs/remotes/") {
            match remote.split_once('/') {
                Some((_, branch)) => branch,
                None => continue,
            }
        } else {
            continue;
        };
        if name.is_empty() || name == "HEAD" {
            continue;
        }
        names.insert(name.to_string());
    }
    names.into_iter().collect()
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

/// Plain clone (`.git` entry) or bare clone (`HEAD`, `objects/`, `refs/`).
pub fn is_repository(dir: &Path) -> bool {
    dir.join(".git").exists() || is_bare_layout(dir)
}

fn is_bare_layout(dir: &Path) -> bool {
    dir.join("HEAD").is_file() && dir.join("objects").is_dir() && dir.join("refs").is_dir()
}
