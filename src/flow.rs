//! Top-level commands composed from the index, worktrees, sessions and picker.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::codec::{lookup_repository, RepoId, SessionId};
use crate::config::Context;
use crate::error::{Error, Result};
use crate::git::{GitCli, Vcs};
use crate::mux::{SessionHost, SessionInfo, SessionOrchestrator, ZellijManager};
use crate::picker::{Fzf, Picker};
use crate::repo::{RepositoryIndex, WorktreeManager};

#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    /// Only offer repositories that back a managed session.
    pub sessions_only: bool,
    /// Branch to open instead of the default branch.
    pub branch: Option<String>,
}

/// Where a repository was opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opened {
    pub repo: RepoId,
    pub session: SessionId,
    pub dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutTarget {
    Existing(String),
    /// `-b`: the branch must not exist yet.
    Create(String),
    /// Choose among local and remote branches.
    Pick,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Opened as a tab of the current session.
    Tab(PathBuf),
    /// Not inside a session; the caller should start a shell here.
    Shell(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    Repositories,
    Sessions,
    All,
}

#[derive(Debug, Default)]
pub struct Listing {
    pub repositories: Vec<RepoId>,
    /// Managed sessions with the repository they map to, when registered.
    pub sessions: Vec<(SessionInfo, Option<RepoId>)>,
}

/// Outcome of a best-effort fan-out: every item is attempted.
#[derive(Debug, Default)]
pub struct BulkReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, Error)>,
}

impl BulkReport {
    fn record(&mut self, item: String, result: Result<()>) {
        match result {
            Ok(()) => self.succeeded.push(item),
            Err(e) => {
                warn!(item = %item, error = %e, "operation failed");
                self.failed.push((item, e));
            }
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// `Err(Partial)` when anything failed.
    pub fn into_result(self) -> Result<()> {
        if self.failed.is_empty() {
            Ok(())
        } else {
            Err(Error::Partial {
                failed: self.failed.len(),
                total: self.total(),
            })
        }
    }
}

pub struct SelectionFlow {
    index: RepositoryIndex,
    worktrees: WorktreeManager,
    sessions: SessionOrchestrator,
    picker: Arc<dyn Picker>,
    interactive: bool,
    bare: bool,
}

impl SelectionFlow {
    pub fn new(
        ctx: &Context,
        vcs: Arc<dyn Vcs>,
        host: Arc<dyn SessionHost>,
        picker: Arc<dyn Picker>,
    ) -> Self {
        let cfg = &ctx.config;
        Self {
            index: RepositoryIndex::new(&cfg.root, cfg.max_depth, &cfg.remote, vcs.clone()),
            worktrees: WorktreeManager::new(&cfg.worktree_root, vcs),
            sessions: SessionOrchestrator::new(host, ctx.current_session.clone()),
            picker,
            interactive: ctx.interactive,
            bare: cfg.bare,
        }
    }

    /// Wire up git, zellij and fzf.
    pub fn from_context(ctx: &Context) -> Self {
        let cfg = &ctx.config;
        Self::new(
            ctx,
            Arc::new(GitCli::new(&cfg.remote)),
            Arc::new(ZellijManager::new(&cfg.zellij)),
            Arc::new(Fzf::new(&cfg.picker)),
        )
    }

    /// Narrow `candidates` to one. Without a TTY the picker is never
    /// started: a query takes the best filtered match, no query matches
    /// nothing.
    async fn choose(&self, candidates: Vec<String>, query: &str) -> Result<String> {
        let query = query.trim();
        let picked = if self.interactive {
            self.picker.pick(&candidates, query).await?
        } else if query.is_empty() {
            None
        } else {
            self.picker.filter(&candidates, query).into_iter().next()
        };
        picked.ok_or_else(|| Error::no_match(query))
    }

    fn repository_names(&self) -> Vec<String> {
        self.index
            .list_repositories()
            .map(|r| r.to_string())
            .collect()
    }

    /// Managed sessions paired with their registered repository.
    async fn session_repositories(&self) -> Result<Vec<(SessionInfo, Option<RepoId>)>> {
        let known: Vec<RepoId> = self.index.list_repositories().collect();
        let managed = self.sessions.list_managed().await?;
        Ok(managed
            .into_iter()
            .map(|info| {
                let repo = SessionId::parse(&info.name)
                    .and_then(|sid| lookup_repository(&sid, known.iter().cloned()))
                    .ok();
                (info, repo)
            })
            .collect())
    }

    /// Pick a repository and open its session on a branch worktree.
    pub async fn select_and_open(&self, query: &str, opts: OpenOptions) -> Result<Opened> {
        self.sessions.ensure_outside_session()?;

        let candidates = if opts.sessions_only {
            self.session_repositories()
                .await?
                .into_iter()
                .filter_map(|(_, repo)| repo.map(|r| r.to_string()))
                .collect()
        } else {
            self.repository_names()
        };

        let choice = self.choose(candidates, query).await?;
        let repo = RepoId::parse(&choice)?;
        self.open_repository(&repo, opts.branch.as_deref()).await
    }

    /// Ensure the worktree for `(repo, branch)` and open the repository session.
    pub async fn open_repository(&self, repo: &RepoId, branch: Option<&str>) -> Result<Opened> {
        self.sessions.ensure_outside_session()?;

        let source = self.index.repository_path(repo);
        let branch = match branch {
            Some(b) => {
                if !self.index.branch_exists(repo, b).await? {
                    return Err(Error::BranchNotFound(b.to_string()));
                }
                b.to_string()
            }
            None => self.index.default_branch(repo).await?,
        };

        let dir = self.worktrees.resolve_worktree(&source, repo, &branch).await?;
        if dir != source {
            self.worktrees
                .ensure_worktree(&source, &branch, &dir, false)
                .await?;
        }

        let session = SessionId::from_repo(repo);
        self.sessions.open(&session, &dir).await?;
        Ok(Opened {
            repo: repo.clone(),
            session,
            dir,
        })
    }

    /// Kill one managed session chosen by `query`, or all of them.
    pub async fn select_and_delete(&self, query: &str, all: bool) -> Result<BulkReport> {
        let managed = self.sessions.list_managed().await?;
        let mut report = BulkReport::default();

        if all {
            for info in managed {
                let result = match SessionId::parse(&info.name) {
                    Ok(sid) => self.sessions.kill(&sid).await,
                    Err(e) => Err(e),
                };
                report.record(info.name, result);
            }
            return Ok(report);
        }

        let names = managed.into_iter().map(|s| s.name).collect();
        let choice = self.choose(names, query).await?;
        let sid = SessionId::parse(&choice)?;
        self.sessions.kill(&sid).await?;
        report.succeeded.push(choice);
        Ok(report)
    }

    /// Open a branch of the repository containing `cwd`.
    pub async fn checkout(&self, cwd: &Path, target: CheckoutTarget) -> Result<CheckoutOutcome> {
        let (repo, source) = self.index.repo_for_dir(cwd).await?;

        let (branch, create) = match target {
            CheckoutTarget::Existing(b) => {
                if !self.index.branch_exists(&repo, &b).await? {
                    return Err(Error::BranchNotFound(b));
                }
                (b, false)
            }
            CheckoutTarget::Create(b) => {
                if self.index.branch_exists(&repo, &b).await? {
                    return Err(Error::BranchExists(b));
                }
                (b, true)
            }
            CheckoutTarget::Pick => {
                let branches = self.index.list_branches(&repo).await?;
                (self.choose(branches, "").await?, false)
            }
        };

        let dir = if create {
            self.worktrees.worktree_path(&repo, &branch)
        } else {
            self.worktrees.resolve_worktree(&source, &repo, &branch).await?
        };
        if dir != source {
            self.worktrees
                .ensure_worktree(&source, &branch, &dir, create)
                .await?;
        }

        match self.sessions.open_new_tab(&dir, &branch).await {
            Ok(()) => Ok(CheckoutOutcome::Tab(dir)),
            Err(Error::NotInsideSession) => Ok(CheckoutOutcome::Shell(dir)),
            Err(e) => Err(e),
        }
    }

    /// Remove one (picked) or all branch worktrees of the repository
    /// containing `cwd`. The worktree `cwd` sits in is never offered.
    pub async fn prune(&self, cwd: &Path, all: bool) -> Result<BulkReport> {
        let (_, source) = self.index.repo_for_dir(cwd).await?;
        let cwd = tokio::fs::canonicalize(cwd)
            .await
            .unwrap_or_else(|_| cwd.to_path_buf());
        let excluding: HashSet<PathBuf> = cwd.ancestors().map(Path::to_path_buf).collect();

        let active = self
            .worktrees
            .list_active_worktrees(&source, &excluding)
            .await?;
        let mut report = BulkReport::default();

        if all {
            for entry in active {
                let result = self.worktrees.prune_worktree(&source, &entry.path).await;
                report.record(entry.path.display().to_string(), result);
            }
            return Ok(report);
        }

        let labels: Vec<String> = active.iter().map(worktree_label).collect();
        let choice = self.choose(labels.clone(), "").await?;
        let Some(pos) = labels.iter().position(|l| *l == choice) else {
            return Err(Error::no_match(&choice));
        };
        let entry = &active[pos];
        self.worktrees.prune_worktree(&source, &entry.path).await?;
        report.succeeded.push(entry.path.display().to_string());
        Ok(report)
    }

    /// Repository identifiers matching `query`, best first.
    pub fn query(&self, query: &str) -> Result<Vec<String>> {
        let matches = self.picker.filter(&self.repository_names(), query);
        if matches.is_empty() {
            return Err(Error::no_match(query));
        }
        Ok(matches)
    }

    pub async fn list(&self, scope: ListScope) -> Result<Listing> {
        let mut listing = Listing::default();
        if scope != ListScope::Sessions {
            listing.repositories = self.index.list_repositories().collect();
        }
        if scope != ListScope::Repositories {
            listing.sessions = self.session_repositories().await?;
        }
        Ok(listing)
    }

    /// Clone `url` into the registry (once) and open it.
    pub async fn get(&self, url: &str) -> Result<Opened> {
        let repo = self.index.clone_repository(url, self.bare).await?;
        info!(repo = %repo, "registered");
        self.open_repository(&repo, None).await
    }
}

fn worktree_label(entry: &crate::git::WorktreeEntry) -> String {
    entry
        .branch
        .clone()
        .unwrap_or_else(|| entry.path.display().to_string())
}
