//! In-memory collaborators for unit tests.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::git::{Vcs, WorktreeEntry};
use crate::mux::{SessionHost, SessionInfo, SessionStatus};
use crate::picker::{filter_candidates, Picker};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsCall {
    ListRefs(PathBuf),
    AddWorktree {
        path: PathBuf,
        branch: String,
        create: bool,
    },
    RemoveWorktree(PathBuf),
    PruneWorktrees,
    Clone(String, PathBuf),
}

#[derive(Default)]
struct VcsState {
    refs: HashMap<PathBuf, Vec<String>>,
    remote_heads: HashMap<PathBuf, String>,
    current_branches: HashMap<PathBuf, String>,
    worktrees: HashMap<PathBuf, Vec<WorktreeEntry>>,
    common_dirs: HashMap<PathBuf, PathBuf>,
    fail_add: Option<String>,
    fail_remove: Option<String>,
    calls: Vec<VcsCall>,
}

#[derive(Default)]
pub struct FakeVcs {
    state: Mutex<VcsState>,
}

impl FakeVcs {
    pub fn set_refs(&self, repo: &Path, refs: &[&str]) {
        self.state
            .lock()
            .refs
            .insert(repo.to_path_buf(), refs.iter().map(|r| r.to_string()).collect());
    }

    pub fn set_remote_head(&self, repo: &Path, head: &str) {
        self.state
            .lock()
            .remote_heads
            .insert(repo.to_path_buf(), head.to_string());
    }

    pub fn set_current_branch(&self, repo: &Path, branch: &str) {
        self.state
            .lock()
            .current_branches
            .insert(repo.to_path_buf(), branch.to_string());
    }

    pub fn set_worktrees(&self, repo: &Path, entries: Vec<WorktreeEntry>) {
        self.state.lock().worktrees.insert(repo.to_path_buf(), entries);
    }

    pub fn set_common_dir(&self, dir: &Path, common: &Path) {
        self.state
            .lock()
            .common_dirs
            .insert(dir.to_path_buf(), common.to_path_buf());
    }

    pub fn fail_add_worktree(&self, msg: &str) {
        self.state.lock().fail_add = Some(msg.to_string());
    }

    pub fn fail_remove_worktree(&self, msg: &str) {
        self.state.lock().fail_remove = Some(msg.to_string());
    }

    pub fn calls(&self) -> Vec<VcsCall> {
        self.state.lock().calls.clone()
    }

    pub fn clones(&self) -> Vec<VcsCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, VcsCall::Clone(..)))
            .collect()
    }

    /// Calls that change refs or worktrees.
    pub fn mutations(&self) -> Vec<VcsCall> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, VcsCall::ListRefs(_)))
            .collect()
    }
}

#[async_trait]
impl Vcs for FakeVcs {
    async fn list_refs(&self, repo: &Path) -> Result<Vec<String>> {
        let mut state = self.state.lock();
        state.calls.push(VcsCall::ListRefs(repo.to_path_buf()));
        Ok(state.refs.get(repo).cloned().unwrap_or_default())
    }

    async fn remote_head(&self, repo: &Path, _remote: &str) -> Result<Option<String>> {
        Ok(self.state.lock().remote_heads.get(repo).cloned())
    }

    async fn current_branch(&self, repo: &Path) -> Result<Option<String>> {
        Ok(self.state.lock().current_branches.get(repo).cloned())
    }

    async fn add_worktree(
        &self,
        repo: &Path,
        path: &Path,
        branch: &str,
        create_branch: bool,
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(VcsCall::AddWorktree {
            path: path.to_path_buf(),
            branch: branch.to_string(),
            create: create_branch,
        });
        if let Some(msg) = &state.fail_add {
            return Err(Error::git(msg.clone()));
        }
        std::fs::create_dir_all(path)?;
        if create_branch {
            state
                .refs
                .entry(repo.to_path_buf())
                .or_default()
                .push(format!("refs/heads/{branch}"));
        }
        state
            .worktrees
            .entry(repo.to_path_buf())
            .or_default()
            .push(WorktreeEntry {
                path: path.to_path_buf(),
                branch: Some(branch.to_string()),
                bare: false,
            });
        Ok(())
    }

    async fn remove_worktree(&self, _repo: &Path, path: &Path) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(VcsCall::RemoveWorktree(path.to_path_buf()));
        if let Some(msg) = &state.fail_remove {
            return Err(Error::git(msg.clone()));
        }
        if path.exists() {
            std::fs::remove_dir_all(path)?;
        }
        for entries in state.worktrees.values_mut() {
            entries.retain(|e| e.path != path);
        }
        Ok(())
    }

    async fn prune_worktrees(&self, _repo: &Path) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(VcsCall::PruneWorktrees);
        for entries in state.worktrees.values_mut() {
            entries.retain(|e| e.bare || e.path.exists());
        }
        Ok(())
    }

    async fn list_worktrees(&self, repo: &Path) -> Result<Vec<WorktreeEntry>> {
        Ok(self.state.lock().worktrees.get(repo).cloned().unwrap_or_default())
    }

    async fn common_dir(&self, dir: &Path) -> Result<PathBuf> {
        self.state
            .lock()
            .common_dirs
            .get(dir)
            .cloned()
            .ok_or_else(|| Error::InvalidState(format!("not a git repository: {}", dir.display())))
    }

    async fn clone_repository(&self, url: &str, dest: &Path, bare: bool) -> Result<()> {
        self.state
            .lock()
            .calls
            .push(VcsCall::Clone(url.to_string(), dest.to_path_buf()));
        if bare {
            std::fs::create_dir_all(dest.join("objects"))?;
            std::fs::create_dir_all(dest.join("refs"))?;
            std::fs::write(dest.join("HEAD"), "ref: refs/heads/main\n")?;
        } else {
            std::fs::create_dir_all(dest.join(".git"))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    List,
    Create(String, PathBuf),
    Attach(String, PathBuf),
    NewTab(PathBuf, String),
    Kill(String),
}

#[derive(Default)]
struct HostState {
    sessions: Vec<SessionInfo>,
    calls: Vec<HostCall>,
    fail_create: Option<String>,
    fail_kill: HashSet<String>,
}

#[derive(Default)]
pub struct FakeHost {
    state: Mutex<HostState>,
}

impl FakeHost {
    pub fn with_sessions(sessions: &[(&str, SessionStatus)]) -> Self {
        let host = Self::default();
        host.state.lock().sessions = sessions
            .iter()
            .map(|(name, status)| SessionInfo {
                name: name.to_string(),
                status: *status,
            })
            .collect();
        host
    }

    pub fn fail_create(&self, msg: &str) {
        self.state.lock().fail_create = Some(msg.to_string());
    }

    pub fn fail_kill(&self, name: &str) {
        self.state.lock().fail_kill.insert(name.to_string());
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.state.lock().calls.clone()
    }

    pub fn session_names(&self) -> Vec<String> {
        self.state
            .lock()
            .sessions
            .iter()
            .map(|s| s.name.clone())
            .collect()
    }
}

#[async_trait]
impl SessionHost for FakeHost {
    async fn list_sessions(&self) -> Result<Vec<SessionInfo>> {
        let mut state = self.state.lock();
        state.calls.push(HostCall::List);
        Ok(state.sessions.clone())
    }

    async fn create_session(&self, name: &str, working_dir: &Path) -> Result<()> {
        let mut state = self.state.lock();
        state
            .calls
            .push(HostCall::Create(name.to_string(), working_dir.to_path_buf()));
        if let Some(msg) = &state.fail_create {
            return Err(Error::zellij(msg.clone()));
        }
        state.sessions.push(SessionInfo {
            name: name.to_string(),
            status: SessionStatus::Active,
        });
        Ok(())
    }

    async fn attach_session(&self, name: &str, default_cwd: &Path) -> Result<()> {
        let mut state = self.state.lock();
        state
            .calls
            .push(HostCall::Attach(name.to_string(), default_cwd.to_path_buf()));
        if let Some(s) = state.sessions.iter_mut().find(|s| s.name == name) {
            s.status = SessionStatus::Active;
        }
        Ok(())
    }

    async fn new_tab(&self, working_dir: &Path, name: &str) -> Result<()> {
        self.state
            .lock()
            .calls
            .push(HostCall::NewTab(working_dir.to_path_buf(), name.to_string()));
        Ok(())
    }

    async fn kill_session(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(HostCall::Kill(name.to_string()));
        if state.fail_kill.contains(name) {
            return Err(Error::zellij(format!("Failed to kill session {name}")));
        }
        state.sessions.retain(|s| s.name != name);
        Ok(())
    }
}

/// Scripted picker.
pub enum FakePicker {
    /// Return this candidate if offered.
    Choose(String),
    /// First candidate matching the query.
    First,
    /// Behave like a cancelled picker.
    Cancel,
}

impl FakePicker {
    pub fn choose(s: &str) -> Self {
        Self::Choose(s.to_string())
    }
}

#[async_trait]
impl Picker for FakePicker {
    async fn pick(&self, candidates: &[String], query: &str) -> Result<Option<String>> {
        Ok(match self {
            FakePicker::Choose(s) => candidates.iter().find(|c| *c == s).cloned(),
            FakePicker::First => filter_candidates(candidates, query).into_iter().next(),
            FakePicker::Cancel => None,
        })
    }
}
