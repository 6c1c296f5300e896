use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{parse_worktree_porcelain, Vcs, WorktreeEntry};
use crate::error::{one_line, Error, Result};

/// [`Vcs`] backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    remote: String,
}

impl GitCli {
    pub fn new(remote: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
        }
    }

    fn git_cmd(&self, dir: &Path) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(dir);
        cmd
    }

    /// Run git in `dir`, returning trimmed stdout or the trimmed stderr as error.
    async fn run<I, S>(&self, dir: &Path, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = self.git_cmd(dir);
        cmd.args(args);
        debug!(?cmd, "git");

        let output = cmd.output().await?;
        if !output.status.success() {
            return Err(Error::git(one_line(&String::from_utf8_lossy(&output.stderr))));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Like [`Self::run`] but maps a failing exit status to `None`.
    async fn run_optional<I, S>(&self, dir: &Path, args: I) -> Result<Option<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        match self.run(dir, args).await {
            Ok(out) if out.is_empty() => Ok(None),
            Ok(out) => Ok(Some(out)),
            Err(Error::Git(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_REMOTE)
    }
}

#[async_trait]
impl Vcs for GitCli {
    async fn list_refs(&self, repo: &Path) -> Result<Vec<String>> {
        let out = self
            .run(
                repo,
                ["for-each-ref", "--format=%(refname)", "refs/heads", "refs/remotes"],
            )
            .await?;
        Ok(out.lines().map(str::to_string).collect())
    }

    async fn remote_head(&self, repo: &Path, remote: &str) -> Result<Option<String>> {
        let refname = format!("refs/remotes/{remote}/HEAD");
        self.run_optional(repo, ["symbolic-ref", "--quiet", "--short", refname.as_str()])
            .await
    }

    async fn current_branch(&self, repo: &Path) -> Result<Option<String>> {
        self.run_optional(repo, ["symbolic-ref", "--quiet", "--short", "HEAD"])
            .await
    }

    async fn add_worktree(
        &self,
        repo: &Path,
        path: &Path,
        branch: &str,
        create_branch: bool,
    ) -> Result<()> {
        let mut args: Vec<&OsStr> = vec![OsStr::new("worktree"), OsStr::new("add")];
        if create_branch {
            args.extend([OsStr::new("-b"), OsStr::new(branch), path.as_os_str()]);
        } else {
            // An existing remote-only branch gets a tracking local branch from git.
            args.extend([path.as_os_str(), OsStr::new(branch)]);
        }
        self.run(repo, args).await.map(|_| ())
    }

    async fn remove_worktree(&self, repo: &Path, path: &Path) -> Result<()> {
        self.run(
            repo,
            [OsStr::new("worktree"), OsStr::new("remove"), path.as_os_str()],
        )
        .await
        .map(|_| ())
    }

    async fn prune_worktrees(&self, repo: &Path) -> Result<()> {
        self.run(repo, ["worktree", "prune"]).await.map(|_| ())
    }

    async fn list_worktrees(&self, repo: &Path) -> Result<Vec<WorktreeEntry>> {
        let out = self.run(repo, ["worktree", "list", "--porcelain"]).await?;
        Ok(parse_worktree_porcelain(&out))
    }

    async fn common_dir(&self, dir: &Path) -> Result<PathBuf> {
        let out = self
            .run(dir, ["rev-parse", "--git-common-dir"])
            .await
            .map_err(|_| Error::InvalidState(format!("not a git repository: {}", dir.display())))?;
        let path = PathBuf::from(out);
        let path = if path.is_absolute() { path } else { dir.join(path) };
        Ok(tokio::fs::canonicalize(&path).await?)
    }

    async fn clone_repository(&self, url: &str, dest: &Path, bare: bool) -> Result<()> {
        let parent = dest.parent().unwrap_or(dest);
        tokio::fs::create_dir_all(parent).await?;

        let mut args: Vec<&OsStr> = vec![OsStr::new("clone"), OsStr::new("--origin")];
        args.push(OsStr::new(&self.remote));
        if bare {
            args.push(OsStr::new("--bare"));
        }
        args.extend([OsStr::new(url), dest.as_os_str()]);
        self.run(parent, args).await?;

        if bare {
            // Bare clones map remote heads straight onto local heads; restore
            // remote-tracking refs so branch listing and default-branch
            // resolution behave as in a plain clone.
            let key = format!("remote.{}.fetch", self.remote);
            let refspec = format!("+refs/heads/*:refs/remotes/{}/*", self.remote);
            self.run(dest, ["config", key.as_str(), refspec.as_str()])
                .await?;
            self.run(dest, ["fetch", self.remote.as_str()]).await?;
            if let Err(e) = self
                .run(dest, ["remote", "set-head", self.remote.as_str(), "--auto"])
                .await
            {
                debug!(error = %e, "remote set-head failed");
            }
        }
        Ok(())
    }
}
