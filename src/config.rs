use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::fs;

use crate::error::{Error, Result};

pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_MAX_DEPTH: usize = 4;

/// Optional `config.toml` contents. Every field may be omitted.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ConfigFile {
    pub root: Option<PathBuf>,
    pub worktrees: Option<PathBuf>,
    pub remote: Option<String>,
    pub max_depth: Option<usize>,
    pub bare: Option<bool>,
    pub picker: Option<String>,
    pub zellij: Option<String>,
}

impl ConfigFile {
    /// Default location: `<config dir>/zz/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("zz").join("config.toml"))
    }

    pub async fn load(path: &Path) -> Result<Option<Self>> {
        let content = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let cfg = toml::from_str::<Self>(&content)?;
        Ok(Some(cfg))
    }
}

/// Values given on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub root: Option<PathBuf>,
    pub worktrees: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

/// Resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Registry root holding the cloned repositories.
    pub root: PathBuf,
    /// Base directory for branch worktrees.
    pub worktree_root: PathBuf,
    pub remote: String,
    pub max_depth: usize,
    /// Clone new repositories bare (`zz get`).
    pub bare: bool,
    pub picker: String,
    pub zellij: String,
}

impl Config {
    /// Merge overrides > config file > defaults.
    pub fn resolve(overrides: Overrides, file: Option<ConfigFile>) -> Result<Self> {
        let file = file.unwrap_or_default();
        let home =
            dirs::home_dir().ok_or_else(|| Error::config("Cannot determine home directory"))?;

        let root = overrides
            .root
            .or(file.root)
            .map(|p| expand_home(&p, &home))
            .unwrap_or_else(|| home.join("src"));
        let worktree_root = overrides
            .worktrees
            .or(file.worktrees)
            .map(|p| expand_home(&p, &home))
            .unwrap_or_else(|| home.join("worktrees"));

        if root == worktree_root {
            return Err(Error::config(format!(
                "repository root and worktree root must differ: {}",
                root.display()
            )));
        }

        Ok(Self {
            root,
            worktree_root,
            remote: file.remote.unwrap_or_else(|| DEFAULT_REMOTE.to_string()),
            max_depth: file.max_depth.unwrap_or(DEFAULT_MAX_DEPTH).max(1),
            bare: file.bare.unwrap_or(true),
            picker: file.picker.unwrap_or_else(|| "fzf".to_string()),
            zellij: file.zellij.unwrap_or_else(|| "zellij".to_string()),
        })
    }

    pub async fn load(overrides: Overrides) -> Result<Self> {
        let path = overrides.config.clone().or_else(ConfigFile::default_path);
        let file = match path {
            Some(p) => ConfigFile::load(&p).await?,
            None => None,
        };
        Self::resolve(overrides, file)
    }

    /// Create both roots if they are missing.
    pub async fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        fs::create_dir_all(&self.worktree_root).await?;
        Ok(())
    }
}

fn expand_home(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// Process-wide state captured once at startup and passed to every component.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: Config,
    /// Name of the zellij session this process runs in, if any.
    pub current_session: Option<String>,
    /// Whether a human can answer an interactive picker.
    pub interactive: bool,
}

impl Context {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            current_session: None,
            interactive: false,
        }
    }

    /// Read the ambient signals from the process environment.
    pub fn from_env(config: Config) -> Self {
        let current_session = std::env::var("ZELLIJ_SESSION_NAME")
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| std::env::var("ZELLIJ").ok().map(|_| "unknown".to_string()));
        Self {
            config,
            current_session,
            interactive: std::io::stdin().is_terminal() && std::io::stderr().is_terminal(),
        }
    }
}
