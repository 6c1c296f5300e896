use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Git error: {0}")]
    Git(String),

    #[error("Zellij error: {0}")]
    Zellij(String),

    #[error("Picker error: {0}")]
    Picker(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No match{}", query_suffix(.0))]
    NoMatch(Option<String>),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid repository identifier: {0}")]
    InvalidRepository(String),

    #[error("Invalid session identifier: {0}")]
    InvalidSessionId(String),

    #[error("Already inside a session; detach first (current session: {0})")]
    AlreadyInSession(String),

    #[error("Not inside a session")]
    NotInsideSession,

    #[error("Branch not found: {0}")]
    BranchNotFound(String),

    #[error("Branch already exists: {0}")]
    BranchExists(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Failed to create worktree at {path}: {reason}")]
    WorktreeCreationFailed { path: String, reason: String },

    #[error("Failed to create session {name}: {reason}")]
    SessionCreationFailed { name: String, reason: String },

    #[error("{failed} of {total} operations failed")]
    Partial { failed: usize, total: usize },
}

fn query_suffix(query: &Option<String>) -> String {
    match query {
        Some(q) if !q.is_empty() => format!(" for '{q}'"),
        _ => String::new(),
    }
}

impl Error {
    pub fn git(msg: impl Into<String>) -> Self {
        Self::Git(msg.into())
    }

    pub fn zellij(msg: impl Into<String>) -> Self {
        Self::Zellij(msg.into())
    }

    pub fn picker(msg: impl Into<String>) -> Self {
        Self::Picker(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn no_match(query: &str) -> Self {
        let q = query.trim();
        Self::NoMatch((!q.is_empty()).then(|| q.to_string()))
    }
}

/// Fold subprocess stderr into one line for diagnostics.
pub(crate) fn one_line(s: &str) -> String {
    s.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}
