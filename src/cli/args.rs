use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "zz")]
#[command(
    version,
    about = "Open git repositories and branches as zellij sessions on dedicated worktrees",
    long_about = None
)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Args {
    /// Repository registry root
    #[arg(long, global = true, env = "ZZ_ROOT")]
    pub root: Option<PathBuf>,

    /// Base directory for branch worktrees
    #[arg(long, global = true, env = "ZZ_WORKTREES")]
    pub worktrees: Option<PathBuf>,

    /// Config file (default: <config dir>/zz/config.toml)
    #[arg(long, global = true, env = "ZZ_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub open: OpenArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Default command: select a repository and open its session.
#[derive(clap::Args, Debug, Default)]
pub struct OpenArgs {
    /// Filter query
    pub query: Vec<String>,

    /// Only offer repositories with a running or exited session
    #[arg(short, long)]
    pub sessions: bool,

    /// Branch to open (default: the remote's default branch)
    #[arg(short, long)]
    pub branch: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open a branch of the current repository in its own worktree
    #[command(visible_alias = "co")]
    Checkout {
        /// Existing local or remote branch
        branch: Option<String>,

        /// Create a new branch from HEAD
        #[arg(short = 'b', long = "create", value_name = "NAME", conflicts_with = "branch")]
        create: Option<String>,
    },

    /// Create a branch and open it (same as `checkout -b`)
    New {
        /// Branch name
        name: String,
    },

    /// Clone a repository into the registry and open it
    Get {
        /// Remote URL (https, ssh or git@host:path)
        url: String,
    },

    /// Print repositories matching a query
    Query {
        /// Filter query
        query: Vec<String>,
    },

    /// List repositories and managed sessions
    #[command(visible_alias = "ls")]
    List {
        /// Managed sessions only
        #[arg(short, long)]
        sessions: bool,

        /// Repositories and sessions
        #[arg(short, long, conflicts_with = "sessions")]
        all: bool,
    },

    /// Kill a managed session
    #[command(visible_alias = "d")]
    Delete {
        /// Filter query
        query: Vec<String>,

        /// Kill every managed session
        #[arg(short, long)]
        all: bool,
    },

    /// Remove branch worktrees of the current repository
    Prune {
        /// Remove every worktree except the current one
        #[arg(short, long)]
        all: bool,
    },
}
