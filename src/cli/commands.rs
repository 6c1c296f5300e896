use std::collections::HashMap;
use std::path::Path;

use tokio::process::Command as TokioCommand;
use tracing::debug;

use crate::cli::{Args, Command, OpenArgs};
use crate::config::{Config, Context, Overrides};
use crate::error::Result;
use crate::flow::{
    BulkReport, CheckoutOutcome, CheckoutTarget, ListScope, OpenOptions, Opened, SelectionFlow,
};

pub async fn run_cli(args: Args) -> Result<()> {
    let overrides = Overrides {
        root: args.root,
        worktrees: args.worktrees,
        config: args.config,
    };
    let config = Config::load(overrides).await?;
    config.ensure_dirs().await?;

    let ctx = Context::from_env(config);
    debug!(
        root = %ctx.config.root.display(),
        worktrees = %ctx.config.worktree_root.display(),
        session = ?ctx.current_session,
        interactive = ctx.interactive,
        "context"
    );
    let flow = SelectionFlow::from_context(&ctx);

    match args.command {
        Some(Command::Checkout { branch, create }) => {
            let target = match (branch, create) {
                (_, Some(name)) => CheckoutTarget::Create(name),
                (Some(b), None) => CheckoutTarget::Existing(b),
                (None, None) => CheckoutTarget::Pick,
            };
            handle_checkout(&flow, target).await
        }

        Some(Command::New { name }) => handle_checkout(&flow, CheckoutTarget::Create(name)).await,

        Some(Command::Get { url }) => {
            let opened = flow.get(&url).await?;
            report_opened(&opened);
            Ok(())
        }

        Some(Command::Query { query }) => {
            for line in flow.query(&query.join(" "))? {
                println!("{}", line);
            }
            Ok(())
        }

        Some(Command::List { sessions, all }) => {
            let scope = if all {
                ListScope::All
            } else if sessions {
                ListScope::Sessions
            } else {
                ListScope::Repositories
            };
            handle_list(&flow, scope).await
        }

        Some(Command::Delete { query, all }) => {
            let report = flow.select_and_delete(&query.join(" "), all).await?;
            finish_bulk("Killed", report)
        }

        Some(Command::Prune { all }) => {
            let cwd = std::env::current_dir()?;
            let report = flow.prune(&cwd, all).await?;
            finish_bulk("Removed", report)
        }

        None => handle_open(&flow, args.open).await,
    }
}

async fn handle_open(flow: &SelectionFlow, open: OpenArgs) -> Result<()> {
    let opts = OpenOptions {
        sessions_only: open.sessions,
        branch: open.branch,
    };
    let opened = flow.select_and_open(&open.query.join(" "), opts).await?;
    report_opened(&opened);
    Ok(())
}

// stdout is reserved for `query` and `ls` output.
fn report_opened(opened: &Opened) {
    eprintln!("✓ {} ({})", opened.repo, opened.dir.display());
}

async fn handle_checkout(flow: &SelectionFlow, target: CheckoutTarget) -> Result<()> {
    let cwd = std::env::current_dir()?;
    match flow.checkout(&cwd, target).await? {
        CheckoutOutcome::Tab(dir) => {
            println!("✓ Opened tab {}", dir.display());
            Ok(())
        }
        CheckoutOutcome::Shell(dir) => spawn_shell(&dir).await,
    }
}

/// Outside zellij there is no tab to open; drop into a shell instead.
async fn spawn_shell(dir: &Path) -> Result<()> {
    let shell = std::env::var("SHELL")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "/bin/sh".to_string());
    eprintln!("Entering {} (exit the shell to return)", dir.display());

    let status = TokioCommand::new(&shell).current_dir(dir).status().await?;
    debug!(shell = %shell, code = ?status.code(), "shell exited");
    Ok(())
}

async fn handle_list(flow: &SelectionFlow, scope: ListScope) -> Result<()> {
    let listing = flow.list(scope).await?;

    let mut by_repo = HashMap::new();
    let mut orphans = Vec::new();
    for (info, repo) in &listing.sessions {
        match repo {
            Some(r) => {
                by_repo.insert(r.clone(), info.status);
            }
            None => orphans.push(info),
        }
    }

    for repo in &listing.repositories {
        match by_repo.get(repo) {
            Some(status) => println!("{} {}", status.marker(), repo),
            None if scope == ListScope::All => println!("  {}", repo),
            None => println!("{}", repo),
        }
    }

    if scope == ListScope::Sessions {
        for (info, repo) in &listing.sessions {
            match repo {
                Some(r) => println!("{} {}", info.status.marker(), r),
                None => println!("{} {}", info.status.marker(), info.name),
            }
        }
    } else {
        for info in orphans {
            println!("{} {}", info.status.marker(), info.name);
        }
    }
    Ok(())
}

fn finish_bulk(verb: &str, report: BulkReport) -> Result<()> {
    for item in &report.succeeded {
        println!("✓ {} {}", verb, item);
    }
    for (item, err) in &report.failed {
        eprintln!("✗ {}: {}", item, err);
    }
    report.into_result()
}
