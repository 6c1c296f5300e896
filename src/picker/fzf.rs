use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::Picker;
use crate::error::{Error, Result};

/// Interactive picker backed by `fzf`.
#[derive(Debug, Clone)]
pub struct Fzf {
    program: String,
}

impl Fzf {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn fzf_cmd(&self, query: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["--height", "40%", "--reverse", "--no-multi"]);
        if !query.is_empty() {
            // Skip the UI when the query already pins down one candidate.
            cmd.args(["--query", query, "--select-1", "--exit-0"]);
        }
        cmd
    }
}

impl Default for Fzf {
    fn default() -> Self {
        Self::new("fzf")
    }
}

#[async_trait]
impl Picker for Fzf {
    async fn pick(&self, candidates: &[String], query: &str) -> Result<Option<String>> {
        if candidates.is_empty() {
            return Ok(None);
        }

        let mut cmd = self.fzf_cmd(query.trim());
        cmd.stdin(Stdio::piped()).stdout(Stdio::piped());
        debug!(?cmd, "fzf");

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::picker(format!("failed to start {}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            let input = candidates.join("\n");
            stdin.write_all(input.as_bytes()).await?;
            // Dropping stdin closes the pipe so fzf sees EOF.
        }

        let output = child.wait_with_output().await?;
        match output.status.code() {
            Some(0) => {
                let selected = String::from_utf8_lossy(&output.stdout).trim().to_string();
                Ok((!selected.is_empty()).then_some(selected))
            }
            // 1: no match, 130: interrupted.
            Some(1) | Some(130) | None => Ok(None),
            Some(code) => Err(Error::picker(format!("{} exited with {code}", self.program))),
        }
    }
}
