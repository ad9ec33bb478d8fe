//! Infrastructure implementation of the `CommandRunner` port.
//!
//! `TokioCommandRunner` runs hooks and the deploy command with
//! `tokio::process`. Children are spawned with `kill_on_drop(true)` and always
//! awaited, so an aborted run never leaves a process behind.

use std::process::{ExitStatus, Stdio};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::application::ports::CommandRunner;

/// Shell used for hook commands.
const SHELL: &str = "sh";

/// Production `CommandRunner` backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCommandRunner;

impl CommandRunner for TokioCommandRunner {
    async fn run_shell(&self, command: &str, envs: &[(&str, &str)]) -> Result<ExitStatus> {
        let mut child = tokio::process::Command::new(SHELL)
            .arg("-c")
            .arg(command)
            .envs(envs.iter().copied())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {SHELL} -c {command}"))?;

        child
            .wait()
            .await
            .with_context(|| format!("waiting for {command}"))
    }

    async fn run_streaming(
        &self,
        program: &str,
        args: &[&str],
        on_line: &mut dyn FnMut(&str),
    ) -> Result<ExitStatus> {
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines
                .next_line()
                .await
                .with_context(|| format!("reading output of {program}"))?
            {
                on_line(&line);
            }
        }

        child
            .wait()
            .await
            .with_context(|| format!("waiting for {program}"))
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
