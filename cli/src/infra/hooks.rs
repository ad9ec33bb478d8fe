//! Infrastructure implementation of the `HookRunner` port.

use tracing::{info, warn};

use crate::application::ports::{CommandRunner, HookOutcome, HookRunner};
use crate::domain::config::{Hook, HooksConfig};

/// Runs the configured hook commands through the shell.
#[derive(Debug, Clone)]
pub struct ShellHookRunner<R> {
    hooks: HooksConfig,
    runner: R,
}

impl<R: CommandRunner> ShellHookRunner<R> {
    #[must_use]
    pub fn new(hooks: HooksConfig, runner: R) -> Self {
        Self { hooks, runner }
    }
}

impl<R: CommandRunner> HookRunner for ShellHookRunner<R> {
    async fn run_hook(&self, hook: Hook, envs: &[(&str, &str)]) -> HookOutcome {
        let Some(command) = self.hooks.command(hook) else {
            return HookOutcome::NotConfigured;
        };
        info!(%hook, command, "running hook");

        match self.runner.run_shell(command, envs).await {
            Ok(status) if status.success() => HookOutcome::Succeeded,
            Ok(status) => {
                warn!(%hook, command, %status, "hook failed");
                HookOutcome::Failed {
                    reason: format!("`{command}` {status}"),
                }
            }
            Err(e) => {
                let reason = format!("{e:#}");
                warn!(%hook, command, %reason, "hook could not run");
                HookOutcome::Failed { reason }
            }
        }
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
