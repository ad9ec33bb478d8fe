//! Infrastructure implementation of the `CodeDeployer` port.

use std::process::ExitStatus;

use anyhow::Result;
use tracing::info;

use crate::application::ports::{CodeDeployer, CommandRunner};
use crate::domain::config::DeployMode;

/// Ships code with `git push` or `tsuru app-deploy`.
#[derive(Debug, Clone)]
pub struct PaasDeployer<R> {
    runner: R,
}

impl<R: CommandRunner> PaasDeployer<R> {
    #[must_use]
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

/// Program and arguments deploying `tag` to `app`.
#[must_use]
pub fn deploy_command(app: &str, tag: &str, mode: &DeployMode) -> (&'static str, Vec<String>) {
    match mode {
        DeployMode::GitPush => ("git", vec!["push".into(), app.into(), format!("{tag}:master")]),
        DeployMode::Package { dir } => (
            "tsuru",
            vec!["app-deploy".into(), "-a".into(), app.into(), dir.clone()],
        ),
    }
}

impl<R: CommandRunner> CodeDeployer for PaasDeployer<R> {
    async fn deploy(
        &self,
        app: &str,
        tag: &str,
        mode: &DeployMode,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<i32> {
        let (program, args) = deploy_command(app, tag, mode);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        info!(program, ?args, "deploying");

        let status = self.runner.run_streaming(program, &args, on_line).await?;
        Ok(exit_code(status))
    }
}

/// Shell convention: `128 + signal` for a child killed by a signal.
fn exit_code(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    status.code().unwrap_or(1)
}

// ── Unit tests ───────────────────────────────────────────────────────────────
