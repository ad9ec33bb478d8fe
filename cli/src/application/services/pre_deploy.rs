//! Application service — pre-deploy use-case.
//!
//! Prepares the idle slot and ships new code to it:
//!
//! 1. scale the idle slot down to `keep_units` per process type
//! 2. record the deploy tag in the slot's environment
//! 3. `before_pre` hook (abort on failure)
//! 4. deploy, streaming the deploy output line by line
//! 5. `after_pre` hook (advisory)

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::application::ports::{
    CodeDeployer, ControlPlane, HookOutcome, HookRunner, ProgressReporter,
};
use crate::application::services::{EXIT_ABORTED, TAG_ENV, reconcile};
use crate::domain::capacity::RetryPolicy;
use crate::domain::config::{DeployMode, Hook};

/// Inputs of one pre-deploy run.
#[derive(Debug, Clone)]
pub struct PrePlan<'a> {
    /// Slot receiving the new code.
    pub idle: &'a str,
    /// Git reference to deploy.
    pub tag: &'a str,
    pub mode: &'a DeployMode,
    /// Units per process type kept on the idle slot during the deploy.
    pub keep_units: u32,
    pub policy: RetryPolicy,
}

/// Outcome of the `deploy_pre` use-case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreOutcome {
    /// The `before_pre` hook failed; nothing was deployed.
    Aborted { reason: String },
    /// The deploy process ran.
    Deployed {
        /// Exit code of the deploy process.
        exit_code: i32,
        /// Whether the idle slot reached the minimal footprint.
        scaled_down: bool,
        /// Whether the tag was stored on the slot.
        tag_saved: bool,
        after_hook: HookOutcome,
    },
}

impl PreOutcome {
    /// The deploy process's exit code, or [`EXIT_ABORTED`]. A failing
    /// `after_pre` hook does not override a successful deploy.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Aborted { .. } => EXIT_ABORTED,
            Self::Deployed { exit_code, .. } => *exit_code,
        }
    }
}

/// Deploy `plan.tag` to the idle slot.
///
/// # Errors
///
/// Returns an error on transport failures of the control plane or when the
/// deploy process cannot be started.
pub async fn deploy_pre(
    cp: &impl ControlPlane,
    hooks: &impl HookRunner,
    deployer: &impl CodeDeployer,
    reporter: &impl ProgressReporter,
    plan: &PrePlan<'_>,
) -> Result<PreOutcome> {
    let PrePlan {
        idle,
        tag,
        mode,
        keep_units,
        policy,
    } = *plan;

    reporter.step(&format!("pre deploying tag {tag} to {idle}..."));

    // Step 1: minimal footprint while the new code goes out.
    let scaled_down = reconcile::scale_down_to(cp, idle, keep_units, &policy)
        .await
        .with_context(|| format!("scaling down {idle}"))?
        .is_success();
    if !scaled_down {
        reporter.warn(&format!("could not scale {idle} down to {keep_units} unit(s)"));
    }

    // Step 2: remember which tag the slot runs.
    let saved = cp
        .set_env(idle, TAG_ENV, tag)
        .await
        .with_context(|| format!("setting {TAG_ENV} on {idle}"))?;
    let tag_saved = saved.is_applied();
    if !tag_saved {
        reporter.warn(&format!("could not record {TAG_ENV} on {idle}: {saved}"));
    }

    let envs = [(TAG_ENV, tag)];

    // Step 3: before_pre hook.
    if let HookOutcome::Failed { reason } = hooks.run_hook(Hook::BeforePre, &envs).await {
        reporter.warn(&format!("before_pre hook failed: {reason}"));
        return Ok(PreOutcome::Aborted { reason });
    }

    // Step 4: deploy.
    let exit_code = deployer
        .deploy(idle, tag, mode, &mut |line: &str| reporter.passthrough(line))
        .await
        .with_context(|| format!("deploying {tag} to {idle}"))?;
    if exit_code == 0 {
        info!(app = idle, tag, "deploy finished");
        reporter.success(&format!("{tag} deployed to {idle}"));
    } else {
        warn!(app = idle, tag, exit_code, "deploy failed");
        reporter.warn(&format!("deploy exited with code {exit_code}"));
    }

    // Step 5: after_pre hook, advisory.
    let after_hook = hooks.run_hook(Hook::AfterPre, &envs).await;
    if let HookOutcome::Failed { reason } = &after_hook {
        reporter.warn(&format!("after_pre hook failed: {reason}"));
    }

    Ok(PreOutcome::Deployed {
        exit_code,
        scaled_down,
        tag_saved,
        after_hook,
    })
}
