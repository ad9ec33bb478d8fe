//! `tsuru-bluegreen pre` — deploy a tag to the idle slot.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::HookOutcome;
use crate::application::services::pre_deploy::{self as service, PreOutcome, PrePlan};
use crate::application::services::slots;

/// Arguments for the pre command.
#[derive(Args, Debug)]
pub struct PreArgs {
    /// Git reference to deploy
    #[arg(short, long, default_value = "master")]
    pub tag: String,
}

/// Run `tsuru-bluegreen pre`. Returns the process exit code.
///
/// # Errors
///
/// Returns an error if the control plane is unreachable or the deploy
/// command cannot be started.
pub async fn run(args: &PreArgs, app: &AppContext) -> Result<i32> {
    let roles = slots::resolve(&app.client, &app.slot_pair()).await?;
    let ctx = &app.output;
    ctx.kv("Live", &roles.live);
    ctx.kv("Idle", &roles.idle);

    let mode = app.settings.app.deploy_mode();
    let plan = PrePlan {
        idle: &roles.idle,
        tag: &args.tag,
        mode: &mode,
        keep_units: app.settings.app.application.keep_units,
        policy: app.settings.app.retry_policy(),
    };
    let outcome = service::deploy_pre(
        &app.client,
        &app.hooks,
        &app.deployer,
        &app.terminal_reporter(),
        &plan,
    )
    .await?;

    if let PreOutcome::Deployed {
        exit_code: 0,
        after_hook: HookOutcome::Succeeded | HookOutcome::NotConfigured,
        ..
    } = &outcome
    {
        ctx.kv("Next", "tsuru-bluegreen swap");
    }
    Ok(outcome.exit_code())
}
