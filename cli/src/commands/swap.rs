//! `tsuru-bluegreen swap` — move live traffic to the idle slot.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::slots;
use crate::application::services::swap::{self as service, AbortReason, SwapOutcome, SwapPlan};
use crate::output::OutputContext;

/// Run `tsuru-bluegreen swap`. Returns the process exit code.
///
/// # Errors
///
/// Returns an error if the control plane is unreachable.
pub async fn run(app: &AppContext) -> Result<i32> {
    let roles = slots::resolve(&app.client, &app.slot_pair()).await?;
    let plan = SwapPlan {
        live: &roles.live,
        idle: &roles.idle,
        policy: app.settings.app.retry_policy(),
    };
    let outcome = service::deploy_swap(
        &app.client,
        &app.hooks,
        &app.notifier,
        &app.terminal_reporter(),
        &plan,
    )
    .await?;

    print_outcome(&outcome, &roles.live, &roles.idle, &app.output);
    Ok(outcome.exit_code())
}

fn print_outcome(outcome: &SwapOutcome, live: &str, idle: &str, ctx: &OutputContext) {
    match outcome {
        SwapOutcome::Completed { tag, .. } => {
            ctx.kv("Live", idle);
            if let Some(tag) = tag {
                ctx.kv("Tag", tag);
            }
        }
        SwapOutcome::Aborted { reason } => {
            let why = match reason {
                AbortReason::BeforeHook(reason) => format!("before_swap hook failed: {reason}"),
                AbortReason::ScaleUp(processes) => {
                    format!("could not scale up {}", processes.join(", "))
                }
            };
            ctx.error(&format!("swap aborted, {live} is still live ({why})"));
        }
        SwapOutcome::RolledBack { cutover, restored } => {
            ctx.error(&format!("swap {cutover}, {live} is still live"));
            if !restored {
                ctx.error(&format!("{idle} may not be at its previous size"));
            }
        }
    }
}
