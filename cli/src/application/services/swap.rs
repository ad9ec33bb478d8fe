//! Application service — traffic swap use-case.
//!
//! Drives the [`SwapMachine`] through scale-up, cutover, and scale-down:
//!
//! 1. read the deploy tag recorded on the idle slot
//! 2. `before_swap` hook (abort on failure)
//! 3. size the idle slot to the live slot's capacity (abort on failure)
//! 4. atomic swap of the traffic bindings, attempted once
//! 5. tear the old live slot down to zero units
//! 6. notifications, then the `after_swap` hook (both advisory)
//!
//! The live slot is never touched before the cutover succeeds. When the
//! cutover fails the idle slot is scaled back to its previous size, keeping at
//! least one unit per process type.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::application::ports::{
    ControlPlane, HookOutcome, HookRunner, Notifier, Outcome, ProgressReporter,
};
use crate::application::services::reconcile::{self, ReconcileReport};
use crate::application::services::{EXIT_ABORTED, TAG_ENV};
use crate::domain::capacity::{self, RetryPolicy, UnitCounts};
use crate::domain::config::Hook;
use crate::domain::swap::{SwapMachine, SwapPhase};

/// Slots and retry budget for one swap run.
#[derive(Debug, Clone)]
pub struct SwapPlan<'a> {
    /// Slot currently taking traffic.
    pub live: &'a str,
    /// Slot receiving traffic after the swap.
    pub idle: &'a str,
    pub policy: RetryPolicy,
}

/// Which notifications were delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Notifications {
    pub newrelic: bool,
    pub grafana: bool,
    pub webhook: bool,
}

/// Why a swap stopped before traffic moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// The `before_swap` hook failed.
    BeforeHook(String),
    /// These process types could not be scaled up on the idle slot.
    ScaleUp(Vec<String>),
}

/// Outcome of the `deploy_swap` use-case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapOutcome {
    /// Traffic moved to the idle slot.
    Completed {
        tag: Option<String>,
        /// Whether the old live slot reached zero units.
        scaled_down: bool,
        notifications: Notifications,
        after_hook: HookOutcome,
    },
    /// Stopped before the cutover; the live slot was not touched.
    Aborted { reason: AbortReason },
    /// The cutover was rejected; the idle slot was scaled back.
    RolledBack {
        cutover: Outcome,
        /// Whether the idle slot reached its previous size again.
        restored: bool,
    },
}

impl SwapOutcome {
    /// Terminal phase of the state machine for this outcome.
    #[must_use]
    pub fn phase(&self) -> SwapPhase {
        match self {
            Self::Completed { .. } => SwapPhase::Done,
            Self::Aborted { .. } => SwapPhase::Aborted,
            Self::RolledBack { .. } => SwapPhase::RolledBack,
        }
    }

    /// `0` when traffic moved, [`EXIT_ABORTED`] otherwise. A failing
    /// `after_swap` hook does not change the exit code.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed { .. } => 0,
            Self::Aborted { .. } | Self::RolledBack { .. } => EXIT_ABORTED,
        }
    }
}

/// Swap live traffic from `plan.live` to `plan.idle`.
///
/// # Errors
///
/// Returns an error on transport failures of the tag lookup, the scale-up,
/// or the cutover call, and on an illegal phase transition. Rejected calls
/// are reported through [`SwapOutcome`].
pub async fn deploy_swap(
    cp: &impl ControlPlane,
    hooks: &impl HookRunner,
    notifier: &impl Notifier,
    reporter: &impl ProgressReporter,
    plan: &SwapPlan<'_>,
) -> Result<SwapOutcome> {
    let SwapPlan { live, idle, policy } = *plan;
    let mut machine = SwapMachine::new();

    // Step 1: deploy tag recorded by `pre`.
    let tag = cp
        .get_env(idle, TAG_ENV)
        .await
        .with_context(|| format!("reading {TAG_ENV} of {idle}"))?;
    if tag.is_none() {
        reporter.warn(&format!("no {TAG_ENV} recorded on {idle}"));
    }
    let tag_value = tag.clone().unwrap_or_default();
    let envs = [(TAG_ENV, tag_value.as_str())];

    // Step 2: before_swap hook.
    if let HookOutcome::Failed { reason } = hooks.run_hook(Hook::BeforeSwap, &envs).await {
        reporter.warn(&format!("before_swap hook failed: {reason}"));
        machine.advance(SwapPhase::Aborted)?;
        return Ok(SwapOutcome::Aborted {
            reason: AbortReason::BeforeHook(reason),
        });
    }

    // Step 3: idle slot takes the live slot's capacity.
    machine.advance(SwapPhase::ScalingUp)?;
    let live_units = cp.unit_counts(live).await;
    let idle_before = cp.unit_counts(idle).await;
    if capacity::total(&live_units) == 0 {
        warn!(live, "live slot reports no units");
    }
    reporter.step(&format!("scaling {idle} to match {live}..."));
    let scale_up = reconcile::reconcile(cp, idle, &live_units, &policy)
        .await
        .with_context(|| format!("scaling up {idle}"))?;
    if !scale_up.is_success() {
        let failed: Vec<String> = scale_up.failed().into_iter().map(str::to_owned).collect();
        reporter.warn(&format!(
            "could not scale up {idle} ({}). Traffic stays on {live}.",
            failed.join(", ")
        ));
        machine.advance(SwapPhase::Aborted)?;
        return Ok(SwapOutcome::Aborted {
            reason: AbortReason::ScaleUp(failed),
        });
    }

    // Step 4: atomic cutover.
    machine.advance(SwapPhase::Swapping)?;
    reporter.step(&format!("changing live application to {idle}..."));
    let cutover = cp
        .swap(live, idle, false)
        .await
        .with_context(|| format!("swapping {live} and {idle}"))?;
    if !cutover.is_applied() {
        reporter.warn(&format!("swap {cutover}. Scaling {idle} back..."));
        let restore = restore_target(&idle_before, &live_units);
        let restored = report_ok(
            reconcile::reconcile(cp, idle, &restore, &policy).await,
            idle,
            "scale back",
        );
        if !restored {
            reporter.warn(&format!("could not scale {idle} back to its previous size"));
        }
        machine.advance(SwapPhase::RolledBack)?;
        return Ok(SwapOutcome::RolledBack { cutover, restored });
    }
    reporter.success(&format!("{idle} is live"));

    // Step 5: tear down the old live slot.
    machine.advance(SwapPhase::ScalingDown)?;
    reporter.step(&format!("removing units of {live}..."));
    let scaled_down = report_ok(
        reconcile::scale_down_to(cp, live, 0, &policy).await,
        live,
        "scale down",
    );
    if !scaled_down {
        reporter.warn(&format!("could not remove all units of {live}"));
    }
    machine.advance(SwapPhase::Done)?;
    info!(live = idle, previous = live, tag = %tag_value, "swap completed");

    // Step 6: notifications, best-effort.
    let notifications = Notifications {
        newrelic: notifier.notify_newrelic(&tag_value).await,
        grafana: notifier.notify_grafana(idle, &tag_value).await,
        webhook: notifier.run_webhook(&tag_value).await,
    };

    // Step 7: after_swap hook, advisory.
    let after_hook = hooks.run_hook(Hook::AfterSwap, &envs).await;
    if let HookOutcome::Failed { reason } = &after_hook {
        reporter.warn(&format!("after_swap hook failed: {reason}"));
    }

    Ok(SwapOutcome::Completed {
        tag,
        scaled_down,
        notifications,
        after_hook,
    })
}

/// Pre-scale-up size of every process type touched by the scale-up, with at
/// least one unit each.
fn restore_target(before: &UnitCounts, scaled: &UnitCounts) -> UnitCounts {
    let previous: UnitCounts = scaled
        .keys()
        .map(|process| (process.clone(), before.get(process).copied().unwrap_or(0)))
        .collect();
    capacity::floored(&previous, 1)
}

/// Compensating and teardown steps never fail the run: transport errors are
/// logged and count as not converged.
fn report_ok(result: Result<ReconcileReport>, app: &str, action: &str) -> bool {
    match result {
        Ok(report) => report.is_success(),
        Err(e) => {
            let error = format!("{e:#}");
            warn!(app, action, %error, "reconcile failed");
            false
        }
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
