//! Application service — capacity reconciliation.
//!
//! Moves the unit counts of one app to a desired map, one scale call per
//! differing process type. Every call is verified by re-reading the counts;
//! an HTTP 200 alone is never trusted.
//!
//! Adds are fail-fast. Removes are retried according to the [`RetryPolicy`],
//! recomputing the delta from fresh counts before each retry. A failed remove
//! may leave the app locked, so the lock is released before a retry unless
//! operations are still running on the app.

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::application::ports::ControlPlane;
use crate::domain::capacity::{self, RetryPolicy, ScaleDirection, ScaleStep, UnitCounts};

/// Result of reconciling one process type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    pub process: String,
    pub direction: ScaleDirection,
    /// Count the process type had to reach.
    pub target: u32,
    /// Scale calls issued for this process type.
    pub attempts: u32,
    pub converged: bool,
}

/// Per-process results of one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub results: Vec<ProcessResult>,
}

impl ReconcileReport {
    /// `true` when every process type reached its target (vacuously true when
    /// nothing had to change).
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.results.iter().all(|r| r.converged)
    }

    /// Process types that did not reach their target.
    #[must_use]
    pub fn failed(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| !r.converged)
            .map(|r| r.process.as_str())
            .collect()
    }
}

/// Bring `app` to the `desired` unit counts.
///
/// Process types absent from `desired` are left untouched; process types
/// absent on the app count as zero. All process types are attempted even when
/// an earlier one fails.
///
/// # Errors
///
/// Returns an error only on transport failure of a scale call.
pub async fn reconcile(
    cp: &impl ControlPlane,
    app: &str,
    desired: &UnitCounts,
    policy: &RetryPolicy,
) -> Result<ReconcileReport> {
    let current = cp.unit_counts(app).await;
    apply(cp, app, &current, desired, policy).await
}

/// Cap every process type of `app` at `keep` units.
///
/// # Errors
///
/// Returns an error only on transport failure of a scale call.
pub async fn scale_down_to(
    cp: &impl ControlPlane,
    app: &str,
    keep: u32,
    policy: &RetryPolicy,
) -> Result<ReconcileReport> {
    let current = cp.unit_counts(app).await;
    let desired = capacity::capped(&current, keep);
    apply(cp, app, &current, &desired, policy).await
}

async fn apply(
    cp: &impl ControlPlane,
    app: &str,
    current: &UnitCounts,
    desired: &UnitCounts,
    policy: &RetryPolicy,
) -> Result<ReconcileReport> {
    let steps = capacity::plan_changes(current, desired);
    if steps.is_empty() {
        debug!(app, "unit counts already match");
        return Ok(ReconcileReport::default());
    }

    let mut report = ReconcileReport::default();
    for step in steps {
        let result = match step.direction {
            ScaleDirection::Add => add_units(cp, app, &step).await?,
            ScaleDirection::Remove => remove_units(cp, app, &step, policy).await?,
        };
        report.results.push(result);
    }
    Ok(report)
}

async fn current_count(cp: &impl ControlPlane, app: &str, process: &str) -> u32 {
    cp.unit_counts(app).await.get(process).copied().unwrap_or(0)
}

/// Release a lock left behind by a failed scale call. Never fails the retry:
/// a rejected unlock usually means no lock was held.
async fn release_stale_lock(cp: &impl ControlPlane, app: &str) -> Result<()> {
    if cp.has_running_events(app).await? {
        debug!(app, "operations running, keeping lock");
        return Ok(());
    }
    let outcome = cp.remove_lock(app).await?;
    if outcome.is_applied() {
        info!(app, "released stale lock");
    } else {
        debug!(app, %outcome, "no lock released");
    }
    Ok(())
}

/// One add call, no retry. A silent double add would over-provision.
async fn add_units(cp: &impl ControlPlane, app: &str, step: &ScaleStep) -> Result<ProcessResult> {
    let process = step.process.as_str();
    info!(app, process, units = step.units, "adding units");

    let outcome = cp
        .scale_units(app, process, step.units, ScaleDirection::Add)
        .await?;
    let converged = if outcome.is_applied() {
        let have = current_count(cp, app, process).await;
        if have != step.target {
            warn!(app, process, have, want = step.target, "unit count mismatch after add");
        }
        have == step.target
    } else {
        warn!(app, process, %outcome, "adding units failed");
        false
    };

    Ok(ProcessResult {
        process: step.process.clone(),
        direction: ScaleDirection::Add,
        target: step.target,
        attempts: 1,
        converged,
    })
}

/// Remove call with bounded retry: at most `policy.total_attempts()` calls.
async fn remove_units(
    cp: &impl ControlPlane,
    app: &str,
    step: &ScaleStep,
    policy: &RetryPolicy,
) -> Result<ProcessResult> {
    let process = step.process.as_str();
    let mut result = ProcessResult {
        process: step.process.clone(),
        direction: ScaleDirection::Remove,
        target: step.target,
        attempts: 0,
        converged: false,
    };
    let mut units = step.units;

    for attempt in 0..policy.total_attempts() {
        if attempt > 0 {
            tokio::time::sleep(policy.backoff).await;
            release_stale_lock(cp, app).await?;
            let have = current_count(cp, app, process).await;
            match capacity::step_for(process, have, step.target) {
                None => {
                    debug!(app, process, "units already removed");
                    result.converged = true;
                    return Ok(result);
                }
                Some(next) if next.direction == ScaleDirection::Remove => units = next.units,
                Some(_) => {
                    warn!(app, process, have, want = step.target, "fewer units than expected");
                    return Ok(result);
                }
            }
            info!(app, process, units, attempt, "retrying unit removal");
        } else {
            info!(app, process, units, "removing units");
        }

        result.attempts += 1;
        let outcome = cp
            .scale_units(app, process, units, ScaleDirection::Remove)
            .await?;
        if !outcome.is_applied() {
            warn!(app, process, %outcome, "removing units failed");
            continue;
        }
        let have = current_count(cp, app, process).await;
        if have == step.target {
            result.converged = true;
            return Ok(result);
        }
        warn!(app, process, have, want = step.target, "unit count mismatch after remove");
    }

    warn!(app, process, attempts = result.attempts, "giving up on unit removal");
    Ok(result)
}
