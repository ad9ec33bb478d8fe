//! Capacity planning — unit counts, scale steps, and the retry policy.
//!
//! Pure functions only: no I/O, no async. The reconciler in
//! `application::services::reconcile` turns these plans into control-plane
//! calls.

use std::collections::BTreeMap;
use std::time::Duration;

/// Running units per process type (`"web"`, `"worker"`, ...) for one slot.
///
/// Ordered so scale calls are issued in a stable order.
pub type UnitCounts = BTreeMap<String, u32>;

/// Default number of retries for a failed unit removal.
pub const DEFAULT_RETRY_TIMES: u32 = 3;

/// Default pause between two removal attempts.
pub const DEFAULT_RETRY_SLEEP: Duration = Duration::from_secs(5);

// ── Scale steps ──────────────────────────────────────────────────────────────

/// Whether a scale call adds or removes units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleDirection {
    Add,
    Remove,
}

impl ScaleDirection {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }
}

impl std::fmt::Display for ScaleDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single scale call needed to move one process type to its target count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleStep {
    /// Process type, e.g. `"web"`.
    pub process: String,
    /// Add or remove.
    pub direction: ScaleDirection,
    /// Number of units to add or remove (always > 0).
    pub units: u32,
    /// Count the process type must reach once the step is applied.
    pub target: u32,
}

/// Compute the step that moves `process` from `have` to `want` units.
///
/// Returns `None` when the counts already match.
#[must_use]
pub fn step_for(process: &str, have: u32, want: u32) -> Option<ScaleStep> {
    let (direction, units) = match want.cmp(&have) {
        std::cmp::Ordering::Equal => return None,
        std::cmp::Ordering::Greater => (ScaleDirection::Add, want - have),
        std::cmp::Ordering::Less => (ScaleDirection::Remove, have - want),
    };
    Some(ScaleStep {
        process: process.to_string(),
        direction,
        units,
        target: want,
    })
}

/// Plan one scale step for every process type in `desired` that differs from
/// `current`. Process types missing from `current` count as zero; process
/// types only present in `current` are left alone.
#[must_use]
pub fn plan_changes(current: &UnitCounts, desired: &UnitCounts) -> Vec<ScaleStep> {
    desired
        .iter()
        .filter_map(|(process, &want)| {
            let have = current.get(process).copied().unwrap_or(0);
            step_for(process, have, want)
        })
        .collect()
}

/// Cap every process type at `keep` units (`min(count, keep)`).
#[must_use]
pub fn capped(counts: &UnitCounts, keep: u32) -> UnitCounts {
    counts
        .iter()
        .map(|(process, &count)| (process.clone(), count.min(keep)))
        .collect()
}

/// Raise every process type to at least `min` units (`max(count, min)`).
#[must_use]
pub fn floored(counts: &UnitCounts, min: u32) -> UnitCounts {
    counts
        .iter()
        .map(|(process, &count)| (process.clone(), count.max(min)))
        .collect()
}

/// Sum of all units across process types.
#[must_use]
pub fn total(counts: &UnitCounts) -> u32 {
    counts.values().sum()
}

// ── Retry policy ─────────────────────────────────────────────────────────────

/// Retry budget for unit removals.
///
/// A removal is attempted once and then retried up to `max_attempts` times,
/// sleeping `backoff` before each retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of retries after the initial attempt.
    pub max_attempts: u32,
    /// Fixed pause before each retry.
    pub backoff: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Initial attempt plus retries.
    #[must_use]
    pub fn total_attempts(&self) -> u32 {
        self.max_attempts.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_TIMES, DEFAULT_RETRY_SLEEP)
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
