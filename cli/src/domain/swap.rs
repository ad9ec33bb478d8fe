//! Swap state machine — phases of a traffic cutover and their legal
//! transitions.
//!
//! ```text
//! Idle → ScalingUp → Swapping → ScalingDown → Done
//!           ↓           ↓
//!        Aborted    RolledBack
//! ```
//!
//! `Idle → Aborted` covers a failing `before_swap` hook.

use std::fmt;

use crate::domain::error::SwapError;

/// Phase of a swap run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapPhase {
    /// Nothing changed yet.
    Idle,
    /// Idle slot is being sized up to the live slot's capacity.
    ScalingUp,
    /// Traffic cutover in progress.
    Swapping,
    /// Old live slot is being torn down.
    ScalingDown,
    /// Swap completed.
    Done,
    /// Stopped before traffic moved.
    Aborted,
    /// Cutover failed; the idle slot was scaled back.
    RolledBack,
}

impl SwapPhase {
    /// Whether no further transition is possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted | Self::RolledBack)
    }

    /// Whether `self → next` is a legal transition.
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::ScalingUp | Self::Aborted)
                | (Self::ScalingUp, Self::Swapping | Self::Aborted)
                | (Self::Swapping, Self::ScalingDown | Self::RolledBack)
                | (Self::ScalingDown, Self::Done)
        )
    }
}

impl fmt::Display for SwapPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::ScalingUp => "scaling-up",
            Self::Swapping => "swapping",
            Self::ScalingDown => "scaling-down",
            Self::Done => "done",
            Self::Aborted => "aborted",
            Self::RolledBack => "rolled-back",
        };
        f.write_str(name)
    }
}

/// Tracks the phase of one swap run and rejects illegal transitions.
#[derive(Debug)]
pub struct SwapMachine {
    phase: SwapPhase,
}

impl SwapMachine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: SwapPhase::Idle,
        }
    }

    #[must_use]
    pub fn phase(&self) -> SwapPhase {
        self.phase
    }

    /// Move to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::IllegalTransition`] and stays put if `next` is
    /// not reachable from the current phase.
    pub fn advance(&mut self, next: SwapPhase) -> Result<(), SwapError> {
        if !self.phase.can_advance_to(next) {
            return Err(SwapError::IllegalTransition {
                from: self.phase,
                to: next,
            });
        }
        tracing::debug!(from = %self.phase, to = %next, "swap phase");
        self.phase = next;
        Ok(())
    }
}

impl Default for SwapMachine {
    fn default() -> Self {
        Self::new()
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
