//! Typed domain error enums.
//!
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

use crate::domain::swap::SwapPhase;

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors raised while loading or validating the deployment configuration.
///
/// Every variant is fatal at startup, before any control-plane call is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error(
        "Configuration file not found: {expected}. Found {legacy}: INI files are no longer read, convert it to YAML."
    )]
    LegacyIni { expected: String, legacy: String },

    #[error("Missing required setting: {0}")]
    MissingKey(&'static str),

    #[error("Missing required environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

// ── Swap errors ───────────────────────────────────────────────────────────────

/// Raised when a swap run attempts a transition its state machine forbids.
/// Always a bug in the orchestration, never an operator error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SwapError {
    #[error("Illegal swap transition from {from} to {to}")]
    IllegalTransition { from: SwapPhase, to: SwapPhase },
}
