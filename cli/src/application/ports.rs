//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::fmt;
use std::process::ExitStatus;

use anyhow::Result;

use crate::domain::{DeployMode, Hook, ScaleDirection, UnitCounts};

// ── Value Types ───────────────────────────────────────────────────────────────

/// Result of a mutating control-plane call that reached the server.
///
/// Transport failures (connection refused, malformed JSON) are reported as
/// `Err` by the port instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The control plane answered 200.
    Applied,
    /// The control plane answered with any other status.
    Rejected { status: u16, body: String },
}

impl Outcome {
    /// Map an HTTP status to an outcome: only 200 counts as applied.
    #[must_use]
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        if status == 200 {
            Self::Applied
        } else {
            Self::Rejected {
                status,
                body: body.into(),
            }
        }
    }

    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => f.write_str("applied"),
            Self::Rejected { status, body } if body.trim().is_empty() => {
                write!(f, "rejected with HTTP {status}")
            }
            Self::Rejected { status, body } => {
                write!(f, "rejected with HTTP {status}: {}", body.trim())
            }
        }
    }
}

/// Result of running a lifecycle hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// No command configured for the hook.
    NotConfigured,
    /// The command exited with status 0.
    Succeeded,
    /// The command exited non-zero or could not be started.
    Failed { reason: String },
}

impl HookOutcome {
    /// Unconfigured hooks count as successful.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

// ── Control-Plane Port ────────────────────────────────────────────────────────

/// The PaaS control-plane API. One request per call, no caching.
#[allow(async_fn_in_trait)]
pub trait ControlPlane {
    /// Hostnames bound to `app`; `None` when the list is empty or absent.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a malformed response.
    async fn get_cname(&self, app: &str) -> Result<Option<Vec<String>>>;

    /// Bind `cnames` to `app`.
    async fn set_cname(&self, app: &str, cnames: &[String]) -> Result<Outcome>;

    /// Unbind `cnames` from `app`.
    async fn remove_cname(&self, app: &str, cnames: &[String]) -> Result<Outcome>;

    /// Atomically exchange the traffic bindings of two apps. With
    /// `force = false` the control plane refuses apps with pending changes.
    async fn swap(&self, first: &str, second: &str, force: bool) -> Result<Outcome>;

    /// Running units of `app` grouped by process type.
    ///
    /// Never fails: an unreachable app or an error response yields an empty
    /// map.
    async fn unit_counts(&self, app: &str) -> UnitCounts;

    /// Add or remove `units` units of `process` on `app`. No retry here.
    async fn scale_units(
        &self,
        app: &str,
        process: &str,
        units: u32,
        direction: ScaleDirection,
    ) -> Result<Outcome>;

    /// Release the operation lock held on `app`. Rejected when no lock is held.
    async fn remove_lock(&self, app: &str) -> Result<Outcome>;

    /// Whether the control plane has operations in flight targeting `app`.
    /// Answers `true` when that cannot be determined.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure.
    async fn has_running_events(&self, app: &str) -> Result<bool>;

    /// Set an environment variable on `app` without restarting it.
    async fn set_env(&self, app: &str, key: &str, value: &str) -> Result<Outcome>;

    /// Read one environment variable of `app`.
    async fn get_env(&self, app: &str, key: &str) -> Result<Option<String>>;
}

// ── Hook and Notification Ports ───────────────────────────────────────────────

/// Runs the shell command configured for a lifecycle hook.
#[allow(async_fn_in_trait)]
pub trait HookRunner {
    /// Run `hook` with `envs` merged into the inherited environment.
    async fn run_hook(&self, hook: Hook, envs: &[(&str, &str)]) -> HookOutcome;
}

/// Fire-and-forget deploy notifications. Every call returns `false` when the
/// target is not configured or the request fails, and never errors.
#[allow(async_fn_in_trait)]
pub trait Notifier {
    /// Record a deployment in NewRelic.
    async fn notify_newrelic(&self, tag: &str) -> bool;
    /// Post a deploy event for Grafana annotations.
    async fn notify_grafana(&self, app: &str, tag: &str) -> bool;
    /// Post the configured webhook.
    async fn run_webhook(&self, tag: &str) -> bool;
}

// ── Code Deployment Port ──────────────────────────────────────────────────────

/// Ships new code to an app.
#[allow(async_fn_in_trait)]
pub trait CodeDeployer {
    /// Deploy `tag` to `app`, handing each stdout line to `on_line` as it is
    /// produced. Returns the deploy process's exit code.
    ///
    /// # Errors
    ///
    /// Returns an error if the deploy process cannot be started.
    async fn deploy(
        &self,
        app: &str,
        tag: &str,
        mode: &DeployMode,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<i32>;
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run `command` through `sh -c` with extra environment variables and
    /// inherited stdio.
    ///
    /// # Errors
    ///
    /// Returns an error if the shell cannot be spawned.
    async fn run_shell(&self, command: &str, envs: &[(&str, &str)]) -> Result<ExitStatus>;

    /// Run a program, forwarding each stdout line to `on_line` as produced.
    /// The child is always waited on before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or its output
    /// cannot be read.
    async fn run_streaming(
        &self,
        program: &str,
        args: &[&str],
        on_line: &mut dyn FnMut(&str),
    ) -> Result<ExitStatus>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
    /// Forward a raw output line from a child process.
    fn passthrough(&self, line: &str);
}
