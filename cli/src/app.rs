//! Application context — unified state passed to every command handler.
//!
//! `AppContext` owns the validated [`Settings`] and the concrete adapters for
//! every port. It is built once in `Cli::run()` and passed by reference.

use std::path::PathBuf;

use anyhow::Result;

use crate::domain::config::Settings;
use crate::domain::slot::SlotPair;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config::load_settings;
use crate::infra::control_plane::TsuruClient;
use crate::infra::deployer::PaasDeployer;
use crate::infra::hooks::ShellHookRunner;
use crate::infra::notify::HttpNotifier;
use crate::output::{OutputContext, TerminalReporter};

/// Flags passed from the top-level CLI to `AppContext::new`.
#[derive(Debug, Default)]
pub struct AppFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Explicit config file path.
    pub config: Option<PathBuf>,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    pub settings: Settings,
    /// Control-plane client.
    pub client: TsuruClient,
    pub hooks: ShellHookRunner<TokioCommandRunner>,
    pub deployer: PaasDeployer<TokioCommandRunner>,
    pub notifier: HttpNotifier,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or is invalid.
    pub fn new(flags: &AppFlags) -> Result<Self> {
        let settings = load_settings(flags.config.as_deref())?;
        tracing::debug!(
            app = %settings.app.application.name,
            target = ?settings.target,
            "settings loaded"
        );
        Ok(Self::with_settings(
            settings,
            OutputContext::new(flags.no_color, flags.quiet),
        ))
    }

    /// Wire the production adapters around already validated settings.
    #[must_use]
    pub fn with_settings(settings: Settings, output: OutputContext) -> Self {
        Self {
            client: TsuruClient::new(settings.target.clone()),
            hooks: ShellHookRunner::new(settings.app.hooks.clone(), TokioCommandRunner),
            deployer: PaasDeployer::new(TokioCommandRunner),
            notifier: HttpNotifier::from_config(&settings.app),
            output,
            settings,
        }
    }

    /// The blue/green slot names of the configured application.
    #[must_use]
    pub fn slot_pair(&self) -> SlotPair {
        SlotPair::from_base(&self.settings.app.application.name)
    }

    /// Returns a `TerminalReporter` that wraps this context's output.
    #[must_use]
    pub fn terminal_reporter(&self) -> TerminalReporter<'_> {
        TerminalReporter::new(&self.output)
    }
}
