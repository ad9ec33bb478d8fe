//! Shared mock infrastructure for unit tests.
//!
//! `FakeControlPlane` keeps apps in memory and records every mutating call,
//! so tests can assert on the exact sequence of scale and swap requests.

#![allow(clippy::expect_used, dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use anyhow::Result;
use tsuru_bluegreen::application::ports::{
    CodeDeployer, ControlPlane, HookOutcome, HookRunner, Notifier, Outcome, ProgressReporter,
};
use tsuru_bluegreen::domain::{DeployMode, Hook, ScaleDirection, UnitCounts};

pub fn counts(pairs: &[(&str, u32)]) -> UnitCounts {
    pairs.iter().map(|(p, n)| ((*p).to_string(), *n)).collect()
}

fn rejected() -> Outcome {
    Outcome::Rejected {
        status: 500,
        body: "internal error".to_string(),
    }
}

// ── Control plane ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Scale {
        app: String,
        process: String,
        units: u32,
        direction: ScaleDirection,
    },
    Swap {
        first: String,
        second: String,
        force: bool,
    },
    SetCname {
        app: String,
        cnames: Vec<String>,
    },
    RemoveCname {
        app: String,
    },
    SetEnv {
        app: String,
        key: String,
        value: String,
    },
    EventsCheck {
        app: String,
    },
    RemoveLock {
        app: String,
    },
}

#[derive(Debug, Default)]
struct AppState {
    cname: Vec<String>,
    units: UnitCounts,
    env: BTreeMap<String, String>,
}

/// In-memory control plane.
#[derive(Default)]
pub struct FakeControlPlane {
    apps: RefCell<BTreeMap<String, AppState>>,
    calls: RefCell<Vec<Call>>,
    /// Remove calls that answer 500 before removes start to succeed.
    pub failing_removes: Cell<u32>,
    /// Failing removes still take effect on the server.
    pub removes_apply_despite_error: Cell<bool>,
    pub reject_adds: Cell<bool>,
    /// Adds answer 200 but leave the units untouched.
    pub silent_adds: Cell<bool>,
    pub reject_swap: Cell<bool>,
    pub reject_set_env: Cell<bool>,
    /// The app reports operations in flight.
    pub running_events: Cell<bool>,
}

impl FakeControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_app(self, app: &str, units: &[(&str, u32)], cname: &[&str]) -> Self {
        self.apps.borrow_mut().insert(
            app.to_string(),
            AppState {
                cname: cname.iter().map(|c| (*c).to_string()).collect(),
                units: counts(units).into_iter().filter(|(_, n)| *n > 0).collect(),
                env: BTreeMap::new(),
            },
        );
        self
    }

    pub fn with_env(self, app: &str, key: &str, value: &str) -> Self {
        self.apps
            .borrow_mut()
            .entry(app.to_string())
            .or_default()
            .env
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn scale_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Scale { .. }))
            .collect()
    }

    pub fn swap_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Swap { .. }))
            .count()
    }

    /// Lock and event calls, in order.
    pub fn lock_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::EventsCheck { .. } | Call::RemoveLock { .. }))
            .collect()
    }

    pub fn units(&self, app: &str) -> UnitCounts {
        self.apps
            .borrow()
            .get(app)
            .map(|a| a.units.clone())
            .unwrap_or_default()
    }

    pub fn cname(&self, app: &str) -> Vec<String> {
        self.apps
            .borrow()
            .get(app)
            .map(|a| a.cname.clone())
            .unwrap_or_default()
    }

    pub fn env(&self, app: &str, key: &str) -> Option<String> {
        self.apps.borrow().get(app).and_then(|a| a.env.get(key).cloned())
    }

    fn change_units(&self, app: &str, process: &str, units: u32, direction: ScaleDirection) {
        let mut apps = self.apps.borrow_mut();
        let state = apps.entry(app.to_string()).or_default();
        let have = state.units.get(process).copied().unwrap_or(0);
        let next = match direction {
            ScaleDirection::Add => have + units,
            ScaleDirection::Remove => have.saturating_sub(units),
        };
        if next == 0 {
            state.units.remove(process);
        } else {
            state.units.insert(process.to_string(), next);
        }
    }
}

impl ControlPlane for FakeControlPlane {
    async fn get_cname(&self, app: &str) -> Result<Option<Vec<String>>> {
        let cname = self.cname(app);
        Ok((!cname.is_empty()).then_some(cname))
    }

    async fn set_cname(&self, app: &str, cnames: &[String]) -> Result<Outcome> {
        self.calls.borrow_mut().push(Call::SetCname {
            app: app.to_string(),
            cnames: cnames.to_vec(),
        });
        self.apps
            .borrow_mut()
            .entry(app.to_string())
            .or_default()
            .cname
            .extend(cnames.iter().cloned());
        Ok(Outcome::Applied)
    }

    async fn remove_cname(&self, app: &str, cnames: &[String]) -> Result<Outcome> {
        self.calls.borrow_mut().push(Call::RemoveCname {
            app: app.to_string(),
        });
        if let Some(state) = self.apps.borrow_mut().get_mut(app) {
            state.cname.retain(|c| !cnames.contains(c));
        }
        Ok(Outcome::Applied)
    }

    async fn swap(&self, first: &str, second: &str, force: bool) -> Result<Outcome> {
        self.calls.borrow_mut().push(Call::Swap {
            first: first.to_string(),
            second: second.to_string(),
            force,
        });
        if self.reject_swap.get() {
            return Ok(Outcome::Rejected {
                status: 412,
                body: "apps are not in the same state".to_string(),
            });
        }
        let mut apps = self.apps.borrow_mut();
        let a = apps.entry(first.to_string()).or_default().cname.clone();
        let b = apps.entry(second.to_string()).or_default().cname.clone();
        apps.entry(first.to_string()).or_default().cname = b;
        apps.entry(second.to_string()).or_default().cname = a;
        Ok(Outcome::Applied)
    }

    async fn unit_counts(&self, app: &str) -> UnitCounts {
        self.units(app)
    }

    async fn scale_units(
        &self,
        app: &str,
        process: &str,
        units: u32,
        direction: ScaleDirection,
    ) -> Result<Outcome> {
        self.calls.borrow_mut().push(Call::Scale {
            app: app.to_string(),
            process: process.to_string(),
            units,
            direction,
        });
        match direction {
            ScaleDirection::Add if self.reject_adds.get() => Ok(rejected()),
            ScaleDirection::Add if self.silent_adds.get() => Ok(Outcome::Applied),
            ScaleDirection::Remove if self.failing_removes.get() > 0 => {
                self.failing_removes.set(self.failing_removes.get() - 1);
                if self.removes_apply_despite_error.get() {
                    self.change_units(app, process, units, direction);
                }
                Ok(rejected())
            }
            _ => {
                self.change_units(app, process, units, direction);
                Ok(Outcome::Applied)
            }
        }
    }

    async fn remove_lock(&self, app: &str) -> Result<Outcome> {
        self.calls.borrow_mut().push(Call::RemoveLock {
            app: app.to_string(),
        });
        Ok(Outcome::Rejected {
            status: 400,
            body: "app not locked".to_string(),
        })
    }

    async fn has_running_events(&self, app: &str) -> Result<bool> {
        self.calls.borrow_mut().push(Call::EventsCheck {
            app: app.to_string(),
        });
        Ok(self.running_events.get())
    }

    async fn set_env(&self, app: &str, key: &str, value: &str) -> Result<Outcome> {
        self.calls.borrow_mut().push(Call::SetEnv {
            app: app.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        });
        if self.reject_set_env.get() {
            return Ok(rejected());
        }
        self.apps
            .borrow_mut()
            .entry(app.to_string())
            .or_default()
            .env
            .insert(key.to_string(), value.to_string());
        Ok(Outcome::Applied)
    }

    async fn get_env(&self, app: &str, key: &str) -> Result<Option<String>> {
        Ok(self.env(app, key))
    }
}

// ── Hooks ─────────────────────────────────────────────────────────────────────

/// Records hook runs; hooks listed in `failing` fail, every other hook
/// succeeds.
#[derive(Default)]
pub struct FakeHooks {
    pub failing: Vec<Hook>,
    ran: RefCell<Vec<(Hook, Vec<(String, String)>)>>,
}

impl FakeHooks {
    pub fn failing(hooks: &[Hook]) -> Self {
        Self {
            failing: hooks.to_vec(),
            ran: RefCell::default(),
        }
    }

    pub fn ran(&self) -> Vec<Hook> {
        self.ran.borrow().iter().map(|(h, _)| *h).collect()
    }

    pub fn env_of(&self, hook: Hook, key: &str) -> Option<String> {
        self.ran
            .borrow()
            .iter()
            .find(|(h, _)| *h == hook)
            .and_then(|(_, envs)| envs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone()))
    }
}

impl HookRunner for FakeHooks {
    async fn run_hook(&self, hook: Hook, envs: &[(&str, &str)]) -> HookOutcome {
        self.ran.borrow_mut().push((
            hook,
            envs.iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        ));
        if self.failing.contains(&hook) {
            HookOutcome::Failed {
                reason: "exit status: 1".to_string(),
            }
        } else {
            HookOutcome::Succeeded
        }
    }
}

// ── Notifier ──────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeNotifier {
    sent: RefCell<Vec<String>>,
}

impl FakeNotifier {
    pub fn sent(&self) -> Vec<String> {
        self.sent.borrow().clone()
    }
}

impl Notifier for FakeNotifier {
    async fn notify_newrelic(&self, tag: &str) -> bool {
        self.sent.borrow_mut().push(format!("newrelic {tag}"));
        true
    }

    async fn notify_grafana(&self, app: &str, tag: &str) -> bool {
        self.sent.borrow_mut().push(format!("grafana {app} {tag}"));
        true
    }

    async fn run_webhook(&self, tag: &str) -> bool {
        self.sent.borrow_mut().push(format!("webhook {tag}"));
        false
    }
}

// ── Deployer ──────────────────────────────────────────────────────────────────

/// Emits `output` line by line and exits with `exit_code`.
pub struct FakeDeployer {
    pub exit_code: i32,
    pub output: Vec<&'static str>,
    deployed: RefCell<Vec<(String, String, DeployMode)>>,
}

impl FakeDeployer {
    pub fn exiting(exit_code: i32) -> Self {
        Self {
            exit_code,
            output: vec!["remote: building", "remote: done"],
            deployed: RefCell::default(),
        }
    }

    pub fn deployed(&self) -> Vec<(String, String, DeployMode)> {
        self.deployed.borrow().clone()
    }
}

impl CodeDeployer for FakeDeployer {
    async fn deploy(
        &self,
        app: &str,
        tag: &str,
        mode: &DeployMode,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<i32> {
        self.deployed
            .borrow_mut()
            .push((app.to_string(), tag.to_string(), mode.clone()));
        for line in self.output.iter().copied() {
            on_line(line);
        }
        Ok(self.exit_code)
    }
}

// ── Reporter ──────────────────────────────────────────────────────────────────

/// Collects every progress event as `"<kind>: <message>"`.
#[derive(Default)]
pub struct RecordingReporter {
    events: RefCell<Vec<String>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    pub fn has(&self, prefix: &str, needle: &str) -> bool {
        self.events()
            .iter()
            .any(|e| e.starts_with(prefix) && e.contains(needle))
    }
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, message: &str) {
        self.events.borrow_mut().push(format!("step: {message}"));
    }

    fn success(&self, message: &str) {
        self.events.borrow_mut().push(format!("success: {message}"));
    }

    fn warn(&self, message: &str) {
        self.events.borrow_mut().push(format!("warn: {message}"));
    }

    fn passthrough(&self, line: &str) {
        self.events.borrow_mut().push(format!("line: {line}"));
    }
}
