//! Domain types and validators for the deployment configuration.
//!
//! Pure functions only: no I/O, no async, no filesystem access. Environment
//! lookups are injected by the caller so they can be tested without touching
//! the process environment.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::capacity::{DEFAULT_RETRY_SLEEP, DEFAULT_RETRY_TIMES, RetryPolicy};
use crate::domain::error::ConfigError;

// ── Constants ────────────────────────────────────────────────────────────────

/// Environment variable holding the control-plane bearer token.
pub const TOKEN_ENV: &str = "TSURU_TOKEN";
/// Environment variable holding the control-plane base URL.
pub const TARGET_ENV: &str = "TSURU_TARGET";
/// Fallback for a blank `newrelic.api_key`.
pub const NEW_RELIC_API_KEY_ENV: &str = "NEW_RELIC_API_KEY";
/// Fallback for a blank `newrelic.app_id`.
pub const NEW_RELIC_APP_ID_ENV: &str = "NEW_RELIC_APP_ID";

const DEFAULT_NEW_RELIC_URL: &str = "https://api.newrelic.com";

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `tsuru-bluegreen.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub application: ApplicationConfig,
    pub retry: RetryConfig,
    pub hooks: HooksConfig,
    pub newrelic: NewRelicConfig,
    pub grafana: GrafanaConfig,
    pub webhook: WebhookConfig,
}

/// `application` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Base name; slots are `<name>-blue` and `<name>-green`.
    pub name: String,
    /// Directory to deploy with `tsuru app-deploy`. When unset the tag is
    /// pushed with git instead.
    pub deploy_dir: Option<String>,
    /// Units per process type kept on the idle slot while new code is pushed.
    pub keep_units: u32,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            deploy_dir: None,
            keep_units: 1,
        }
    }
}

/// `retry` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after a failed unit removal.
    pub times: u32,
    /// Seconds to sleep before each retry.
    pub sleep_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            times: DEFAULT_RETRY_TIMES,
            sleep_secs: DEFAULT_RETRY_SLEEP.as_secs(),
        }
    }
}

/// `hooks` section: shell commands per lifecycle point.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HooksConfig {
    pub before_pre: Option<String>,
    pub after_pre: Option<String>,
    pub before_swap: Option<String>,
    pub after_swap: Option<String>,
}

/// `newrelic` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewRelicConfig {
    pub api_key: Option<String>,
    pub app_id: Option<String>,
    /// API base URL.
    pub url: String,
}

impl Default for NewRelicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            app_id: None,
            url: DEFAULT_NEW_RELIC_URL.to_string(),
        }
    }
}

/// `grafana` section (logstash HTTP input feeding Grafana annotations).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GrafanaConfig {
    pub endpoint: Option<String>,
    pub index: Option<String>,
}

/// `webhook` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WebhookConfig {
    pub endpoint: Option<String>,
    /// Extra form fields, `key1=value1&key2=value2`.
    pub payload_extras: Option<String>,
}

// ── Typed accessors ──────────────────────────────────────────────────────────

/// Lifecycle points at which a configured shell command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    BeforePre,
    AfterPre,
    BeforeSwap,
    AfterSwap,
}

impl Hook {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::BeforePre => "before_pre",
            Self::AfterPre => "after_pre",
            Self::BeforeSwap => "before_swap",
            Self::AfterSwap => "after_swap",
        }
    }
}

impl std::fmt::Display for Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How new code reaches the idle slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployMode {
    /// `git push <app> <tag>:master`
    GitPush,
    /// `tsuru app-deploy -a <app> <dir>`
    Package { dir: String },
}

/// Resolved NewRelic target (both secrets present).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelicTarget {
    pub url: String,
    pub api_key: String,
    pub app_id: String,
}

/// Resolved Grafana target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrafanaTarget {
    pub endpoint: String,
    pub index: String,
}

/// Resolved webhook target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookTarget {
    pub endpoint: String,
    pub extras: Vec<(String, String)>,
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl HooksConfig {
    /// Shell command for `hook`; blank commands count as unset.
    #[must_use]
    pub fn command(&self, hook: Hook) -> Option<&str> {
        let cmd = match hook {
            Hook::BeforePre => &self.before_pre,
            Hook::AfterPre => &self.after_pre,
            Hook::BeforeSwap => &self.before_swap,
            Hook::AfterSwap => &self.after_swap,
        };
        non_blank(cmd.as_ref())
    }
}

impl AppConfig {
    /// Shell command configured for `hook`, if any.
    #[must_use]
    pub fn hook(&self, hook: Hook) -> Option<&str> {
        self.hooks.command(hook)
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry.times, Duration::from_secs(self.retry.sleep_secs))
    }

    #[must_use]
    pub fn deploy_mode(&self) -> DeployMode {
        match non_blank(self.application.deploy_dir.as_ref()) {
            Some(dir) => DeployMode::Package {
                dir: dir.to_string(),
            },
            None => DeployMode::GitPush,
        }
    }

    #[must_use]
    pub fn newrelic_target(&self) -> Option<NewRelicTarget> {
        let api_key = non_blank(self.newrelic.api_key.as_ref())?;
        let app_id = non_blank(self.newrelic.app_id.as_ref())?;
        Some(NewRelicTarget {
            url: self.newrelic.url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            app_id: app_id.to_string(),
        })
    }

    #[must_use]
    pub fn grafana_target(&self) -> Option<GrafanaTarget> {
        let endpoint = non_blank(self.grafana.endpoint.as_ref())?;
        let index = non_blank(self.grafana.index.as_ref())?;
        Some(GrafanaTarget {
            endpoint: endpoint.to_string(),
            index: index.to_string(),
        })
    }

    #[must_use]
    pub fn webhook_target(&self) -> Option<WebhookTarget> {
        let endpoint = non_blank(self.webhook.endpoint.as_ref())?;
        let extras = self
            .webhook
            .payload_extras
            .as_deref()
            .map(parse_payload_extras)
            .unwrap_or_default();
        Some(WebhookTarget {
            endpoint: endpoint.to_string(),
            extras,
        })
    }

    /// Fill blank NewRelic secrets from the environment.
    pub fn apply_env_fallbacks(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if non_blank(self.newrelic.api_key.as_ref()).is_none() {
            self.newrelic.api_key = lookup(NEW_RELIC_API_KEY_ENV);
        }
        if non_blank(self.newrelic.app_id.as_ref()).is_none() {
            self.newrelic.app_id = lookup(NEW_RELIC_APP_ID_ENV);
        }
    }

    /// Validate the loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the application name is missing or malformed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = self.application.name.trim();
        if name.is_empty() {
            return Err(ConfigError::MissingKey("application.name"));
        }
        if name.contains(|c: char| c.is_whitespace() || c == '/') {
            return Err(ConfigError::InvalidValue {
                key: "application.name",
                value: name.to_string(),
            });
        }
        Ok(())
    }
}

/// Split `key1=value1&key2=value2` into pairs. Empty segments are skipped and
/// a segment without `=` becomes a key with an empty value.
#[must_use]
pub fn parse_payload_extras(raw: &str) -> Vec<(String, String)> {
    raw.split('&')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (segment.to_string(), String::new()),
        })
        .collect()
}

// ── Control-plane target ─────────────────────────────────────────────────────

/// Base URL and bearer token of the control plane.
#[derive(Clone, PartialEq, Eq)]
pub struct Target {
    base_url: String,
    token: String,
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl Target {
    /// Build a target from the raw `TSURU_TARGET` and `TSURU_TOKEN` values.
    ///
    /// A target without a scheme gets `http://`; trailing slashes are removed.
    ///
    /// # Errors
    ///
    /// Returns an error if either value is blank.
    pub fn new(raw_target: &str, token: &str) -> Result<Self, ConfigError> {
        let raw_target = raw_target.trim();
        if raw_target.is_empty() {
            return Err(ConfigError::MissingEnv(TARGET_ENV));
        }
        let token = token.trim();
        if token.is_empty() {
            return Err(ConfigError::MissingEnv(TOKEN_ENV));
        }
        let with_scheme = if raw_target.starts_with("http://") || raw_target.starts_with("https://")
        {
            raw_target.to_string()
        } else {
            format!("http://{raw_target}")
        };
        Ok(Self {
            base_url: with_scheme.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Absolute URL for an API path such as `/apps/web-blue`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

// ── Settings ─────────────────────────────────────────────────────────────────

/// Everything a run needs, validated once at startup and passed by reference.
#[derive(Debug, Clone)]
pub struct Settings {
    pub target: Target,
    pub app: AppConfig,
}

impl Settings {
    /// # Errors
    ///
    /// Returns an error if the configuration fails validation.
    pub fn new(target: Target, app: AppConfig) -> Result<Self, ConfigError> {
        app.validate()?;
        Ok(Self { target, app })
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
