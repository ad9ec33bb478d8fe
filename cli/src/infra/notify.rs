//! Infrastructure implementation of the `Notifier` port.
//!
//! Every notification is a single POST. Failures are logged and reported as
//! `false`; they never interrupt a deploy.

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde_json::json;
use tracing::{info, warn};

use crate::application::ports::Notifier;
use crate::domain::config::{AppConfig, GrafanaTarget, NewRelicTarget, WebhookTarget};

/// Upper bound for one notification request, connect included.
pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Request body of a notification.
#[derive(Debug)]
enum Payload {
    Form(Vec<(String, String)>),
    Json(serde_json::Value),
}

/// Notifier posting to NewRelic, a logstash input for Grafana, and a generic
/// webhook.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    newrelic: Option<NewRelicTarget>,
    grafana: Option<GrafanaTarget>,
    webhook: Option<WebhookTarget>,
    agent: ureq::Agent,
}

fn notify_agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .user_agent(concat!("tsuru-bluegreen/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
}

impl HttpNotifier {
    #[must_use]
    pub fn new(
        newrelic: Option<NewRelicTarget>,
        grafana: Option<GrafanaTarget>,
        webhook: Option<WebhookTarget>,
    ) -> Self {
        Self {
            newrelic,
            grafana,
            webhook,
            agent: notify_agent(NOTIFY_TIMEOUT),
        }
    }

    /// Replace the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = notify_agent(timeout);
        self
    }

    /// Notifier for the targets configured in `config`.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.newrelic_target(),
            config.grafana_target(),
            config.webhook_target(),
        )
    }

    async fn post(
        &self,
        kind: &'static str,
        url: String,
        headers: Vec<(&'static str, String)>,
        payload: Payload,
    ) -> bool {
        let agent = self.agent.clone();
        let target = url.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut req = agent.post(&url);
            for (name, value) in &headers {
                req = req.set(name, value);
            }
            let response = match payload {
                Payload::Form(fields) => {
                    let pairs: Vec<(&str, &str)> = fields
                        .iter()
                        .map(|(k, v)| (k.as_str(), v.as_str()))
                        .collect();
                    req.send_form(&pairs)
                }
                Payload::Json(body) => req
                    .set("Content-Type", "application/json")
                    .send_string(&body.to_string()),
            };
            response.map(|resp| resp.status()).map_err(|e| e.to_string())
        })
        .await;

        match result {
            Ok(Ok(status)) => {
                info!(kind, url = %target, status, "notification sent");
                true
            }
            Ok(Err(error)) => {
                warn!(kind, url = %target, %error, "notification failed");
                false
            }
            Err(e) => {
                warn!(kind, url = %target, error = %e, "notification task panicked");
                false
            }
        }
    }
}

/// Body of a Grafana deploy event.
#[must_use]
pub fn grafana_event(
    target: &GrafanaTarget,
    app: &str,
    tag: &str,
    timestamp: &str,
) -> serde_json::Value {
    json!({
        "index": target.index,
        "app": app,
        "tag": tag,
        "event": "deploy",
        "@timestamp": timestamp,
    })
}

impl Notifier for HttpNotifier {
    async fn notify_newrelic(&self, tag: &str) -> bool {
        let Some(target) = &self.newrelic else {
            return false;
        };
        let url = format!(
            "{}/v2/applications/{}/deployments.json",
            target.url, target.app_id
        );
        let headers = vec![("X-Api-Key", target.api_key.clone())];
        let form = vec![("deployment[revision]".to_string(), tag.to_string())];
        self.post("newrelic", url, headers, Payload::Form(form)).await
    }

    async fn notify_grafana(&self, app: &str, tag: &str) -> bool {
        let Some(target) = &self.grafana else {
            return false;
        };
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let body = grafana_event(target, app, tag, &timestamp);
        self.post("grafana", target.endpoint.clone(), Vec::new(), Payload::Json(body))
            .await
    }

    async fn run_webhook(&self, tag: &str) -> bool {
        let Some(target) = &self.webhook else {
            return false;
        };
        let mut form = target.extras.clone();
        form.push(("tag".to_string(), tag.to_string()));
        self.post("webhook", target.endpoint.clone(), Vec::new(), Payload::Form(form))
            .await
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
