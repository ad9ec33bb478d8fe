//! Infrastructure implementation of the `ControlPlane` port.
//!
//! `TsuruClient` talks to the tsuru API with blocking `ureq` calls. Each call
//! runs on the blocking pool and is awaited immediately, so the orchestration
//! stays strictly sequential.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::application::ports::{ControlPlane, Outcome};
use crate::domain::capacity::{ScaleDirection, UnitCounts};
use crate::domain::config::Target;

/// Connect timeout for control-plane calls.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Upper bound for one control-plane call. Unit changes answer only once the
/// units are up, which can take minutes.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// One HTTP exchange with the control plane.
struct ApiRequest {
    method: &'static str,
    path: String,
    query: Vec<(&'static str, String)>,
    form: Option<Vec<(&'static str, String)>>,
}

impl ApiRequest {
    fn new(method: &'static str, path: String) -> Self {
        Self {
            method,
            path,
            query: Vec::new(),
            form: None,
        }
    }

    fn query(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }

    fn form(mut self, fields: Vec<(&'static str, String)>) -> Self {
        self.form = Some(fields);
        self
    }
}

/// Status code and body of a response that reached the client.
#[derive(Debug)]
struct ApiResponse {
    status: u16,
    body: String,
}

/// `GET /apps/{app}` response, reduced to the fields used here.
#[derive(Debug, Deserialize)]
struct AppInfo {
    #[serde(default)]
    cname: Option<Vec<String>>,
    #[serde(default)]
    units: Option<Vec<UnitInfo>>,
}

#[derive(Debug, Deserialize)]
struct UnitInfo {
    #[serde(rename = "ProcessName", default)]
    process_name: String,
}

/// One entry of the `GET /apps/{app}/env` response.
#[derive(Debug, Deserialize)]
struct EnvVar {
    name: String,
    value: String,
}

/// Production `ControlPlane` backed by the tsuru HTTP API.
#[derive(Debug, Clone)]
pub struct TsuruClient {
    target: Target,
    agent: ureq::Agent,
}

impl TsuruClient {
    #[must_use]
    pub fn new(target: Target) -> Self {
        let agent = ureq::AgentBuilder::new()
            .user_agent(concat!("tsuru-bluegreen/", env!("CARGO_PKG_VERSION")))
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build();
        Self { target, agent }
    }

    /// Send one request. 4xx/5xx responses are returned like any other; only
    /// transport failures are errors.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let agent = self.agent.clone();
        let url = self.target.url(&request.path);
        let auth = format!("bearer {}", self.target.token());
        let method = request.method;
        debug!(method, url = %url, "control-plane request");

        tokio::task::spawn_blocking(move || -> Result<ApiResponse> {
            let mut req = agent.request(method, &url).set("Authorization", &auth);
            for (key, value) in &request.query {
                req = req.query(key, value);
            }
            let result = match &request.form {
                Some(fields) => {
                    let pairs: Vec<(&str, &str)> =
                        fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
                    req.send_form(&pairs)
                }
                None => req.call(),
            };
            match result {
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp
                        .into_string()
                        .with_context(|| format!("reading response of {method} {url}"))?;
                    Ok(ApiResponse { status, body })
                }
                Err(ureq::Error::Status(status, resp)) => Ok(ApiResponse {
                    status,
                    body: resp.into_string().unwrap_or_default(),
                }),
                Err(e) => anyhow::bail!("{method} {url} failed: {e}"),
            }
        })
        .await
        .context("control-plane request task panicked")?
    }

    async fn send_outcome(&self, request: ApiRequest) -> Result<Outcome> {
        let resp = self.send(request).await?;
        Ok(Outcome::from_status(resp.status, resp.body))
    }

    async fn app_info(&self, app: &str) -> Result<AppInfo> {
        let resp = self
            .send(ApiRequest::new("GET", format!("/apps/{app}")))
            .await?;
        serde_json::from_str(&resp.body).with_context(|| {
            format!("malformed response for app {app} (HTTP {})", resp.status)
        })
    }
}

fn cname_form(cnames: &[String]) -> Vec<(&'static str, String)> {
    cnames.iter().map(|c| ("cname", c.clone())).collect()
}

impl ControlPlane for TsuruClient {
    async fn get_cname(&self, app: &str) -> Result<Option<Vec<String>>> {
        let info = self.app_info(app).await?;
        Ok(info.cname.filter(|list| !list.is_empty()))
    }

    async fn set_cname(&self, app: &str, cnames: &[String]) -> Result<Outcome> {
        self.send_outcome(
            ApiRequest::new("POST", format!("/apps/{app}/cname")).form(cname_form(cnames)),
        )
        .await
    }

    async fn remove_cname(&self, app: &str, cnames: &[String]) -> Result<Outcome> {
        self.send_outcome(
            ApiRequest::new("DELETE", format!("/apps/{app}/cname")).form(cname_form(cnames)),
        )
        .await
    }

    async fn swap(&self, first: &str, second: &str, force: bool) -> Result<Outcome> {
        let form = vec![
            ("app1", first.to_string()),
            ("app2", second.to_string()),
            ("force", force.to_string()),
            ("cnameOnly", "true".to_string()),
        ];
        self.send_outcome(ApiRequest::new("POST", "/swap".to_string()).form(form))
            .await
    }

    async fn unit_counts(&self, app: &str) -> UnitCounts {
        let info = match self.app_info(app).await {
            Ok(info) => info,
            Err(e) => {
                let error = format!("{e:#}");
                warn!(app, %error, "cannot read units");
                return UnitCounts::new();
            }
        };
        let mut counts = UnitCounts::new();
        for unit in info.units.unwrap_or_default() {
            *counts.entry(unit.process_name).or_insert(0) += 1;
        }
        counts
    }

    async fn scale_units(
        &self,
        app: &str,
        process: &str,
        units: u32,
        direction: ScaleDirection,
    ) -> Result<Outcome> {
        let method = match direction {
            ScaleDirection::Add => "PUT",
            ScaleDirection::Remove => "DELETE",
        };
        let request = ApiRequest::new(method, format!("/apps/{app}/units"))
            .query("units", units.to_string())
            .query("process", process);
        self.send_outcome(request).await
    }

    async fn remove_lock(&self, app: &str) -> Result<Outcome> {
        self.send_outcome(ApiRequest::new("DELETE", format!("/apps/{app}/lock")))
            .await
    }

    async fn has_running_events(&self, app: &str) -> Result<bool> {
        let request = ApiRequest::new("GET", "/events".to_string())
            .query("target.value", app)
            .query("running", "true");
        let resp = self.send(request).await?;
        if resp.status == 204 || (resp.status == 200 && resp.body.trim().is_empty()) {
            return Ok(false);
        }
        if resp.status != 200 {
            warn!(app, status = resp.status, "cannot list running events");
            return Ok(true);
        }
        match serde_json::from_str::<Option<Vec<serde_json::Value>>>(&resp.body) {
            Ok(events) => Ok(events.is_some_and(|list| !list.is_empty())),
            Err(e) => {
                warn!(app, error = %e, "malformed events response");
                Ok(true)
            }
        }
    }

    async fn set_env(&self, app: &str, key: &str, value: &str) -> Result<Outcome> {
        let form = vec![
            ("Envs.0.Name", key.to_string()),
            ("Envs.0.Value", value.to_string()),
            ("NoRestart", "true".to_string()),
            ("Private", "false".to_string()),
        ];
        let request = ApiRequest::new("POST", format!("/apps/{app}/env"))
            .query("noRestart", "true")
            .form(form);
        self.send_outcome(request).await
    }

    async fn get_env(&self, app: &str, key: &str) -> Result<Option<String>> {
        let resp = self
            .send(ApiRequest::new("GET", format!("/apps/{app}/env")).query("env", key))
            .await?;
        if resp.status != 200 {
            warn!(app, key, status = resp.status, "cannot read env");
            return Ok(None);
        }
        let vars: Option<Vec<EnvVar>> = serde_json::from_str(&resp.body)
            .with_context(|| format!("malformed env response for app {app}"))?;
        Ok(vars
            .unwrap_or_default()
            .into_iter()
            .find(|var| var.name == key)
            .map(|var| var.value))
    }
}
