//! `tsuru-bluegreen cname` — show which slot is live.
//!
//! Read-only: queries cname, units, and deploy tag of both slots.

use anyhow::{Context, Result};
use clap::Args;
use owo_colors::OwoColorize as _;
use serde::Serialize;

use crate::app::AppContext;
use crate::application::ports::ControlPlane;
use crate::application::services::{TAG_ENV, slots};
use crate::domain::capacity::UnitCounts;
use crate::domain::slot::SlotPair;
use crate::output::OutputContext;

/// Arguments for the cname command.
#[derive(Args, Debug, Default)]
pub struct StatusArgs {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// State of one slot.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SlotStatus {
    pub app: String,
    pub tag: Option<String>,
    pub units: UnitCounts,
}

/// Live and idle slots with the traffic binding.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatusReport {
    pub cname: Vec<String>,
    /// Binding left on the idle slot when both slots hold one.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stray_cname: Vec<String>,
    pub live: SlotStatus,
    pub idle: SlotStatus,
}

/// Run `tsuru-bluegreen cname`.
///
/// # Errors
///
/// Returns an error if the control plane is unreachable.
pub async fn run(args: &StatusArgs, app: &AppContext) -> Result<i32> {
    let report = gather(&app.client, &app.slot_pair()).await?;
    if args.json {
        let out = serde_json::to_string_pretty(&report).context("JSON serialization failed")?;
        println!("{out}");
    } else {
        print_human(&report, &app.output);
    }
    Ok(0)
}

/// Collect the state of both slots.
///
/// # Errors
///
/// Returns an error if the control plane is unreachable.
pub async fn gather(cp: &impl ControlPlane, pair: &SlotPair) -> Result<StatusReport> {
    let roles = slots::resolve(cp, pair).await?;
    Ok(StatusReport {
        cname: roles.cname.clone().unwrap_or_default(),
        stray_cname: roles.stray_cname.clone().unwrap_or_default(),
        live: slot_status(cp, &roles.live).await?,
        idle: slot_status(cp, &roles.idle).await?,
    })
}

async fn slot_status(cp: &impl ControlPlane, app: &str) -> Result<SlotStatus> {
    Ok(SlotStatus {
        app: app.to_string(),
        tag: cp
            .get_env(app, TAG_ENV)
            .await
            .with_context(|| format!("reading {TAG_ENV} of {app}"))?,
        units: cp.unit_counts(app).await,
    })
}

/// `web=2, worker=1`, or `none`.
#[must_use]
pub fn format_units(units: &UnitCounts) -> String {
    if units.is_empty() {
        return "none".to_string();
    }
    units
        .iter()
        .map(|(process, count)| format!("{process}={count}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_human(report: &StatusReport, ctx: &OutputContext) {
    let cname = if report.cname.is_empty() {
        "(none)".to_string()
    } else {
        report.cname.join(", ")
    };
    ctx.kv("Cname", &cname);
    if !report.stray_cname.is_empty() {
        ctx.warn(&format!(
            "{} also holds {}",
            report.idle.app,
            report.stray_cname.join(", ")
        ));
    }
    for (label, slot, style) in [
        ("Live", &report.live, ctx.styles.live),
        ("Idle", &report.idle, ctx.styles.idle),
    ] {
        let tag = slot.tag.as_deref().unwrap_or("-");
        ctx.kv(
            label,
            &format!(
                "{}  tag {tag}  units {}",
                slot.app.style(style),
                format_units(&slot.units)
            ),
        );
    }
}
