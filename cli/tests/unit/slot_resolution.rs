//! Live/idle slot resolution and the read-only status report.

#![allow(clippy::expect_used)]

use tsuru_bluegreen::application::ports::ControlPlane;
use tsuru_bluegreen::application::services::slots::resolve;
use tsuru_bluegreen::commands::status::gather;
use tsuru_bluegreen::domain::SlotPair;

use crate::mocks::{FakeControlPlane, counts};

fn pair() -> SlotPair {
    SlotPair::from_base("web")
}

#[tokio::test]
async fn test_bound_secondary_is_live() {
    let cp = FakeControlPlane::new()
        .with_app("web-blue", &[], &[])
        .with_app("web-green", &[("web", 1)], &["web.example.com"]);

    let roles = resolve(&cp, &pair()).await.expect("resolve");

    assert_eq!(roles.live, "web-green");
    assert_eq!(roles.idle, "web-blue");
    assert_eq!(roles.cname, Some(vec!["web.example.com".to_string()]));
}

#[tokio::test]
async fn test_no_binding_defaults_to_primary_live() {
    let cp = FakeControlPlane::new();

    let roles = resolve(&cp, &pair()).await.expect("resolve");

    assert_eq!(roles.live, "web-blue");
    assert_eq!(roles.idle, "web-green");
    assert_eq!(roles.cname, None);
}

#[tokio::test]
async fn test_both_bound_treats_secondary_as_live() {
    let cp = FakeControlPlane::new()
        .with_app("web-blue", &[], &["a.example.com"])
        .with_app("web-green", &[], &["b.example.com"]);

    let roles = resolve(&cp, &pair()).await.expect("resolve");

    assert_eq!(roles.live, "web-green");
    assert_eq!(roles.idle, "web-blue");
    assert_eq!(roles.cname, Some(vec!["b.example.com".to_string()]));
    assert_eq!(roles.stray_cname, Some(vec!["a.example.com".to_string()]));
    assert!(cp.calls().is_empty());
}

#[tokio::test]
async fn test_status_report_lists_stray_binding() {
    let cp = FakeControlPlane::new()
        .with_app("web-blue", &[("web", 1)], &["a.example.com"])
        .with_app("web-green", &[("web", 1)], &["b.example.com"]);

    let report = gather(&cp, &pair()).await.expect("status");

    assert_eq!(report.live.app, "web-green");
    assert_eq!(report.stray_cname, vec!["a.example.com"]);
    let json = serde_json::to_value(&report).expect("json");
    assert_eq!(json["stray_cname"][0], "a.example.com");
}

#[tokio::test]
async fn test_set_cname_then_get_cname_round_trip() {
    let cp = FakeControlPlane::new();
    let hosts = vec!["web.example.com".to_string()];

    let outcome = cp.set_cname("web-blue", &hosts).await.expect("set");

    assert!(outcome.is_applied());
    assert_eq!(cp.get_cname("web-blue").await.expect("get"), Some(hosts));
}

#[tokio::test]
async fn test_status_report_collects_both_slots() {
    let cp = FakeControlPlane::new()
        .with_app("web-blue", &[("web", 2)], &["web.example.com"])
        .with_app("web-green", &[], &[])
        .with_env("web-blue", "TAG", "0.2.0")
        .with_env("web-green", "TAG", "0.2.1");

    let report = gather(&cp, &pair()).await.expect("status");

    assert_eq!(report.cname, vec!["web.example.com"]);
    assert_eq!(report.live.app, "web-blue");
    assert_eq!(report.live.tag.as_deref(), Some("0.2.0"));
    assert_eq!(report.live.units, counts(&[("web", 2)]));
    assert_eq!(report.idle.app, "web-green");
    assert!(report.idle.units.is_empty());

    let json = serde_json::to_value(&report).expect("json");
    assert!(json.get("stray_cname").is_none());
    assert_eq!(json["live"]["units"]["web"], 2);
    assert_eq!(json["idle"]["tag"], "0.2.1");
}
