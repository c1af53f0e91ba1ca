// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! End-to-end cycles against mock bank sites, a mock channel and a scripted
//! renderer.

mod common;

use common::{channel_page, config, rate_table, scheduler, FakeRenderer, Gate};
use kurs_core::{ProvenanceTag, SourceDescriptor};
use kurs_runtime::scheduler::CycleOutcome;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_html(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_cycle_merges_own_and_channel_values() {
    let server = MockServer::start().await;
    mount_html(&server, "/hamkor", rate_table(Some("12 100"), None)).await;
    mount_html(&server, "/alpha", rate_table(Some("12 140"), Some("12 260"))).await;
    mount_html(&server, "/beta", rate_table(Some("12 130"), Some("12 250"))).await;
    mount_html(
        &server,
        "/channel",
        channel_page(&["Sotish:", "Hamkorbank 12 250", "Unknown Credit 12 300"]),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(&dir.path().join("data.json"));
    cfg.channel_url = Some(format!("{}/channel", server.uri()));

    let gamma_url = "https://gamma.test/rates";
    let renderer = FakeRenderer::new().with_page(gamma_url, "Курсы валют\nUSD 12 120 12 240");

    let sources = vec![
        SourceDescriptor::fetched("Hamkorbank", &format!("{}/hamkor", server.uri())),
        SourceDescriptor::fetched("Alpha Bank", &format!("{}/alpha", server.uri())),
        SourceDescriptor::fetched("Beta Bank", &format!("{}/beta", server.uri())),
        SourceDescriptor::rendered("Gamma Bank", gamma_url, 0),
    ];
    let scheduler = scheduler(cfg, sources, renderer).await;

    let outcome = scheduler.trigger().await.unwrap();
    let CycleOutcome::Committed(counts) = outcome else {
        panic!("expected a committed cycle, got {outcome:?}");
    };
    assert_eq!(counts.full, 4);

    let snap = scheduler.store().current().await;
    assert_eq!(snap.origin, "web+channel");
    let names: Vec<&str> = snap.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["Hamkorbank", "Alpha Bank", "Beta Bank", "Gamma Bank"]);

    let hamkor = &snap.records[0];
    assert_eq!((hamkor.buy, hamkor.sell), (Some(12100), Some(12250)));
    assert_eq!(hamkor.provenance.to_string(), "own+channel");

    let gamma = &snap.records[3];
    assert_eq!((gamma.buy, gamma.sell), (Some(12120), Some(12240)));
    assert_eq!(gamma.provenance.to_string(), "own");

    // Persisted as the API shape.
    let stored: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("data.json")).unwrap()).unwrap();
    assert_eq!(stored["records"][0]["source"], "own+channel");
}

#[tokio::test]
async fn test_failed_source_filled_from_channel_alias() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ipak"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_html(&server, "/alpha", rate_table(Some("12 140"), Some("12 260"))).await;
    mount_html(&server, "/beta", rate_table(Some("12 130"), Some("12 250"))).await;
    mount_html(
        &server,
        "/channel",
        channel_page(&["Ipak Yo'li Bank 12 110 12 240"]),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(&dir.path().join("data.json"));
    cfg.channel_url = Some(format!("{}/channel", server.uri()));

    let sources = vec![
        SourceDescriptor::fetched("Ipak Yo'li Banki", &format!("{}/ipak", server.uri())),
        SourceDescriptor::fetched("Alpha Bank", &format!("{}/alpha", server.uri())),
        SourceDescriptor::fetched("Beta Bank", &format!("{}/beta", server.uri())),
    ];
    let scheduler = scheduler(cfg, sources, FakeRenderer::new()).await;

    assert!(scheduler.trigger().await.unwrap().is_committed());
    let snap = scheduler.store().current().await;
    assert_eq!(snap.origin, "web+channel");

    let ipak = &snap.records[0];
    assert_eq!(ipak.name, "Ipak Yo'li Banki");
    assert_eq!((ipak.buy, ipak.sell), (Some(12110), Some(12240)));
    assert_eq!(ipak.provenance.to_string(), "channel");

    let stored: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("data.json")).unwrap()).unwrap();
    assert_eq!(stored["records"][0]["source"], "channel");
}

#[tokio::test]
async fn test_rendered_source_falls_back_to_static_markup() {
    let server = MockServer::start().await;
    let url = format!("{}/delta", server.uri());
    mount_html(&server, "/delta", rate_table(Some("12 110"), Some("12 230"))).await;

    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(&dir.path().join("data.json"));
    cfg.min_success = 1;

    // The renderer has no page for this URL, so navigation fails.
    let sources = vec![SourceDescriptor::rendered("Delta Bank", &url, 0)];
    let scheduler = scheduler(cfg, sources, FakeRenderer::new()).await;

    assert!(scheduler.trigger().await.unwrap().is_committed());
    let snap = scheduler.store().current().await;
    let delta = &snap.records[0];
    assert_eq!((delta.buy, delta.sell), (Some(12110), Some(12230)));
    assert!(delta.provenance.contains(ProvenanceTag::Own));
    assert_eq!(snap.origin, "web-only");
}

#[tokio::test]
async fn test_alternate_page_fills_missing_side() {
    let server = MockServer::start().await;
    mount_html(&server, "/main", rate_table(Some("12 100"), None)).await;
    mount_html(&server, "/alt", rate_table(Some("12 090"), Some("12 260"))).await;

    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(&dir.path().join("data.json"));
    cfg.min_success = 1;

    let source = SourceDescriptor::fetched("Epsilon Bank", &format!("{}/main", server.uri()))
        .with_alt(&format!("{}/alt", server.uri()));
    let scheduler = scheduler(cfg, vec![source], FakeRenderer::new()).await;
    scheduler.trigger().await.unwrap();

    let snap = scheduler.store().current().await;
    let rec = &snap.records[0];
    // The primary buy is kept; only the missing sell comes from the alt page.
    assert_eq!((rec.buy, rec.sell), (Some(12100), Some(12260)));
    assert_eq!(rec.provenance.to_string(), "own+own-alt");
}

#[tokio::test]
async fn test_unreachable_source_is_tagged_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir.path().join("data.json"));
    let source = SourceDescriptor::fetched("Zeta Bank", &server.uri());
    let scheduler = scheduler(cfg, vec![source.clone()], FakeRenderer::new()).await;

    let record = scheduler.scraper().scrape_one(&source).await;
    assert!(!record.is_resolved());
    assert_eq!(record.provenance.to_string(), "error");
}

#[tokio::test]
async fn test_sub_threshold_cycle_keeps_file_byte_identical() {
    let server = MockServer::start().await;
    mount_html(&server, "/a", rate_table(Some("12 140"), Some("12 260"))).await;
    mount_html(&server, "/b", rate_table(Some("12 130"), Some("12 250"))).await;
    mount_html(&server, "/c", rate_table(Some("12 120"), Some("12 240"))).await;

    let dir = tempfile::tempdir().unwrap();
    let data_file = dir.path().join("data.json");
    let sources = |base: &str| {
        vec![
            SourceDescriptor::fetched("A Bank", &format!("{base}/a")),
            SourceDescriptor::fetched("B Bank", &format!("{base}/b")),
            SourceDescriptor::fetched("C Bank", &format!("{base}/c")),
        ]
    };

    let first = scheduler(config(&data_file), sources(&server.uri()), FakeRenderer::new()).await;
    assert!(first.trigger().await.unwrap().is_committed());
    let before = std::fs::read(&data_file).unwrap();

    // Same sources, now all failing.
    server.reset().await;
    let second = scheduler(config(&data_file), sources(&server.uri()), FakeRenderer::new()).await;
    let held = second.store().current().await;

    let outcome = second.trigger().await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Discarded(c) if c.resolved == 0));
    assert_eq!(std::fs::read(&data_file).unwrap(), before);
    assert_eq!(*second.store().current().await, *held);
}

#[tokio::test]
async fn test_trigger_during_cycle_reports_already_running() {
    let gate = Arc::new(Gate::default());
    let url = "https://slow.test/";
    let renderer = FakeRenderer::new()
        .with_page(url, "USD 12 120 12 240")
        .with_gate(Arc::clone(&gate));
    let navigations = Arc::clone(&renderer.navigations);

    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(&dir.path().join("data.json"));
    cfg.min_success = 1;
    let scheduler = scheduler(
        cfg,
        vec![SourceDescriptor::rendered("Slow Bank", url, 0)],
        renderer,
    )
    .await;

    let running = Arc::clone(&scheduler);
    let first = tokio::spawn(async move { running.trigger().await });

    gate.entered.notified().await;
    assert!(scheduler.is_running());
    let second = scheduler.trigger().await.unwrap();
    assert_eq!(second, CycleOutcome::AlreadyRunning);

    gate.release.notify_one();
    let first = tokio::time::timeout(Duration::from_secs(10), first)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(first.is_committed());
    assert!(!scheduler.is_running());
    assert_eq!(navigations.load(Ordering::SeqCst), 1);
}
