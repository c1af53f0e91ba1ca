// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP read API.
//!
//! Scrape shortfalls are reported in the body with `success: false`; the
//! status code stays 200 so simple clients can poll without special cases.

use crate::scheduler::{CycleOutcome, Scheduler};
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Local, Utc};
use kurs_core::channel::date_stamp;
use serde_json::{json, Value};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Shared by every handler.
pub struct AppState {
    pub scheduler: Arc<Scheduler>,
    pub started: Instant,
}

impl AppState {
    pub fn new(scheduler: Arc<Scheduler>) -> Arc<Self> {
        Arc::new(Self {
            scheduler,
            started: Instant::now(),
        })
    }
}

/// Build the axum Router with all REST endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/banks", get(banks))
        .route("/api/refresh", get(refresh))
        .route("/api/health", get(health))
        .route("/api/banks/list", get(banks_list))
        .route("/api/debug/bank/:name", get(debug_bank))
        .route("/api/cbu", get(cbu))
        .layer(cors)
        .with_state(state)
}

/// Serve the API until the returned future is dropped.
pub async fn start(host: IpAddr, port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);
    let addr = SocketAddr::new(host, port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("REST API listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

// ── Handlers ────────────────────────────────────────────────────

async fn banks(State(state): State<Arc<AppState>>) -> Json<Value> {
    let snap = state.scheduler.store().current().await;
    let total = state.scheduler.scraper().registry().len();
    Json(json!({
        "success": !snap.is_empty(),
        "data": snap.records,
        "source": snap.origin,
        "count": snap.records.len(),
        "successCount": snap.counts.resolved,
        "fullCount": snap.counts.full,
        "partialCount": snap.counts.partial,
        "totalCount": if snap.is_empty() { total } else { snap.counts.total },
        "postDate": snap.post_date,
        "lastFetch": snap.captured_at.map(|t| t.to_rfc3339()),
    }))
}

async fn refresh(State(state): State<Arc<AppState>>) -> Json<Value> {
    if state.scheduler.is_running() {
        return Json(already_running());
    }
    // Spawned so the cycle finishes even if the client disconnects.
    let scheduler = Arc::clone(&state.scheduler);
    let outcome = tokio::spawn(async move { scheduler.trigger().await }).await;

    match outcome {
        Ok(Ok(CycleOutcome::AlreadyRunning)) => Json(already_running()),
        Ok(Ok(outcome)) => {
            let snap = state.scheduler.store().current().await;
            Json(json!({
                "success": outcome.is_committed(),
                "successCount": snap.counts.resolved,
                "fullCount": snap.counts.full,
            }))
        }
        Ok(Err(e)) => {
            error!("refresh cycle failed: {e}");
            Json(json!({ "success": false, "message": e.to_string() }))
        }
        Err(e) => {
            error!("refresh task failed: {e}");
            Json(json!({ "success": false, "message": "cycle task failed" }))
        }
    }
}

fn already_running() -> Value {
    json!({ "success": false, "message": "a scrape is already running" })
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let snap = state.scheduler.store().current().await;
    let config = state.scheduler.scraper().config();
    Json(json!({
        "status": "ok",
        "today": date_stamp(Local::now().date_naive()),
        "isRunning": state.scheduler.is_running(),
        "successCount": snap.counts.resolved,
        "fullCount": snap.counts.full,
        "totalCount": snap.counts.total,
        "dataAgeMinutes": snap.age_minutes(Utc::now()),
        "source": snap.origin,
        "elapsed": format!("{:.1}s", snap.duration_ms as f64 / 1000.0),
        "uptimeSecs": state.started.elapsed().as_secs(),
        "config": {
            "profile": config.profile.as_str(),
            "batchSize": config.batch_size,
            "chromePath": config
                .chrome_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "auto".to_string()),
            "browser": state.scheduler.scraper().renderer().is_available(),
            "rateMin": config.band.min,
            "rateMax": config.band.max,
            "intervalMinutes": config.interval.as_secs() / 60,
            "channel": config.channel_url.is_some(),
        },
    }))
}

async fn banks_list(State(state): State<Arc<AppState>>) -> Json<Value> {
    let list: Vec<Value> = state
        .scheduler
        .scraper()
        .registry()
        .iter()
        .enumerate()
        .map(|(index, s)| {
            json!({
                "index": index,
                "name": s.name,
                "url": s.url,
                "method": s.mode.method_label(),
            })
        })
        .collect();
    Json(Value::Array(list))
}

async fn debug_bank(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Json<Value> {
    let scraper = Arc::clone(state.scheduler.scraper());
    let Some(source) = scraper.registry().find(&name).cloned() else {
        return Json(json!({
            "error": "not found",
            "banks": scraper.registry().names(),
        }));
    };
    let report = scraper.debug_source(&source).await;
    Json(json!(report))
}

async fn cbu(State(state): State<Arc<AppState>>) -> Json<Value> {
    match state.scheduler.scraper().reference_rate().await {
        Ok(rate) => Json(json!({ "success": true, "data": rate })),
        Err(e) => Json(json!({ "success": false, "error": e.to_string() })),
    }
}
