//! Axum route handlers for the quote sync RPC API.

use crate::error::QuoteError;
use crate::remote::RemoteGateway;
use crate::store::Store;
use crate::sync::{self, SyncEngine};
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use quote_sync_types::*;
use std::sync::Arc;
use std::time::Instant;

pub struct AppState {
    pub store: Arc<Store>,
    pub engine: Arc<SyncEngine>,
    pub remote: Arc<dyn RemoteGateway>,
    pub start_time: Instant,
    pub auto_sync: bool,
    pub sync_interval_secs: u64,
}

type RpcResult<T> = (StatusCode, Json<RpcResponse<T>>);

fn ok<T: serde::Serialize>(data: T) -> RpcResult<T> {
    (StatusCode::OK, Json(RpcResponse::ok(data)))
}

fn fail<T: serde::Serialize>(e: QuoteError) -> RpcResult<T> {
    let status = match &e {
        QuoteError::Validation(_) | QuoteError::Parse(_) => StatusCode::BAD_REQUEST,
        QuoteError::Network(_) => StatusCode::BAD_GATEWAY,
        QuoteError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(RpcResponse::err(e.to_string())))
}

// =====================================================
// Quote Endpoints
// =====================================================

// GET /rpc/quotes/list
pub async fn quotes_list(State(state): State<Arc<AppState>>) -> RpcResult<Vec<Quote>> {
    ok(state.store.all())
}

// POST /rpc/quotes/filter
pub async fn quotes_filter(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FilterQuotesRequest>,
) -> RpcResult<Vec<Quote>> {
    ok(state.store.filter(&req.category))
}

// POST /rpc/quotes/random
pub async fn quotes_random(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RandomQuoteRequest>,
) -> RpcResult<Option<Quote>> {
    ok(state.store.random(req.category.as_deref()))
}

// POST /rpc/quotes/next
pub async fn quotes_next(State(state): State<Arc<AppState>>) -> RpcResult<Option<Quote>> {
    ok(state.store.next_quote())
}

// GET /rpc/quotes/current
pub async fn quotes_current(State(state): State<Arc<AppState>>) -> RpcResult<Option<Quote>> {
    ok(state.store.current_quote())
}

// POST /rpc/quotes/add
pub async fn quotes_add(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddQuoteRequest>,
) -> RpcResult<Quote> {
    let quote = Quote {
        text: req.text,
        author: req.author,
        category: req.category,
    };
    match state.store.append(quote) {
        Ok(stored) => {
            sync::submit_in_background(state.remote.clone(), stored.clone());
            ok(stored)
        }
        Err(e) => fail(e),
    }
}

// =====================================================
// Category Endpoints
// =====================================================

// GET /rpc/categories/list
pub async fn categories_list(State(state): State<Arc<AppState>>) -> RpcResult<Vec<String>> {
    ok(state.store.categories())
}

// POST /rpc/categories/select
pub async fn categories_select(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SelectCategoryRequest>,
) -> RpcResult<String> {
    match state.store.select_category(&req.category) {
        Ok(()) => ok(state.store.selected_category()),
        Err(e) => fail(e),
    }
}

// =====================================================
// Backup Endpoints
// =====================================================

// GET /rpc/backup/export
pub async fn backup_export(State(state): State<Arc<AppState>>) -> RpcResult<Vec<Quote>> {
    ok(state.store.all())
}

// GET /backup/quotes.json
pub async fn backup_download(State(state): State<Arc<AppState>>) -> Response {
    match state.store.export() {
        Ok(body) => (
            [
                (header::CONTENT_TYPE, "application/json"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"quotes.json\""),
            ],
            body,
        )
            .into_response(),
        Err(e) => {
            log::error!("[QUOTE_SYNC] Export failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

// POST /rpc/backup/import
pub async fn backup_import(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ImportRequest>,
) -> RpcResult<ImportSummary> {
    match state.store.import(&req.content) {
        Ok(summary) => ok(summary),
        Err(e) => {
            log::warn!("[QUOTE_SYNC] Rejected import: {}", e);
            fail(e)
        }
    }
}

// =====================================================
// Sync / Service
// =====================================================

// POST /rpc/sync/now
pub async fn sync_now(State(state): State<Arc<AppState>>) -> RpcResult<SyncReport> {
    let outcome = state.engine.reconcile().await;
    let report = match outcome {
        SyncOutcome::AlreadyRunning => None,
        _ => state.engine.last_report(),
    }
    .unwrap_or_else(|| SyncReport {
        message: outcome.message(),
        outcome,
        finished_at: chrono::Utc::now().to_rfc3339(),
    });
    ok(report)
}

// GET /rpc/status
pub async fn status(State(state): State<Arc<AppState>>) -> RpcResult<ServiceStatus> {
    ok(ServiceStatus {
        running: true,
        uptime_secs: state.start_time.elapsed().as_secs(),
        total_quotes: state.store.len(),
        total_categories: state.store.category_count(),
        selected_category: state.store.selected_category(),
        sync_state: state.engine.state(),
        last_sync: state.engine.last_report(),
        auto_sync: state.auto_sync,
        sync_interval_secs: state.sync_interval_secs,
    })
}

pub fn router(state: Arc<AppState>) -> axum::Router {
    axum::Router::new()
        .route("/rpc/quotes/list", axum::routing::get(quotes_list))
        .route("/rpc/quotes/filter", axum::routing::post(quotes_filter))
        .route("/rpc/quotes/random", axum::routing::post(quotes_random))
        .route("/rpc/quotes/next", axum::routing::post(quotes_next))
        .route("/rpc/quotes/current", axum::routing::get(quotes_current))
        .route("/rpc/quotes/add", axum::routing::post(quotes_add))
        .route("/rpc/categories/list", axum::routing::get(categories_list))
        .route(
            "/rpc/categories/select",
            axum::routing::post(categories_select),
        )
        .route("/rpc/backup/export", axum::routing::get(backup_export))
        .route("/rpc/backup/import", axum::routing::post(backup_import))
        .route("/backup/quotes.json", axum::routing::get(backup_download))
        .route("/rpc/sync/now", axum::routing::post(sync_now))
        .route("/rpc/status", axum::routing::get(status))
        .with_state(state)
}
