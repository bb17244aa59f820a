//! Quote Sync Service: local-first quote collection with periodic remote sync.
//!
//! Hosts the RPC API used by the presentation layer.
//! Default: http://127.0.0.1:9103/

mod categories;
mod config;
mod error;
mod remote;
mod routes;
mod scheduler;
mod store;
mod sync;

use config::Config;
use remote::{HttpRemoteGateway, RemoteGateway};
use routes::AppState;
use scheduler::SyncScheduler;
use std::sync::Arc;
use std::time::Instant;
use store::Store;
use sync::{SyncEngine, SyncEvent};
use tokio::sync::broadcast::error::RecvError;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();

    let store = Arc::new(Store::load(&config.data_path, config.dedup_key));
    log::info!(
        "Quote snapshot at {} ({} quotes)",
        store.path().display(),
        store.len()
    );

    let remote: Arc<dyn RemoteGateway> = match HttpRemoteGateway::new(
        &config.remote_url,
        config.page_size,
        config.request_timeout(),
    ) {
        Ok(gateway) => Arc::new(gateway),
        Err(e) => {
            log::error!("Failed to build HTTP client: {}", e);
            return;
        }
    };

    let engine = Arc::new(SyncEngine::new(store.clone(), remote.clone()));
    spawn_event_logger(&engine);

    let scheduler = SyncScheduler::new(engine.clone());
    if config.auto_sync {
        scheduler.start(config.sync_interval());
    } else {
        log::warn!("Auto sync disabled, remote changes only arrive via /rpc/sync/now");
    }

    let state = Arc::new(AppState {
        store: store.clone(),
        engine,
        remote,
        start_time: Instant::now(),
        auto_sync: config.auto_sync,
        sync_interval_secs: config.sync_interval_secs,
    });

    let cors = tower_http::cors::CorsLayer::permissive();
    let app = routes::router(state).layer(cors);

    let addr = format!("127.0.0.1:{}", config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            log::error!("Failed to bind {}: {}", addr, e);
            return;
        }
    };
    log::info!("Quote Sync Service listening on http://{}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            log::info!("Shutdown requested");
        })
        .await;
    if let Err(e) = served {
        log::error!("Server error: {}", e);
    }

    if scheduler.is_running() {
        scheduler.stop().await;
    }
    if let Err(e) = store.persist() {
        log::error!("Final snapshot write failed: {}", e);
    }
}

/// Surface sync notifications in the log.
fn spawn_event_logger(engine: &SyncEngine) {
    let mut events = engine.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SyncEvent::NewItems(n)) => {
                    log::info!("[QUOTE_SYNC] Quotes synced with server: {} new", n)
                }
                Ok(SyncEvent::UpToDate) => log::debug!("[QUOTE_SYNC] Up to date"),
                Ok(SyncEvent::Failed(e)) => log::warn!("[QUOTE_SYNC] Sync failed: {}", e),
                Err(RecvError::Lagged(skipped)) => {
                    log::debug!("[QUOTE_SYNC] Event logger skipped {} event(s)", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}
