//! Periodic reconciliation.
//!
//! Runs one reconcile right away and then one per interval until stopped.
//! Overlap protection is the engine's job; the loop only decides when to ask.

use crate::sync::SyncEngine;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Shortest interval the scheduler will accept.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct SyncScheduler {
    engine: Arc<SyncEngine>,
    running: Mutex<Option<Running>>,
}

impl SyncScheduler {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self {
            engine,
            running: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    /// Start the periodic loop. No-op if it is already running.
    pub fn start(&self, interval: Duration) {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            log::warn!("[QUOTE_SYNC] Scheduler already running, ignoring start");
            return;
        }

        let interval = interval.max(MIN_INTERVAL);
        let cancel = CancellationToken::new();
        let engine = self.engine.clone();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            scheduler_loop(engine, interval, token).await;
        });

        log::info!(
            "[QUOTE_SYNC] Scheduler started (interval: {}s)",
            interval.as_secs_f64()
        );
        *running = Some(Running { cancel, handle });
    }

    /// Stop the loop and wait for it to exit. Once this returns no further
    /// reconcile will be started by the scheduler.
    pub async fn stop(&self) {
        let running = self
            .running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        if let Some(Running { cancel, handle }) = running {
            cancel.cancel();
            if let Err(e) = handle.await {
                log::error!("[QUOTE_SYNC] Scheduler task ended abnormally: {}", e);
            }
            log::info!("[QUOTE_SYNC] Scheduler stopped");
        }
    }
}

async fn scheduler_loop(engine: Arc<SyncEngine>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // First tick completes immediately
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            outcome = engine.reconcile() => {
                log::debug!("[QUOTE_SYNC] Scheduled reconcile: {}", outcome.message());
            }
        }
    }
}
