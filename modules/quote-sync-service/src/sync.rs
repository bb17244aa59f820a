//! Reconciliation of the local store against the remote collection.
//!
//! One `reconcile()` walks `Idle -> Fetching -> Merging -> Idle`. A call made
//! while another is in flight returns `AlreadyRunning` without touching the
//! network. Remote quotes are appended after local ones, skipping any whose
//! dedup key is already present.

use crate::remote::RemoteGateway;
use crate::store::Store;
use quote_sync_types::{Quote, SyncOutcome, SyncReport, SyncState};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

/// Notification published after every reconcile that actually ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    NewItems(usize),
    UpToDate,
    Failed(String),
}

struct EngineState {
    state: SyncState,
    last_report: Option<SyncReport>,
}

pub struct SyncEngine {
    store: Arc<Store>,
    remote: Arc<dyn RemoteGateway>,
    state: Mutex<EngineState>,
    events: broadcast::Sender<SyncEvent>,
}

/// Returns the engine to `Idle` when dropped, so every exit path releases the guard.
struct RunGuard<'a> {
    engine: &'a SyncEngine,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.engine.lock().state = SyncState::Idle;
    }
}

impl SyncEngine {
    pub fn new(store: Arc<Store>, remote: Arc<dyn RemoteGateway>) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            store,
            remote,
            state: Mutex::new(EngineState {
                state: SyncState::Idle,
                last_report: None,
            }),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> SyncState {
        self.lock().state
    }

    pub fn last_report(&self) -> Option<SyncReport> {
        self.lock().last_report.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Claim the engine if it is idle.
    fn try_begin(&self) -> Option<RunGuard<'_>> {
        let mut st = self.lock();
        if st.state != SyncState::Idle {
            return None;
        }
        st.state = SyncState::Fetching;
        Some(RunGuard { engine: self })
    }

    fn set_state(&self, state: SyncState) {
        self.lock().state = state;
    }

    /// Run one fetch-merge-persist cycle.
    pub async fn reconcile(&self) -> SyncOutcome {
        let Some(guard) = self.try_begin() else {
            log::debug!("[QUOTE_SYNC] Reconcile already in progress, skipping");
            return SyncOutcome::AlreadyRunning;
        };

        let outcome = match self.remote.fetch_remote_items().await {
            Ok(remote) => {
                self.set_state(SyncState::Merging);
                self.merge(remote)
            }
            Err(e) => {
                log::warn!("[QUOTE_SYNC] Fetch failed, keeping local collection: {}", e);
                SyncOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        // Idle before anyone hears about it
        drop(guard);
        self.finish(&outcome);
        outcome
    }

    fn merge(&self, remote: Vec<Quote>) -> SyncOutcome {
        let fetched = remote.len();
        match self.store.merge(remote) {
            Ok(added) if added.is_empty() => {
                log::debug!("[QUOTE_SYNC] {} remote quote(s), nothing new", fetched);
                SyncOutcome::UpToDate
            }
            Ok(added) => {
                log::info!(
                    "[QUOTE_SYNC] Merged {} new quote(s) out of {} fetched",
                    added.len(),
                    fetched
                );
                SyncOutcome::Synced {
                    new_items: added.len(),
                }
            }
            Err(e) => {
                log::error!("[QUOTE_SYNC] Failed to persist merged quotes: {}", e);
                SyncOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    fn finish(&self, outcome: &SyncOutcome) {
        let report = SyncReport {
            outcome: outcome.clone(),
            message: outcome.message(),
            finished_at: chrono::Utc::now().to_rfc3339(),
        };
        self.lock().last_report = Some(report);

        let event = match outcome {
            SyncOutcome::Synced { new_items } => SyncEvent::NewItems(*new_items),
            SyncOutcome::UpToDate => SyncEvent::UpToDate,
            SyncOutcome::Failed { error } => SyncEvent::Failed(error.clone()),
            SyncOutcome::AlreadyRunning => return,
        };
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Submit a freshly added quote in the background. Failures are only logged.
pub fn submit_in_background(remote: Arc<dyn RemoteGateway>, quote: Quote) {
    tokio::spawn(async move {
        match remote.submit_item(&quote).await {
            Ok(()) => log::debug!("[QUOTE_SYNC] Submitted new quote to remote"),
            Err(e) => log::warn!("[QUOTE_SYNC] Failed to submit quote: {}", e),
        }
    });
}
