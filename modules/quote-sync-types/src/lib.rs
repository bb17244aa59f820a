//! Shared types for the quote sync service and its RPC clients.

use serde::{Deserialize, Serialize};

/// Sentinel category meaning "no filter".
pub const ALL_CATEGORIES: &str = "all";

/// Category assigned to every quote pulled from the remote collection.
pub const IMPORTED_CATEGORY: &str = "Imported";

// =====================================================
// Domain Types
// =====================================================

/// A single quote. Compared by value; there is no surrogate id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub category: String,
}

impl Quote {
    pub fn new(text: impl Into<String>, author: Option<&str>, category: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            author: author.map(|a| a.to_string()),
            category: category.into(),
        }
    }
}

/// Which fields decide whether two quotes are the same.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupKey {
    #[default]
    Text,
    TextAndAuthor,
}

impl DedupKey {
    /// Borrowed key of `quote` under this policy.
    pub fn key_of<'a>(&self, quote: &'a Quote) -> (&'a str, Option<&'a str>) {
        match self {
            DedupKey::Text => (quote.text.as_str(), None),
            DedupKey::TextAndAuthor => (quote.text.as_str(), quote.author.as_deref()),
        }
    }

    pub fn same(&self, a: &Quote, b: &Quote) -> bool {
        self.key_of(a) == self.key_of(b)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Some(DedupKey::Text),
            "text_author" | "text+author" => Some(DedupKey::TextAndAuthor),
            _ => None,
        }
    }
}

/// Phase of the reconciliation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Fetching,
    Merging,
}

/// How a single reconcile call ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// New remote quotes were merged into the collection
    Synced { new_items: usize },
    /// Remote had nothing the collection lacks
    UpToDate,
    /// Fetch failed; the collection was left untouched
    Failed { error: String },
    /// Another reconcile was in flight, nothing was done
    AlreadyRunning,
}

impl SyncOutcome {
    /// Human readable status line.
    pub fn message(&self) -> String {
        match self {
            SyncOutcome::Synced { new_items: 1 } => "1 new item synced".to_string(),
            SyncOutcome::Synced { new_items } => format!("{} new items synced", new_items),
            SyncOutcome::UpToDate => "up to date".to_string(),
            SyncOutcome::Failed { error } => format!("sync failed: {}", error),
            SyncOutcome::AlreadyRunning => "sync already in progress".to_string(),
        }
    }
}

/// Terminal status of the last completed reconcile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub outcome: SyncOutcome,
    pub message: String,
    pub finished_at: String,
}

/// Result of a bulk import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
    pub received: usize,
    pub added: usize,
}

// =====================================================
// RPC Request Types
// =====================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct AddQuoteRequest {
    pub text: String,
    pub author: Option<String>,
    pub category: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilterQuotesRequest {
    pub category: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RandomQuoteRequest {
    pub category: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SelectCategoryRequest {
    pub category: String,
}

/// Raw file content, exactly as read by the import dialog.
#[derive(Debug, Serialize, Deserialize)]
pub struct ImportRequest {
    pub content: String,
}

// =====================================================
// RPC Response Types
// =====================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> RpcResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

// =====================================================
// Service Status
// =====================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub running: bool,
    pub uptime_secs: u64,
    pub total_quotes: usize,
    pub total_categories: usize,
    pub selected_category: String,
    pub sync_state: SyncState,
    pub last_sync: Option<SyncReport>,
    pub auto_sync: bool,
    pub sync_interval_secs: u64,
}
