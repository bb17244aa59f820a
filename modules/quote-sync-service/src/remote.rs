//! Remote collection gateway.
//!
//! Reads a page of posts from a JSON endpoint and maps them to quotes, and
//! submits newly added local quotes to the same endpoint. Nothing here touches
//! the local store.

use crate::error::{QuoteError, Result};
use async_trait::async_trait;
use quote_sync_types::{IMPORTED_CATEGORY, Quote};
use std::time::Duration;

/// Largest response body read from the remote. The posts page is a few KB.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Boundary to the remote collection.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    async fn fetch_remote_items(&self) -> Result<Vec<Quote>>;

    async fn submit_item(&self, quote: &Quote) -> Result<()>;
}

/// A record as served by the remote posts endpoint.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePost {
    pub user_id: Option<i64>,
    pub title: Option<String>,
    pub body: Option<String>,
}

impl RemotePost {
    /// Map to a quote, using the body and falling back to the title.
    pub fn into_quote(self) -> Option<Quote> {
        let text = self
            .body
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| self.title.as_deref().map(str::trim).filter(|s| !s.is_empty()))?
            .to_string();
        let author = self.user_id.map(|id| format!("User {}", id));
        Some(Quote {
            text,
            author,
            category: IMPORTED_CATEGORY.to_string(),
        })
    }
}

pub struct HttpRemoteGateway {
    url: String,
    page_size: usize,
    max_body_bytes: usize,
    client: reqwest::Client,
}

impl HttpRemoteGateway {
    pub fn new(url: &str, page_size: usize, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            page_size,
            max_body_bytes: MAX_BODY_BYTES,
            client,
        })
    }
}

#[async_trait]
impl RemoteGateway for HttpRemoteGateway {
    async fn fetch_remote_items(&self) -> Result<Vec<Quote>> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        let body = read_capped(response, self.max_body_bytes).await?;

        if !status.is_success() {
            return Err(QuoteError::Network(format!(
                "remote returned {}: {}",
                status,
                truncate_error(&String::from_utf8_lossy(&body))
            )));
        }

        let posts: Vec<RemotePost> = serde_json::from_slice(&body)
            .map_err(|e| QuoteError::Network(format!("invalid remote payload: {}", e)))?;

        Ok(map_posts(posts, self.page_size))
    }

    async fn submit_item(&self, quote: &Quote) -> Result<()> {
        let response = self.client.post(&self.url).json(quote).send().await?;

        let status = response.status();
        let body = read_capped(response, self.max_body_bytes)
            .await
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_default();

        if !status.is_success() {
            return Err(QuoteError::Network(format!(
                "remote rejected quote ({}): {}",
                status,
                truncate_error(&body)
            )));
        }

        log::debug!("[QUOTE_REMOTE] Posted quote, server said: {}", truncate_error(&body));
        Ok(())
    }
}

/// Read the response body, giving up once it grows past `limit` bytes.
async fn read_capped(mut response: reqwest::Response, limit: usize) -> Result<Vec<u8>> {
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(QuoteError::Network(format!(
                "remote response too large ({} bytes, limit {})",
                len, limit
            )));
        }
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if body.len() + chunk.len() > limit {
            return Err(QuoteError::Network(format!(
                "remote response too large (over {} bytes)",
                limit
            )));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Keep the first `page_size` posts that carry usable text.
pub fn map_posts(posts: Vec<RemotePost>, page_size: usize) -> Vec<Quote> {
    posts
        .into_iter()
        .filter_map(RemotePost::into_quote)
        .take(page_size)
        .collect()
}

fn truncate_error(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
