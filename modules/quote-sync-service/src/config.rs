use quote_sync_types::DedupKey;
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_REMOTE_URL: &str = "https://jsonplaceholder.typicode.com/posts";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_path: String,
    pub remote_url: String,
    pub sync_interval_secs: u64,
    pub page_size: usize,
    pub request_timeout_secs: u64,
    pub dedup_key: DedupKey,
    pub auto_sync: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 9103,
            data_path: "./quotes.json".to_string(),
            remote_url: DEFAULT_REMOTE_URL.to_string(),
            sync_interval_secs: 30,
            page_size: 5,
            request_timeout_secs: 10,
            dedup_key: DedupKey::Text,
            auto_sync: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset or unparseable values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        Self {
            port: parse_or(&lookup, "QUOTE_SYNC_PORT", d.port),
            data_path: lookup("QUOTE_SYNC_DATA_PATH").unwrap_or(d.data_path),
            remote_url: lookup("QUOTE_SYNC_REMOTE_URL").unwrap_or(d.remote_url),
            sync_interval_secs: parse_or(&lookup, "QUOTE_SYNC_INTERVAL_SECS", d.sync_interval_secs),
            page_size: parse_or(&lookup, "QUOTE_SYNC_PAGE_SIZE", d.page_size),
            request_timeout_secs: parse_or(
                &lookup,
                "QUOTE_SYNC_TIMEOUT_SECS",
                d.request_timeout_secs,
            ),
            dedup_key: match lookup("QUOTE_SYNC_DEDUP_KEY") {
                Some(raw) => DedupKey::parse(&raw).unwrap_or_else(|| {
                    log::warn!(
                        "QUOTE_SYNC_DEDUP_KEY='{}' is not 'text' or 'text_author', using 'text'",
                        raw
                    );
                    d.dedup_key
                }),
                None => d.dedup_key,
            },
            auto_sync: parse_or(&lookup, "QUOTE_SYNC_AUTO_SYNC", d.auto_sync),
        }
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("{}='{}' is not valid, using default", key, raw);
            default
        }),
        None => default,
    }
}
