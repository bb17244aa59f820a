//! Local-first quote store backed by a single JSON snapshot file.
//!
//! The in-memory collection is authoritative. Every mutation writes the whole
//! collection to disk first and only then swaps it in, so a failed write leaves
//! both memory and the snapshot untouched.

use crate::categories::{self, CategoryIndex};
use crate::error::{QuoteError, Result};
use quote_sync_types::{ALL_CATEGORIES, DedupKey, ImportSummary, Quote};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Starter quotes used when no readable snapshot exists.
pub fn seed_quotes() -> Vec<Quote> {
    vec![
        Quote::new(
            "The only limit to our realization of tomorrow is our doubts of today.",
            Some("Franklin D. Roosevelt"),
            "Motivation",
        ),
        Quote::new(
            "Life is what happens when you're busy making other plans.",
            Some("John Lennon"),
            "Life",
        ),
        Quote::new(
            "The best way to get started is to quit talking and begin doing.",
            None,
            "Motivation",
        ),
        Quote::new(
            "Success is not the key to happiness. Happiness is the key to success.",
            None,
            "Success",
        ),
        Quote::new(
            "Your time is limited, so don’t waste it living someone else’s life.",
            None,
            "Life",
        ),
    ]
}

#[derive(Debug, Serialize, Deserialize)]
struct Preferences {
    selected_category: String,
}

struct StoreInner {
    quotes: Vec<Quote>,
    index: CategoryIndex,
    selected_category: String,
    // Browsing position within the selected category; session only.
    cursor: usize,
    last_viewed: Option<Quote>,
}

pub struct Store {
    path: PathBuf,
    prefs_path: PathBuf,
    dedup: DedupKey,
    inner: Mutex<StoreInner>,
}

impl Store {
    /// Open the snapshot at `path`, healing to the seed quotes when it is
    /// missing or unreadable.
    pub fn load(path: impl AsRef<Path>, dedup: DedupKey) -> Self {
        let path = path.as_ref().to_path_buf();
        let prefs_path = path.with_extension("prefs.json");

        let (quotes, needs_write) = match read_snapshot(&path) {
            Ok(Some(loaded)) => {
                let (valid, reshaped) = normalize_loaded(loaded);
                let before = valid.len();
                let quotes = dedup_all(valid, dedup);
                let dropped = before - quotes.len();
                if dropped > 0 {
                    log::warn!(
                        "[QUOTE_STORE] Dropped {} duplicate quote(s) from snapshot",
                        dropped
                    );
                }
                (quotes, reshaped || dropped > 0)
            }
            Ok(None) => {
                log::info!(
                    "[QUOTE_STORE] No snapshot at {}, starting from seed quotes",
                    path.display()
                );
                (seed_quotes(), true)
            }
            Err(e) => {
                log::warn!(
                    "[QUOTE_STORE] Unreadable snapshot at {} ({}), falling back to seed quotes",
                    path.display(),
                    e
                );
                (seed_quotes(), true)
            }
        };

        if needs_write {
            if let Err(e) = write_snapshot(&path, &quotes) {
                log::error!("[QUOTE_STORE] Failed to persist snapshot: {}", e);
            }
        }

        let selected_category = read_preferences(&prefs_path)
            .map(|p| p.selected_category)
            .unwrap_or_else(|| ALL_CATEGORIES.to_string());

        log::info!(
            "[QUOTE_STORE] Loaded {} quotes from {}",
            quotes.len(),
            path.display()
        );

        Self {
            path,
            prefs_path,
            dedup,
            inner: Mutex::new(StoreInner {
                index: CategoryIndex::build(&quotes),
                quotes,
                selected_category,
                cursor: 0,
                last_viewed: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn all(&self) -> Vec<Quote> {
        self.lock().quotes.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().quotes.len()
    }

    /// Write the current collection to the snapshot.
    pub fn persist(&self) -> Result<()> {
        let inner = self.lock();
        write_snapshot(&self.path, &inner.quotes)
    }

    /// Validate and append a user-entered quote. Returns the stored form.
    pub fn append(&self, quote: Quote) -> Result<Quote> {
        let quote = normalize(quote)?;
        let mut inner = self.lock();

        if inner.quotes.iter().any(|q| self.dedup.same(q, &quote)) {
            return Err(QuoteError::Validation(
                "this quote is already in the collection".to_string(),
            ));
        }

        let mut next = inner.quotes.clone();
        next.push(quote.clone());
        write_snapshot(&self.path, &next)?;

        inner.quotes = next;
        let StoreInner { quotes, index, .. } = &mut *inner;
        index.refresh(quotes);

        log::info!(
            "[QUOTE_STORE] Added quote in '{}' ({} total)",
            quote.category,
            inner.quotes.len()
        );
        Ok(quote)
    }

    /// Append every quote from `incoming` whose key is not yet present,
    /// keeping both sides in their original order. Returns what was added.
    pub fn merge(&self, incoming: Vec<Quote>) -> Result<Vec<Quote>> {
        let mut inner = self.lock();

        let mut added: Vec<Quote> = Vec::new();
        for quote in incoming {
            let known = inner.quotes.iter().any(|q| self.dedup.same(q, &quote))
                || added.iter().any(|q| self.dedup.same(q, &quote));
            if !known {
                added.push(quote);
            }
        }

        if added.is_empty() {
            return Ok(added);
        }

        let mut next = inner.quotes.clone();
        next.extend(added.iter().cloned());
        write_snapshot(&self.path, &next)?;

        inner.quotes = next;
        let StoreInner { quotes, index, .. } = &mut *inner;
        index.refresh(quotes);
        Ok(added)
    }

    /// Import a JSON array of quotes. All-or-nothing: any malformed input or
    /// invalid element rejects the whole payload.
    pub fn import(&self, content: &str) -> Result<ImportSummary> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        if !value.is_array() {
            return Err(QuoteError::Parse("expected a JSON array of quotes".to_string()));
        }
        let raw: Vec<Quote> = serde_json::from_value(value)?;
        let received = raw.len();

        let quotes = raw
            .into_iter()
            .enumerate()
            .map(|(i, q)| {
                normalize(q).map_err(|e| match e {
                    QuoteError::Validation(msg) => {
                        QuoteError::Validation(format!("entry {}: {}", i, msg))
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let added = self.merge(quotes)?;
        log::info!(
            "[QUOTE_STORE] Imported {} of {} quote(s)",
            added.len(),
            received
        );
        Ok(ImportSummary {
            received,
            added: added.len(),
        })
    }

    /// Snapshot-shaped JSON of the whole collection.
    pub fn export(&self) -> Result<String> {
        let inner = self.lock();
        Ok(serde_json::to_string_pretty(&inner.quotes)?)
    }

    pub fn categories(&self) -> Vec<String> {
        self.lock().index.categories().to_vec()
    }

    pub fn category_count(&self) -> usize {
        self.lock().index.len()
    }

    pub fn filter(&self, category: &str) -> Vec<Quote> {
        categories::filter(&self.lock().quotes, category)
    }

    /// Uniformly random quote from `category`, or from the selected category
    /// when none is given.
    pub fn random(&self, category: Option<&str>) -> Option<Quote> {
        let mut inner = self.lock();
        let category = category.unwrap_or(inner.selected_category.as_str());
        let pool = categories::filter(&inner.quotes, category);
        let picked = pool.choose(&mut rand::thread_rng()).cloned();
        if picked.is_some() {
            inner.last_viewed = picked.clone();
        }
        picked
    }

    /// Step to the next quote in the selected category, wrapping at the end.
    pub fn next_quote(&self) -> Option<Quote> {
        let mut inner = self.lock();
        let pool = categories::filter(&inner.quotes, &inner.selected_category);
        if pool.is_empty() {
            return None;
        }
        inner.cursor = (inner.cursor + 1) % pool.len();
        let quote = pool[inner.cursor].clone();
        inner.last_viewed = Some(quote.clone());
        Some(quote)
    }

    /// The quote last handed out by `random` or `next_quote`, falling back to
    /// the quote under the cursor.
    pub fn current_quote(&self) -> Option<Quote> {
        let inner = self.lock();
        if let Some(quote) = &inner.last_viewed {
            return Some(quote.clone());
        }
        let pool = categories::filter(&inner.quotes, &inner.selected_category);
        if pool.is_empty() {
            return None;
        }
        Some(pool[inner.cursor % pool.len()].clone())
    }

    pub fn selected_category(&self) -> String {
        self.lock().selected_category.clone()
    }

    pub fn select_category(&self, category: &str) -> Result<()> {
        let category = category.trim();
        if category.is_empty() {
            return Err(QuoteError::Validation("category is required".to_string()));
        }

        let mut inner = self.lock();
        if !inner.index.contains(category) {
            log::debug!(
                "[QUOTE_STORE] Selected category '{}' has no quotes yet",
                category
            );
        }
        let prefs = Preferences {
            selected_category: category.to_string(),
        };
        write_atomic(&self.prefs_path, &serde_json::to_string_pretty(&prefs)?)?;
        inner.selected_category = category.to_string();
        inner.cursor = 0;
        Ok(())
    }
}

/// Trim fields and reject empty required ones. A blank author becomes `None`.
fn normalize(quote: Quote) -> Result<Quote> {
    let text = quote.text.trim();
    let category = quote.category.trim();
    if text.is_empty() {
        return Err(QuoteError::Validation("text is required".to_string()));
    }
    if category.is_empty() {
        return Err(QuoteError::Validation("category is required".to_string()));
    }
    let author = quote
        .author
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty());
    Ok(Quote::new(text, author, category))
}

/// Run snapshot entries through the same rules as user input. Invalid
/// entries are dropped; the flag is set when anything was dropped or trimmed.
fn normalize_loaded(loaded: Vec<Quote>) -> (Vec<Quote>, bool) {
    let mut changed = false;
    let mut valid = Vec::with_capacity(loaded.len());
    for (i, raw) in loaded.into_iter().enumerate() {
        match normalize(raw.clone()) {
            Ok(quote) => {
                changed |= quote != raw;
                valid.push(quote);
            }
            Err(e) => {
                log::warn!("[QUOTE_STORE] Dropping snapshot entry {}: {}", i, e);
                changed = true;
            }
        }
    }
    (valid, changed)
}

fn dedup_all(quotes: Vec<Quote>, dedup: DedupKey) -> Vec<Quote> {
    let mut out: Vec<Quote> = Vec::with_capacity(quotes.len());
    for q in quotes {
        if !out.iter().any(|existing| dedup.same(existing, &q)) {
            out.push(q);
        }
    }
    out
}

fn read_snapshot(path: &Path) -> Result<Option<Vec<Quote>>> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let quotes: Vec<Quote> = serde_json::from_str(&content)?;
    Ok(Some(quotes))
}

fn read_preferences(path: &Path) -> Option<Preferences> {
    let content = fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

fn write_snapshot(path: &Path, quotes: &[Quote]) -> Result<()> {
    let json = serde_json::to_string_pretty(quotes)?;
    write_atomic(path, &json)
}

/// Write to a sibling temp file, then rename over the target.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open(dir: &TempDir) -> Store {
        Store::load(dir.path().join("quotes.json"), DedupKey::Text)
    }

    fn snapshot(store: &Store) -> Vec<Quote> {
        let content = fs::read_to_string(store.path()).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    #[test]
    fn test_load_missing_snapshot_seeds_and_persists() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        assert_eq!(store.all(), seed_quotes());
        assert_eq!(snapshot(&store), seed_quotes());
    }

    #[test]
    fn test_load_malformed_snapshot_heals() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quotes.json");
        fs::write(&path, "{not json").unwrap();

        let store = Store::load(&path, DedupKey::Text);
        assert_eq!(store.all(), seed_quotes());
        assert_eq!(snapshot(&store), seed_quotes());
    }

    #[test]
    fn test_load_existing_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quotes.json");
        fs::write(&path, r#"[{"text":"A","category":"X"}]"#).unwrap();

        let store = Store::load(&path, DedupKey::Text);
        assert_eq!(store.all(), vec![Quote::new("A", None, "X")]);
    }

    #[test]
    fn test_load_drops_duplicate_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quotes.json");
        fs::write(
            &path,
            r#"[{"text":"A","category":"X"},{"text":"A","category":"Y"}]"#,
        )
        .unwrap();

        let store = Store::load(&path, DedupKey::Text);
        assert_eq!(store.len(), 1);
        assert_eq!(snapshot(&store).len(), 1);
    }

    #[test]
    fn test_load_drops_invalid_and_trims_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quotes.json");
        fs::write(
            &path,
            r#"[{"text":"","category":""},{"text":"A","category":"X"},{"text":"A ","category":"X"}]"#,
        )
        .unwrap();

        let store = Store::load(&path, DedupKey::Text);
        assert_eq!(store.all(), vec![Quote::new("A", None, "X")]);
        assert_eq!(store.categories(), vec!["all", "X"]);
        assert_eq!(snapshot(&store), vec![Quote::new("A", None, "X")]);
    }

    #[test]
    fn test_load_trims_untrimmed_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quotes.json");
        fs::write(
            &path,
            r#"[{"text":"  B  ","author":" ","category":" Life "},{"text":"C","category":"  "}]"#,
        )
        .unwrap();

        let store = Store::load(&path, DedupKey::Text);
        let expected = vec![Quote::new("B", None, "Life")];
        assert_eq!(store.all(), expected);
        assert_eq!(snapshot(&store), expected);
    }

    #[test]
    fn test_seed_text_kept_verbatim() {
        let seeds = seed_quotes();
        assert_eq!(
            seeds[4].text,
            "Your time is limited, so don\u{2019}t waste it living someone else\u{2019}s life."
        );
    }

    #[test]
    fn test_append_persists() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let stored = store
            .append(Quote::new("  Stay hungry.  ", Some("  "), " Life "))
            .unwrap();

        assert_eq!(stored, Quote::new("Stay hungry.", None, "Life"));
        assert_eq!(store.all().last(), Some(&stored));
        assert_eq!(snapshot(&store).last(), Some(&stored));
    }

    #[test]
    fn test_append_empty_text_rejected_without_mutation() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let before = store.all();

        let err = store.append(Quote::new("", None, "X")).unwrap_err();
        assert!(matches!(err, QuoteError::Validation(_)));
        assert_eq!(store.all(), before);
        assert_eq!(snapshot(&store), before);
    }

    #[test]
    fn test_append_whitespace_category_rejected() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let err = store.append(Quote::new("text", None, "   ")).unwrap_err();
        assert!(matches!(err, QuoteError::Validation(_)));
    }

    #[test]
    fn test_append_duplicate_rejected() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let first = seed_quotes().remove(0);
        let err = store
            .append(Quote::new(first.text, None, "Other"))
            .unwrap_err();
        assert!(matches!(err, QuoteError::Validation(_)));
        assert_eq!(store.len(), seed_quotes().len());
    }

    #[test]
    fn test_append_refreshes_categories() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.append(Quote::new("New one", None, "Humor")).unwrap();
        assert_eq!(store.categories().last().map(String::as_str), Some("Humor"));
    }

    #[test]
    fn test_merge_skips_known_and_batch_duplicates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quotes.json");
        fs::write(&path, r#"[{"text":"A","category":"X"}]"#).unwrap();
        let store = Store::load(&path, DedupKey::Text);

        let added = store
            .merge(vec![
                Quote::new("A", None, "Imported"),
                Quote::new("B", None, "Imported"),
                Quote::new("B", None, "Imported"),
                Quote::new("C", None, "Imported"),
            ])
            .unwrap();

        let texts: Vec<String> = store.all().into_iter().map(|q| q.text).collect();
        assert_eq!(added.len(), 2);
        assert_eq!(texts, vec!["A", "B", "C"]);
        assert_eq!(snapshot(&store).len(), 3);
    }

    #[test]
    fn test_merge_text_and_author_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quotes.json");
        fs::write(&path, r#"[{"text":"A","author":"Ann","category":"X"}]"#).unwrap();
        let store = Store::load(&path, DedupKey::TextAndAuthor);

        let added = store
            .merge(vec![Quote::new("A", Some("User 1"), "Imported")])
            .unwrap();
        assert_eq!(added.len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_import_malformed_rejected() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let before = store.all();

        let err = store.import("{not json").unwrap_err();
        assert!(matches!(err, QuoteError::Parse(_)));
        assert_eq!(store.all(), before);
    }

    #[test]
    fn test_import_non_array_rejected() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let err = store
            .import(r#"{"text":"A","category":"X"}"#)
            .unwrap_err();
        assert!(matches!(err, QuoteError::Parse(_)));
    }

    #[test]
    fn test_import_invalid_entry_rejects_everything() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let before = store.len();

        let err = store
            .import(r#"[{"text":"Fresh","category":"X"},{"text":"","category":"X"}]"#)
            .unwrap_err();
        assert!(matches!(err, QuoteError::Validation(ref m) if m.contains("entry 1")));
        assert_eq!(store.len(), before);
    }

    #[test]
    fn test_import_dedups() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let export = store.export().unwrap();

        let summary = store.import(&export).unwrap();
        assert_eq!(summary.received, seed_quotes().len());
        assert_eq!(summary.added, 0);

        let summary = store
            .import(r#"[{"text":"Fresh","author":"Me","category":"Mine"}]"#)
            .unwrap();
        assert_eq!(summary.added, 1);
        assert_eq!(store.len(), seed_quotes().len() + 1);
    }

    #[test]
    fn test_export_matches_snapshot_shape() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let exported: Vec<Quote> = serde_json::from_str(&store.export().unwrap()).unwrap();
        assert_eq!(exported, snapshot(&store));
    }

    #[test]
    fn test_random_respects_category() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        for _ in 0..10 {
            let q = store.random(Some("Success")).unwrap();
            assert_eq!(q.category, "Success");
        }
        assert!(store.random(Some("Nope")).is_none());
    }

    #[test]
    fn test_selected_category_survives_reload() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        assert_eq!(store.selected_category(), ALL_CATEGORIES);

        store.select_category("Life").unwrap();
        let reopened = open(&dir);
        assert_eq!(reopened.selected_category(), "Life");
        assert!(reopened.random(None).is_some_and(|q| q.category == "Life"));
    }

    #[test]
    fn test_next_quote_cycles_selected_category() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        assert_eq!(store.current_quote(), Some(seed_quotes().remove(0)));

        let texts: Vec<String> = (0..5).map(|_| store.next_quote().unwrap().text).collect();
        let seeds: Vec<String> = seed_quotes().into_iter().map(|q| q.text).collect();
        assert_eq!(texts[..4], seeds[1..]);
        assert_eq!(texts[4], seeds[0]);

        store.select_category("Life").unwrap();
        let life: Vec<String> = (0..3).map(|_| store.next_quote().unwrap().category).collect();
        assert!(life.iter().all(|c| c == "Life"));

        store.select_category("Nope").unwrap();
        assert!(store.next_quote().is_none());
    }

    #[test]
    fn test_current_quote_tracks_last_viewed() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        let picked = store.random(Some("Success")).unwrap();
        assert_eq!(store.current_quote(), Some(picked));

        let next = store.next_quote().unwrap();
        assert_eq!(store.current_quote(), Some(next));

        assert!(store.random(Some("Nope")).is_none());
        assert!(store.current_quote().is_some());
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.append(Quote::new("x", None, "y")).unwrap();
        assert!(!dir.path().join("quotes.json.tmp").exists());
    }
}
