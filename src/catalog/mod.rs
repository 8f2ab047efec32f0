//! Game catalog download, merge, and search.
//!
//! The catalog is the union of several JSON list endpoints. Entries are
//! normalized (`icon_hash` becomes `icon`), entries without a string `id`
//! are dropped, and the first occurrence of each id wins.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{info, info_span, warn, Instrument};

use crate::config::CatalogConfig;
use crate::models::game::GameRef;
use crate::{AppError, Result};

/// Shared, refreshable copy of the downloaded catalog.
pub type CatalogCache = Arc<RwLock<Vec<GameRef>>>;

/// HTTP client for the configured catalog sources.
pub struct CatalogClient {
    http: reqwest::Client,
    sources: Vec<String>,
}

impl CatalogClient {
    /// Build a client for the sources in `config`.
    #[must_use]
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            sources: config.sources.clone(),
        }
    }

    /// Download and merge every source.
    ///
    /// A source that fails to download or decode is logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Catalog` only when every source failed.
    pub async fn fetch(&self) -> Result<Vec<GameRef>> {
        let mut lists = Vec::with_capacity(self.sources.len());
        let mut failures = 0usize;

        for url in &self.sources {
            let span = info_span!("catalog_source", url = %url);
            match self.fetch_source(url).instrument(span).await {
                Ok(list) => lists.push(list),
                Err(err) => {
                    failures += 1;
                    warn!(url = %url, %err, "catalog source failed");
                }
            }
        }

        if !self.sources.is_empty() && failures == self.sources.len() {
            return Err(AppError::Catalog("all catalog sources failed".into()));
        }

        let games = merge_sources(lists);
        info!(count = games.len(), "catalog loaded");
        Ok(games)
    }

    async fn fetch_source(&self, url: &str) -> Result<Vec<Value>> {
        let list = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Value>>()
            .await?;
        Ok(list)
    }
}

/// Merge raw source lists into de-duplicated game references.
#[must_use]
pub fn merge_sources(lists: Vec<Vec<Value>>) -> Vec<GameRef> {
    let mut seen = HashSet::new();
    let mut games = Vec::new();

    for mut entry in lists.into_iter().flatten() {
        normalize_icon(&mut entry);

        let Some(id) = entry.get("id").and_then(Value::as_str).map(str::to_owned) else {
            continue;
        };
        if seen.contains(&id) {
            continue;
        }

        match serde_json::from_value::<GameRef>(entry) {
            Ok(game) => {
                seen.insert(id);
                games.push(game);
            }
            Err(err) => warn!(game_id = %id, %err, "skipping malformed catalog entry"),
        }
    }

    games
}

fn normalize_icon(entry: &mut Value) {
    let has_icon = entry.get("icon").is_some_and(|v| !v.is_null());
    if has_icon {
        return;
    }
    if let Some(hash) = entry.get("icon_hash").and_then(Value::as_str).map(str::to_owned) {
        entry["icon"] = Value::String(hash);
    }
}

/// Games whose name contains `query`, case-insensitively.
///
/// Custom games come first. A blank query matches nothing.
#[must_use]
pub fn search(query: &str, custom: &[GameRef], catalog: &[GameRef]) -> Vec<GameRef> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    custom
        .iter()
        .chain(catalog)
        .filter(|game| game.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Find a game by id, preferring custom entries over the catalog.
#[must_use]
pub fn find_by_id<'a>(id: &str, custom: &'a [GameRef], catalog: &'a [GameRef]) -> Option<&'a GameRef> {
    custom.iter().chain(catalog).find(|game| game.id == id)
}
