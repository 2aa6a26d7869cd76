//! Bulk upsert of release documents into the remote search index over HTTP.
//!
//! Grounded on the API service's `search.py` (OpenSearch client against the
//! `nzbidx-releases-v1` alias) and the crate's existing `reqwest::Client` usage in
//! `rss_manager::RssManager::new` for client construction conventions. The remote index
//! is treated as a black box: only its HTTP bulk and delete endpoints are touched.

use serde::Serialize;
use tracing::warn;

use crate::types::Release;
use crate::Result;

const INDEX_ALIAS: &str = "nzbidx-releases-v1";

/// One release flattened into the document shape the search index stores.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseDocument {
    pub norm_title: String,
    pub category: u32,
    pub language: String,
    pub tags: Vec<String>,
    pub source_group: String,
    pub size_bytes: u64,
    pub posted_at: Option<chrono::DateTime<chrono::Utc>>,
    pub has_parts: bool,
    pub part_count: usize,
}

impl ReleaseDocument {
    pub fn from_release(release: &Release) -> Self {
        Self {
            norm_title: release.norm_title.clone(),
            category: release.category_id,
            language: release.language.clone(),
            tags: release.tags.clone(),
            source_group: release.source_group.clone(),
            size_bytes: release.size_bytes,
            posted_at: release.posted_at,
            has_parts: release.has_parts(),
            part_count: release.part_count(),
        }
    }
}

/// Bulk-indexes release documents into the remote search engine's alias.
#[derive(Clone)]
pub struct SearchIndexer {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl SearchIndexer {
    /// `base_url` of `None` disables indexing entirely; [`bulk`](Self::bulk) then
    /// becomes a no-op that always reports success.
    pub fn new(base_url: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("nzbidx-ingest search indexer")
            .build()
            .map_err(|e| crate::Error::Other(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    /// Upsert `docs` keyed by dedupe key. Returns `Ok(())` as long as the bulk
    /// transport request itself succeeded; failures for individual documents inside
    /// the response body are logged, not propagated.
    pub async fn bulk(&self, docs: &[(String, ReleaseDocument)]) -> Result<()> {
        let Some(base_url) = &self.base_url else {
            return Ok(());
        };
        if docs.is_empty() {
            return Ok(());
        }

        let mut body = String::new();
        for (dedupe_key, doc) in docs {
            let action = serde_json::json!({"index": {"_index": INDEX_ALIAS, "_id": dedupe_key}});
            body.push_str(&action.to_string());
            body.push('\n');
            body.push_str(&serde_json::to_string(doc).unwrap_or_default());
            body.push('\n');
        }

        let url = format!("{base_url}/_bulk");
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/x-ndjson")
            .body(body)
            .send()
            .await
            .map_err(|e| crate::Error::Other(format!("Bulk index request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(crate::Error::Other(format!(
                "Bulk index request returned {}",
                response.status()
            )));
        }

        if let Ok(parsed) = response.json::<serde_json::Value>().await {
            log_item_errors(&parsed);
        }

        Ok(())
    }

    /// Delete a single document by its dedupe key. Missing documents are not an error.
    pub async fn delete(&self, dedupe_key: &str) -> Result<()> {
        let Some(base_url) = &self.base_url else {
            return Ok(());
        };

        let url = format!("{base_url}/{INDEX_ALIAS}/_doc/{dedupe_key}");
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| crate::Error::Other(format!("Delete request failed: {e}")))?;

        if !response.status().is_success() && response.status().as_u16() != 404 {
            return Err(crate::Error::Other(format!(
                "Delete request for {dedupe_key} returned {}",
                response.status()
            )));
        }

        Ok(())
    }

    /// Delete every document matching `ids`, tolerating individual failures the same
    /// way `bulk` does.
    pub async fn delete_many(&self, ids: &[String]) -> Result<()> {
        for id in ids {
            if let Err(e) = self.delete(id).await {
                warn!(dedupe_key = %id, error = %e, "failed to delete search document");
            }
        }
        Ok(())
    }
}

fn log_item_errors(response: &serde_json::Value) {
    let Some(items) = response.get("items").and_then(|v| v.as_array()) else {
        return;
    };
    for item in items {
        let Some(index_result) = item.get("index") else { continue };
        if let Some(error) = index_result.get("error") {
            warn!(error = %error, "search index rejected one document");
        }
    }
}
