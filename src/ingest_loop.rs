//! Orchestrates one poll cycle across all configured groups.
//!
//! Ported tick-for-tick from the ingest service's `ingest_loop.py` `run_once`/
//! `run_forever`: per group, fetch a bounded XOVER batch, fold it through the
//! [`crate::deduper::Deduper`], upsert and index the result, advance the cursor, and
//! compute an adaptive delay before the next tick from aggregate latency and backlog.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::circuit_breaker::{CallError, CircuitBreaker};
use crate::config::{Config, IngestConfig};
use crate::db::Database;
use crate::deduper::{Deduper, IngestedHeader};
use crate::nntp_client::NntpClient;
use crate::search_indexer::{ReleaseDocument, SearchIndexer};
use crate::Result;

/// Per-tick outcome, used to compute the adaptive sleep.
#[derive(Default, Debug, Clone, Copy)]
struct TickMetrics {
    processed: u64,
    remaining: u64,
    avg_db_ms: f64,
    avg_search_ms: f64,
}

/// The orchestrator tying NNTP, the deduper, storage, and search together.
pub struct IngestLoop {
    client: Arc<NntpClient>,
    db: Database,
    search: SearchIndexer,
    db_breaker: CircuitBreaker,
    search_breaker: CircuitBreaker,
    config: Config,
    group_failures: tokio::sync::Mutex<HashMap<String, u32>>,
    worker_index: u32,
    worker_count: u32,
}

impl IngestLoop {
    pub fn new(client: Arc<NntpClient>, db: Database, search: SearchIndexer, config: Config) -> Self {
        Self::sharded(client, db, search, config, 0, 1)
    }

    /// Build a loop that only processes the subset of groups hashing to `worker_index`
    /// out of `worker_count` workers (see [`shard_for_group`]). `worker_count <= 1`
    /// processes every group, matching [`Self::new`].
    pub fn sharded(
        client: Arc<NntpClient>,
        db: Database,
        search: SearchIndexer,
        config: Config,
        worker_index: u32,
        worker_count: u32,
    ) -> Self {
        let cb = &config.circuit_breaker;
        let reset = Duration::from_secs_f64(cb.reset_seconds);
        let jitter = Duration::from_millis(cb.jitter_ms);
        let base_backoff = cb.retry.initial_delay;

        Self {
            client,
            db,
            search,
            db_breaker: CircuitBreaker::new(
                "db",
                cb.failure_threshold,
                reset,
                cb.retry.max_attempts,
                base_backoff,
                jitter,
            ),
            search_breaker: CircuitBreaker::new(
                "search",
                cb.failure_threshold,
                reset,
                cb.retry.max_attempts,
                base_backoff,
                jitter,
            ),
            config,
            group_failures: tokio::sync::Mutex::new(HashMap::new()),
            worker_index,
            worker_count,
        }
    }

    fn ingest_config(&self) -> &IngestConfig {
        &self.config.ingest
    }

    /// Run a single poll cycle across every surviving group, returning the delay to
    /// wait before the next tick.
    pub async fn run_once(&self) -> Result<Duration> {
        let groups = self.active_groups().await?;
        if groups.is_empty() {
            info!("ingest_no_groups");
            return Ok(Duration::from_secs(self.ingest_config().poll_max_seconds));
        }

        let mut total_processed = 0u64;
        let mut total_remaining = 0u64;
        let mut db_latencies_ms = Vec::new();
        let mut search_latencies_ms = Vec::new();

        for group in &groups {
            match self.process_group(group).await {
                Ok(metrics) => {
                    total_processed += metrics.processed;
                    total_remaining += metrics.remaining;
                    if metrics.avg_db_ms > 0.0 {
                        db_latencies_ms.push(metrics.avg_db_ms);
                    }
                    if metrics.avg_search_ms > 0.0 {
                        search_latencies_ms.push(metrics.avg_search_ms);
                    }
                }
                Err(e) => {
                    warn!(group = %group, error = %e, "ingest_group_failure");
                }
            }
        }

        let avg_db = average(&db_latencies_ms);
        let avg_search = average(&search_latencies_ms);
        Ok(self.adaptive_sleep(total_processed, total_remaining, avg_db, avg_search).await)
    }

    /// Repeat [`run_once`](Self::run_once) until `stop` is cancelled.
    pub async fn run_forever(&self, stop: CancellationToken) {
        let cfg = self.ingest_config();
        let poll_min = Duration::from_secs(cfg.poll_min_seconds);
        let poll_max = Duration::from_secs(cfg.poll_max_seconds);

        while !stop.is_cancelled() {
            let delay = match self.run_once().await {
                Ok(delay) => delay.clamp(poll_min, poll_max),
                Err(e) => {
                    warn!(error = %e, "ingest_loop_failure");
                    poll_max
                }
            };

            tokio::select! {
                _ = stop.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn active_groups(&self) -> Result<Vec<String>> {
        let nntp = &self.config.nntp;
        let mut groups = if let Some(explicit) = &nntp.groups {
            explicit.clone()
        } else {
            self.client.list_groups(&nntp.group_wildcard).await
        };

        for ignored in &nntp.ignore_groups {
            if let Err(e) = self.db.delete_by_group(ignored).await {
                warn!(group = %ignored, error = %e, "failed to prune ignored group");
            }
        }
        groups.retain(|g| !nntp.ignore_groups.contains(g));
        if self.worker_count > 1 {
            groups.retain(|g| shard_for_group(g, self.worker_count) == self.worker_index);
        }

        let cursors = self.db.get_cursors(&groups).await?;
        let now = chrono::Utc::now();
        groups.retain(|g| match cursors.get(g).and_then(|c| c.irrelevant_until) {
            Some(until) => now >= until,
            None => true,
        });

        Ok(groups)
    }

    async fn process_group(&self, group: &str) -> Result<TickMetrics> {
        let group_key = group.to_string();
        let cursors = self.db.get_cursors(std::slice::from_ref(&group_key)).await?;
        let last = cursors.get(group).map(|c| c.last_article).unwrap_or(0);

        let high = self.client.high_water_mark(group).await;
        if high == 0 {
            self.db.schedule_probe(group, to_chrono_duration(self.ingest_config().irrelevant_ttl)).await?;
            return Ok(TickMetrics::default());
        }

        let remaining = high.saturating_sub(last);
        let ingest_cfg = self.ingest_config();
        let batch =
            remaining.clamp(ingest_cfg.batch_min as u64, ingest_cfg.batch_max as u64).max(1);
        let start = last + 1;
        let end = start + batch - 1;

        let headers = self.client.xover(group, start, end).await;
        if headers.is_empty() {
            self.note_group_outcome(group, false).await;
            if high > 0 {
                self.db
                    .mark_irrelevant(group, to_chrono_duration(self.ingest_config().irrelevant_ttl))
                    .await?;
            }
            return Ok(TickMetrics { remaining, ..Default::default() });
        }
        self.note_group_outcome(group, true).await;

        let mut deduper = Deduper::new(ingest_cfg.detect_language);
        let processed = headers.len() as u64;
        let max_seen = headers.iter().map(|h| h.article_number).max().unwrap_or(last);

        for header in headers {
            deduper.ingest(IngestedHeader {
                group: group.to_string(),
                subject: header.subject,
                message_id: crate::segment_schema::strip_angle_brackets(&header.message_id),
                posted_at: parse_nntp_date(&header.date),
                bytes: header.bytes,
            });
        }

        let releases = deduper.finish(&self.db).await?;
        if releases.is_empty() {
            self.db.set_cursor(group, max_seen).await?;
            return Ok(TickMetrics {
                processed,
                remaining: high.saturating_sub(max_seen),
                ..Default::default()
            });
        }

        let db_start = tokio::time::Instant::now();
        let db = &self.db;
        let releases_ref = &releases;
        let inserted = self
            .db_breaker
            .call(|| async { db.upsert_releases(releases_ref).await })
            .await
            .map_err(call_error_to_crate_error)?;
        let db_elapsed_ms = db_start.elapsed().as_secs_f64() * 1000.0;

        let docs: Vec<(String, ReleaseDocument)> = releases
            .iter()
            .filter(|r| inserted.contains(&r.dedupe_key()))
            .map(|r| (r.dedupe_key(), ReleaseDocument::from_release(r)))
            .collect();

        let search_start = tokio::time::Instant::now();
        let search = &self.search;
        let docs_ref = &docs;
        let _ = self
            .search_breaker
            .call(|| async { search.bulk(docs_ref).await })
            .await
            .map_err(|e| warn!(group = %group, error = %e, "ingest_search_failure"));
        let search_elapsed_ms = search_start.elapsed().as_secs_f64() * 1000.0;

        self.db.set_cursor(group, max_seen).await?;

        if ingest_cfg.log_every > 0 {
            debug!(group, processed, inserted = inserted.len(), "ingest_batch");
        }

        Ok(TickMetrics {
            processed,
            remaining: high.saturating_sub(max_seen),
            avg_db_ms: if processed > 0 { db_elapsed_ms / processed as f64 } else { 0.0 },
            avg_search_ms: if !docs.is_empty() {
                search_elapsed_ms / docs.len() as f64
            } else {
                0.0
            },
        })
    }

    async fn note_group_outcome(&self, group: &str, success: bool) {
        let mut guard = self.group_failures.lock().await;
        if success {
            guard.remove(group);
        } else {
            let failures = guard.entry(group.to_string()).or_insert(0);
            *failures += 1;
            if *failures >= 3 {
                warn!(group, failures = *failures, "ingest_xover_consecutive_failures");
            }
        }
    }

    async fn adaptive_sleep(
        &self,
        processed: u64,
        remaining: u64,
        avg_db_ms: f64,
        avg_search_ms: f64,
    ) -> Duration {
        let cfg = self.ingest_config();
        let poll_min = Duration::from_secs(cfg.poll_min_seconds);
        let poll_max = Duration::from_secs(cfg.poll_max_seconds);

        if self.db_breaker.state().await == crate::types::CircuitState::Open
            || self.search_breaker.state().await == crate::types::CircuitState::Open
        {
            let floor = Duration::from_secs_f64(self.config.circuit_breaker.reset_seconds / 2.0);
            return floor.max(poll_min);
        }

        if cfg.sleep_ms > 0
            && (avg_db_ms > cfg.db_latency_ms as f64 || avg_search_ms > cfg.search_latency_ms as f64)
        {
            let mut ratio: f64 = 1.0;
            if avg_db_ms > cfg.db_latency_ms as f64 && cfg.db_latency_ms > 0 {
                ratio = ratio.max(avg_db_ms / cfg.db_latency_ms as f64);
            }
            if avg_search_ms > cfg.search_latency_ms as f64 && cfg.search_latency_ms > 0 {
                ratio = ratio.max(avg_search_ms / cfg.search_latency_ms as f64);
            }
            return Duration::from_millis((cfg.sleep_ms as f64 * ratio) as u64).clamp(poll_min, poll_max);
        }

        if remaining == 0 {
            return poll_max;
        }
        if processed == 0 {
            return poll_min;
        }

        let ratio = remaining as f64 / (processed + remaining) as f64;
        let span = poll_max.as_secs_f64() - poll_min.as_secs_f64();
        Duration::from_secs_f64(poll_min.as_secs_f64() + span * (1.0 - ratio))
    }
}

fn to_chrono_duration(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::seconds(0))
}

fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Parse an RFC 2822-ish NNTP date header; returns `None` on anything unparseable,
/// matching the original's catch-and-drop-to-no-bucket behavior.
fn parse_nntp_date(raw: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc2822(raw.trim()).ok().map(|dt| dt.with_timezone(&chrono::Utc))
}

fn call_error_to_crate_error<E: std::fmt::Display>(e: CallError<E>) -> crate::Error {
    crate::Error::Other(e.to_string())
}

/// Worker-sharding helper (§5): a group is always routed to the same worker index.
pub fn shard_for_group(group: &str, workers: u32) -> u32 {
    use std::hash::{Hash, Hasher};
    if workers <= 1 {
        return 0;
    }
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    group.hash(&mut hasher);
    (hasher.finish() % workers as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shard_for_group_is_stable() {
        assert_eq!(shard_for_group("alt.binaries.test", 4), shard_for_group("alt.binaries.test", 4));
    }

    #[test]
    fn shard_for_group_distributes_across_workers() {
        let groups = ["alt.binaries.a", "alt.binaries.b", "alt.binaries.c", "alt.binaries.d"];
        let shards: std::collections::HashSet<u32> =
            groups.iter().map(|g| shard_for_group(g, 4)).collect();
        assert!(shards.len() > 1, "expected groups to spread across workers, got {shards:?}");
    }

    #[test]
    fn shard_for_group_is_zero_for_single_worker() {
        assert_eq!(shard_for_group("alt.binaries.test", 1), 0);
        assert_eq!(shard_for_group("alt.binaries.test", 0), 0);
    }

    #[test]
    fn parse_nntp_date_handles_rfc2822() {
        let parsed = parse_nntp_date("Mon, 1 Jan 2024 00:00:00 +0000");
        assert!(parsed.is_some());
    }

    #[test]
    fn parse_nntp_date_tolerates_garbage() {
        assert!(parse_nntp_date("not a date").is_none());
    }

    #[test]
    fn average_of_empty_slice_is_zero() {
        assert_eq!(average(&[]), 0.0);
    }
}
