//! Top-level facade wiring NNTP clients, storage, search, and the ingest loop together.
//!
//! Grounded on `downloader::UsenetDownloader`: one cloneable struct assembled once at
//! startup from [`Config`], exposing a [`shutdown`](IngestCore::shutdown) method for
//! [`crate::run_with_shutdown`], with background work spawned as tokio tasks under a
//! shared [`CancellationToken`].

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::db::Database;
use crate::ingest_loop::IngestLoop;
use crate::nntp_client::NntpClients;
use crate::search_indexer::SearchIndexer;
use crate::{Error, Result};

/// Everything the ingest process needs at runtime: storage, the search client, and one
/// [`IngestLoop`] worker per configured shard.
#[derive(Clone)]
pub struct IngestCore {
    /// Release/cursor store, `Arc`-wrapped for sharing with API handlers.
    pub db: Arc<Database>,
    /// Resolved configuration.
    pub config: Arc<Config>,
    loops: Arc<Vec<Arc<IngestLoop>>>,
    stop: CancellationToken,
}

impl IngestCore {
    /// Connect to every configured NNTP server, open the release store, and build one
    /// [`IngestLoop`] per worker shard (`config.ingest.workers`, minimum 1).
    pub async fn new(config: Config) -> Result<Self> {
        if config.servers.is_empty() {
            return Err(Error::Config {
                message: "no NNTP servers configured".into(),
                key: Some("NNTP_HOST".into()),
            });
        }

        let db = Database::new(config.database_path()).await?;
        let search = SearchIndexer::new(config.search.url.clone())?;

        let clients = NntpClients::connect_all(&config.servers, &config.nntp).await;
        let client = clients.primary().ok_or_else(|| Error::Config {
            message: "no NNTP servers configured".into(),
            key: Some("NNTP_HOST".into()),
        })?;

        let worker_count = config.ingest.workers.max(1);
        let mut loops = Vec::with_capacity(worker_count as usize);
        for worker_index in 0..worker_count {
            loops.push(Arc::new(IngestLoop::sharded(
                client.clone(),
                db.clone(),
                search.clone(),
                config.clone(),
                worker_index,
                worker_count,
            )));
        }

        Ok(Self {
            db: Arc::new(db),
            config: Arc::new(config),
            loops: Arc::new(loops),
            stop: CancellationToken::new(),
        })
    }

    /// Spawn every worker's `run_forever` loop as a background task.
    pub fn spawn(&self) -> Vec<JoinHandle<()>> {
        self.loops
            .iter()
            .cloned()
            .map(|worker| {
                let stop = self.stop.clone();
                tokio::spawn(async move { worker.run_forever(stop).await })
            })
            .collect()
    }

    /// Number of worker shards this core was built with.
    pub fn worker_count(&self) -> usize {
        self.loops.len()
    }

    /// Signal every worker to finish its current batch and stop.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating ingest core shutdown");
        self.stop.cancel();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn new_fails_fast_with_no_servers_configured() {
        let mut config = Config::default();
        config.servers.clear();
        let result = IngestCore::new(config).await;
        assert!(result.is_err());
    }
}
