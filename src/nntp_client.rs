//! Persistent NNTP client used by the ingest loop.
//!
//! Wraps [`nntp_rs::NntpPool`] with the failure semantics the ingest loop expects: every
//! public method here returns an empty/zero result instead of propagating a transport
//! error, and logs a structured warning instead. This mirrors the original ingest
//! service's `NNTPClient`, which never lets a connection failure escape `group()`,
//! `xover()`, or `body_size()` — the polling loop decides what to do about silence,
//! not this client.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::{NntpConfig, ServerConfig};
use crate::types::OverviewHeader;

/// A connected, reconnecting NNTP client for a single upstream server.
///
/// `current_group` is cached so repeated XOVER calls against the same group skip a
/// redundant `GROUP` command, the same optimization `nntp-rs`'s own client performs
/// internally per-connection; here it additionally survives across pool checkouts.
pub struct NntpClient {
    pool: Option<nntp_rs::NntpPool>,
    server: ServerConfig,
    nntp: NntpConfig,
    current_group: Mutex<Option<String>>,
}

impl NntpClient {
    /// Construct a client and attempt an initial connection.
    ///
    /// Unlike the teacher's eager `NntpPool::new(...).await?`, a failure to connect is
    /// not fatal here: the pool is left unset and every operation degrades to its
    /// empty/zero result until a later call to [`Self::connect`] succeeds.
    pub async fn new(server: ServerConfig, nntp: NntpConfig) -> Self {
        let mut client = Self { pool: None, server, nntp, current_group: Mutex::new(None) };
        client.connect().await;
        client
    }

    /// (Re-)establish the connection pool. Logs and leaves the client in its
    /// disconnected state on failure; never raises.
    pub async fn connect(&mut self) -> bool {
        let max_size = self.server.connections.max(1) as u32;
        let config: nntp_rs::ServerConfig = self.server.clone().into();
        match nntp_rs::NntpPool::new(config, max_size).await {
            Ok(pool) => {
                self.pool = Some(pool);
                true
            }
            Err(e) => {
                tracing::warn!(host = %self.server.host, error = %e, "nntp_connect_failed");
                self.pool = None;
                false
            }
        }
    }

    /// `true` once a pool has been successfully established at least once.
    pub fn is_connected(&self) -> bool {
        self.pool.is_some()
    }

    /// Select `group` and return `(count, low, high)`, or `(0, 0, 0)` when disconnected
    /// or the server rejects the group.
    pub async fn group(&self, group: &str) -> (u64, u64, u64) {
        let Some(pool) = &self.pool else {
            return (0, 0, 0);
        };
        let mut conn = match pool.get().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(%group, error = %e, "nntp_pool_checkout_failed");
                return (0, 0, 0);
            }
        };
        match conn.select_group(group).await {
            Ok(info) => {
                *self.current_group.lock().await = Some(group.to_string());
                (info.count, info.first, info.last)
            }
            Err(e) => {
                tracing::warn!(%group, error = %e, "nntp_group_failed");
                (0, 0, 0)
            }
        }
    }

    /// Highest article number currently available in `group`, or `0` on any failure
    /// (including "not connected"). The ingest loop treats `0` as an outage, never as
    /// "group is genuinely empty".
    pub async fn high_water_mark(&self, group: &str) -> u64 {
        self.group(group).await.2
    }

    /// Fetch overview headers for articles `start..=end` in `group`.
    ///
    /// Performs at most one reconnect-and-retry on transport failure; on repeated
    /// failure returns an empty vector and lets the caller reschedule the range.
    pub async fn xover(&self, group: &str, start: u64, end: u64) -> Vec<OverviewHeader> {
        if start > end {
            return Vec::new();
        }
        let range = format!("{start}-{end}");
        for attempt in 0..2 {
            let Some(pool) = &self.pool else {
                return Vec::new();
            };
            let mut conn = match pool.get().await {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!(%group, error = %e, "nntp_pool_checkout_failed");
                    return Vec::new();
                }
            };
            let needs_group = self.current_group.lock().await.as_deref() != Some(group);
            if needs_group {
                if let Err(e) = conn.select_group(group).await {
                    tracing::warn!(%group, error = %e, attempt, "nntp_xover_group_failed");
                    continue;
                }
                *self.current_group.lock().await = Some(group.to_string());
            }
            match conn.fetch_xover(&range).await {
                Ok(entries) => {
                    return entries
                        .into_iter()
                        .map(|e| OverviewHeader {
                            article_number: e.article_number,
                            subject: e.subject,
                            date: e.date,
                            message_id: e.message_id,
                            bytes: e.bytes as u64,
                        })
                        .collect();
                }
                Err(e) => {
                    tracing::warn!(%group, %range, error = %e, attempt, "nntp_xover_failed");
                }
            }
        }
        Vec::new()
    }

    /// Best-effort article size: `HEAD`'s `Bytes:` line, then `STAT`'s trailing size,
    /// then a `BODY` fetch summed by line length. Returns `0` when every strategy fails.
    pub async fn body_size(&self, message_id: &str) -> u64 {
        let Some(pool) = &self.pool else {
            return 0;
        };
        let mut conn = match pool.get().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(%message_id, error = %e, "nntp_pool_checkout_failed");
                return 0;
            }
        };

        if let Ok(resp) = conn.fetch_head(message_id).await {
            for line in &resp.lines {
                if line.to_ascii_lowercase().starts_with("bytes:") {
                    if let Some((_, value)) = line.split_once(':') {
                        if let Ok(n) = value.trim().parse::<u64>() {
                            return n;
                        }
                    }
                }
            }
        }

        if let Ok(info) = conn.stat(message_id).await {
            // `nntp-rs`'s `ArticleInfo` carries no size field; STAT alone never yields a
            // usable size here, but a successful STAT confirms the article exists, so a
            // BODY fallback below is worth attempting.
            let _ = info;
        }

        if let Ok(resp) = conn.fetch_body(message_id).await {
            let total: usize = resp.lines.iter().map(|l| l.len() + 1).sum();
            return total as u64;
        }

        0
    }

    /// Enumerate newsgroups matching `pattern` (e.g. `alt.binaries.*`).
    pub async fn list_groups(&self, pattern: &str) -> Vec<String> {
        let Some(pool) = &self.pool else {
            return Vec::new();
        };
        let mut conn = match pool.get().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(error = %e, "nntp_pool_checkout_failed");
                return Vec::new();
            }
        };
        match conn.list_active(pattern).await {
            Ok(groups) => groups.into_iter().map(|g| g.name).collect(),
            Err(e) => {
                tracing::warn!(%pattern, error = %e, "nntp_list_groups_failed");
                Vec::new()
            }
        }
    }
}

/// A registry of [`NntpClient`]s keyed by server host, supporting the worker pool's
/// need to share a small number of persistent connections across ticks.
#[derive(Clone)]
pub struct NntpClients {
    clients: Arc<HashMap<String, Arc<NntpClient>>>,
}

impl NntpClients {
    /// Build one client per configured server.
    pub async fn connect_all(servers: &[ServerConfig], nntp: &NntpConfig) -> Self {
        let mut clients = HashMap::new();
        for server in servers {
            let client = NntpClient::new(server.clone(), nntp.clone()).await;
            clients.insert(server.host.clone(), Arc::new(client));
        }
        Self { clients: Arc::new(clients) }
    }

    /// The primary (first-configured) client, if any server was configured.
    pub fn primary(&self) -> Option<Arc<NntpClient>> {
        self.clients.values().next().cloned()
    }
}
