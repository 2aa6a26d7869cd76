//! Configuration types for nzbidx-ingest

use serde::{Deserialize, Serialize};
use std::{collections::HashSet, net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

use crate::error::{Error, Result};

/// Main configuration for the ingest core.
///
/// Fields are organized into logical sub-configs for maintainability:
/// - [`ingest`](IngestConfig) — batching, polling cadence, adaptive sleep thresholds
/// - [`nntp`](NntpConfig) — group selection, timeouts, reconnect backoff
/// - [`search`](SearchConfig) — search engine endpoint
/// - [`circuit_breaker`](CircuitBreakerConfig) — failure threshold, reset window, retry policy
/// - [`categories`](CategoryConfig) — Newznab category id overrides and size gates
/// - [`server`](ServerIntegrationConfig) — the minimal Newznab-style API stub
///
/// Sub-config fields are flattened for a flat, single-level environment-variable surface,
/// matching the original ingest service's configuration table.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// NNTP server(s) to poll (first is primary; others are unused backups for now).
    pub servers: Vec<ServerConfig>,

    /// Batching, polling cadence, and adaptive sleep settings.
    #[serde(flatten)]
    pub ingest: IngestConfig,

    /// Group selection and NNTP transport tuning.
    #[serde(flatten)]
    pub nntp: NntpConfig,

    /// Durable state (cursor/release store).
    pub persistence: PersistenceConfig,

    /// Search engine endpoint.
    #[serde(flatten)]
    pub search: SearchConfig,

    /// Circuit breaker tuning, shared by the `db` and `search` dependencies.
    #[serde(flatten)]
    pub circuit_breaker: CircuitBreakerConfig,

    /// Newznab category id overrides and per-category size gates.
    pub categories: CategoryConfig,

    /// Minimal API stub integration.
    #[serde(flatten)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Database connection string for the release/cursor store.
    pub fn database_path(&self) -> &PathBuf {
        &self.persistence.database_path
    }

    /// Load configuration from environment variables, matching the original ingest
    /// service's table (`NNTP_HOST`, `INGEST_BATCH`, `CB_RESET_SECONDS`, etc.).
    ///
    /// Returns `Error::Config` when a required setting is missing or malformed, which
    /// the process treats as fatal at startup.
    pub fn from_env() -> Result<Self> {
        let host = env_var("NNTP_HOST_1").or_else(|| env_var("NNTP_HOST")).ok_or_else(|| {
            Error::Config {
                message: "NNTP_HOST (or NNTP_HOST_1) is required".into(),
                key: Some("NNTP_HOST".into()),
            }
        })?;
        let port: u16 = env_parse("NNTP_PORT_1")
            .or_else(|| env_parse("NNTP_PORT"))
            .unwrap_or(119);
        let tls = env_bool("NNTP_SSL_1")
            .or_else(|| env_bool("NNTP_SSL"))
            .unwrap_or(port == 563);
        let username = env_var("NNTP_USER");
        let password = env_var("NNTP_PASS");

        let servers = vec![ServerConfig {
            host,
            port,
            tls,
            username,
            password,
            connections: default_connections(),
            priority: 0,
            pipeline_depth: default_pipeline_depth(),
        }];

        let database_path = env_var("CURSOR_DB")
            .or_else(|| env_var("DATABASE_URL"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./cursors.sqlite"));

        let groups = env_var("NNTP_GROUPS").map(|s| split_group_list(&s));
        let group_file = env_var("NNTP_GROUP_FILE").map(PathBuf::from);
        let ignore_groups = env_var("NNTP_IGNORE_GROUPS")
            .map(|s| split_group_list(&s).into_iter().collect())
            .unwrap_or_default();

        let batch_max: u32 = env_parse("INGEST_BATCH").unwrap_or(1000);
        let batch_max: u32 = env_parse("INGEST_BATCH_MAX").unwrap_or(batch_max);

        let config = Self {
            servers,
            ingest: IngestConfig {
                batch_min: env_parse("INGEST_BATCH_MIN").unwrap_or(100),
                batch_max,
                poll_min_seconds: env_parse("INGEST_POLL_MIN_SECONDS").unwrap_or(5),
                poll_max_seconds: env_parse("INGEST_POLL_MAX_SECONDS").unwrap_or(60),
                sleep_ms: env_parse("INGEST_SLEEP_MS").unwrap_or(1000),
                db_latency_ms: env_parse("INGEST_DB_LATENCY_MS").unwrap_or(1200),
                search_latency_ms: env_parse("INGEST_OS_LATENCY_MS").unwrap_or(1200),
                log_every: env_parse("INGEST_LOG_EVERY").unwrap_or(100),
                detect_language: env_bool("DETECT_LANGUAGE").unwrap_or(true),
                validate_segments: env_bool("VALIDATE_SEGMENTS").unwrap_or(false),
                release_part_max_releases: env_parse("RELEASE_PART_MAX_RELEASES")
                    .unwrap_or(100_000),
                workers: env_parse("INGEST_WORKERS").unwrap_or(1),
                irrelevant_ttl: Duration::from_secs(86_400),
            },
            nntp: NntpConfig {
                groups,
                group_file,
                group_wildcard: env_var("NNTP_GROUP_WILDCARD")
                    .unwrap_or_else(|| "alt.binaries.*".into()),
                ignore_groups,
                timeout_seconds: env_parse("NNTP_TIMEOUT_SECONDS").unwrap_or(30),
                connect_base: Duration::from_secs_f64(
                    env_parse("NNTP_CONNECT_BASE").unwrap_or(1.0),
                ),
                connect_max_delay: Duration::from_secs_f64(
                    env_parse("NNTP_CONNECT_MAX_DELAY").unwrap_or(60.0),
                ),
            },
            persistence: PersistenceConfig { database_path },
            search: SearchConfig {
                url: env_var("OPENSEARCH_URL"),
            },
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: env_parse("CB_FAILURE_THRESHOLD").unwrap_or(3),
                reset_seconds: env_parse("CB_RESET_SECONDS").unwrap_or(30.0),
                retry: RetryConfig {
                    max_attempts: env_parse("RETRY_MAX").unwrap_or(2),
                    initial_delay: Duration::from_millis(
                        env_parse("RETRY_BASE_MS").unwrap_or(50),
                    ),
                    max_delay: default_max_delay(),
                    backoff_multiplier: default_backoff_multiplier(),
                    jitter: true,
                },
                jitter_ms: env_parse("RETRY_JITTER_MS").unwrap_or(50),
            },
            categories: CategoryConfig::from_env(),
            server: ServerIntegrationConfig::default(),
        };

        Ok(config)
    }
}

fn split_group_list(raw: &str) -> Vec<String> {
    raw.split(|c| c == ',' || c == '\n')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_var(key).and_then(|v| v.parse().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    env_var(key).map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

/// Batching, polling cadence, and adaptive sleep settings for the ingest loop.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct IngestConfig {
    /// Smallest XOVER batch requested even when little backlog remains.
    #[serde(default = "default_batch_min")]
    pub batch_min: u32,
    /// Largest XOVER batch requested per group per tick.
    #[serde(default = "default_batch_max")]
    pub batch_max: u32,
    /// Floor of the adaptive per-tick delay.
    #[serde(default = "default_poll_min_seconds")]
    pub poll_min_seconds: u64,
    /// Ceiling of the adaptive per-tick delay.
    #[serde(default = "default_poll_max_seconds")]
    pub poll_max_seconds: u64,
    /// Base sleep applied when DB/search latency exceeds its threshold.
    #[serde(default = "default_sleep_ms")]
    pub sleep_ms: u64,
    /// DB latency threshold (ms per row) above which sleep is scaled up.
    #[serde(default = "default_latency_ms")]
    pub db_latency_ms: u64,
    /// Search latency threshold (ms per row) above which sleep is scaled up.
    #[serde(default = "default_latency_ms")]
    pub search_latency_ms: u64,
    /// Emit a structured progress log every N processed headers.
    #[serde(default = "default_log_every")]
    pub log_every: u32,
    /// Whether to run language detection on subjects.
    #[serde(default = "default_true")]
    pub detect_language: bool,
    /// Whether to structurally validate segments before persisting.
    #[serde(default)]
    pub validate_segments: bool,
    /// Safety cap on releases touched by a single prune operation.
    #[serde(default = "default_release_part_max")]
    pub release_part_max_releases: u32,
    /// Size of the fixed worker pool groups are hash-sharded across.
    #[serde(default = "default_workers")]
    pub workers: u32,
    /// How long a group stays marked irrelevant before a probe is scheduled.
    #[serde(default = "default_irrelevant_ttl", with = "duration_serde")]
    pub irrelevant_ttl: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_min: default_batch_min(),
            batch_max: default_batch_max(),
            poll_min_seconds: default_poll_min_seconds(),
            poll_max_seconds: default_poll_max_seconds(),
            sleep_ms: default_sleep_ms(),
            db_latency_ms: default_latency_ms(),
            search_latency_ms: default_latency_ms(),
            log_every: default_log_every(),
            detect_language: true,
            validate_segments: false,
            release_part_max_releases: default_release_part_max(),
            workers: default_workers(),
            irrelevant_ttl: default_irrelevant_ttl(),
        }
    }
}

/// Group selection and NNTP transport tuning.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct NntpConfig {
    /// Explicit group list; takes priority over `group_file` and live discovery.
    #[serde(default)]
    pub groups: Option<Vec<String>>,
    /// Path to a newline-delimited group list file.
    #[serde(default)]
    pub group_file: Option<PathBuf>,
    /// Wildcard used for live group discovery when no explicit list is configured.
    #[serde(default = "default_group_wildcard")]
    pub group_wildcard: String,
    /// Groups excluded from ingestion (and whose existing releases are deleted).
    #[serde(default)]
    pub ignore_groups: HashSet<String>,
    /// Per-operation NNTP timeout.
    #[serde(default = "default_nntp_timeout")]
    pub timeout_seconds: u64,
    /// Base delay for the client's reconnect backoff.
    #[serde(default = "default_connect_base", with = "duration_serde")]
    pub connect_base: Duration,
    /// Cap for the client's reconnect backoff.
    #[serde(default = "default_connect_max_delay", with = "duration_serde")]
    pub connect_max_delay: Duration,
}

/// NNTP server configuration.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ServerConfig {
    /// Server hostname.
    pub host: String,
    /// Server port (typically 119 for unencrypted, 563 for TLS).
    pub port: u16,
    /// Use TLS (implicit TLS, not STARTTLS).
    pub tls: bool,
    /// Username for authentication.
    pub username: Option<String>,
    /// Password for authentication.
    pub password: Option<String>,
    /// Number of connections to maintain.
    #[serde(default = "default_connections")]
    pub connections: usize,
    /// Server priority (lower = tried first, for backup servers).
    #[serde(default)]
    pub priority: i32,
    /// Number of commands to pipeline per connection.
    #[serde(default = "default_pipeline_depth")]
    pub pipeline_depth: usize,
}

impl From<ServerConfig> for nntp_rs::ServerConfig {
    fn from(config: ServerConfig) -> Self {
        nntp_rs::ServerConfig {
            host: config.host,
            port: config.port,
            tls: config.tls,
            allow_insecure_tls: false,
            username: config.username.unwrap_or_default(),
            password: config.password.unwrap_or_default(),
        }
    }
}

/// Durable state location.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// Path to the SQLite database file backing the cursor and release stores.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Search engine endpoint configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct SearchConfig {
    /// Base URL of the search engine's bulk endpoint; indexing is skipped when unset.
    #[serde(default)]
    pub url: Option<String>,
}

/// Circuit breaker tuning, shared by all dependency breakers.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the breaker opens.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Seconds the breaker stays open before a half-open probe is allowed.
    #[serde(default = "default_reset_seconds")]
    pub reset_seconds: f64,
    /// Retry policy applied within a single `call()`.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Upper bound of the uniform jitter window added to each retry (milliseconds).
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            reset_seconds: default_reset_seconds(),
            retry: RetryConfig::default(),
            jitter_ms: default_jitter_ms(),
        }
    }
}

/// Retry configuration for transient failures.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Initial delay before first retry.
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Add random jitter to delays.
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Newznab category id overrides and per-category size gates.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryConfig {
    /// Override for the `movies` category id (default 2000).
    #[serde(default = "default_movies_cat_id")]
    pub movies_cat_id: u32,
    /// Override for the `tv` category id (default 5000).
    #[serde(default = "default_tv_cat_id")]
    pub tv_cat_id: u32,
    /// Override for the `audio`/`music` category id (default 3000).
    #[serde(default = "default_audio_cat_id")]
    pub audio_cat_id: u32,
    /// Override for the `books`/`ebook` category id (default 7020).
    #[serde(default = "default_books_cat_id")]
    pub books_cat_id: u32,
    /// Override for the `xxx`/adult category id (default 6000).
    #[serde(default = "default_adult_cat_id")]
    pub adult_cat_id: u32,
    /// Whether adult content is surfaced at all.
    #[serde(default)]
    pub allow_xxx: bool,
    /// Safe-search override; when `false` adult content is suppressed even if `allow_xxx` is set.
    #[serde(default = "default_true")]
    pub safesearch: bool,
    /// Size range, in bytes, a `movies` release must fall within to be kept.
    #[serde(default = "default_movie_size_range")]
    pub movie_size_range: (u64, u64),
    /// Size range, in bytes, a `tv` release must fall within to be kept.
    #[serde(default = "default_tv_size_range")]
    pub tv_size_range: (u64, u64),
    /// Size range, in bytes, an `xxx` release must fall within to be kept.
    #[serde(default = "default_xxx_size_range")]
    pub xxx_size_range: (u64, u64),
    /// Hard cap on any single release's total size, regardless of category.
    #[serde(default = "default_max_release_bytes")]
    pub max_release_bytes: u64,
    /// Releases older than this many days are eligible for retention pruning.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl CategoryConfig {
    fn from_env() -> Self {
        Self {
            movies_cat_id: env_parse("MOVIES_CAT_ID").unwrap_or_else(default_movies_cat_id),
            tv_cat_id: env_parse("TV_CAT_ID").unwrap_or_else(default_tv_cat_id),
            audio_cat_id: env_parse("AUDIO_CAT_ID").unwrap_or_else(default_audio_cat_id),
            books_cat_id: env_parse("BOOKS_CAT_ID").unwrap_or_else(default_books_cat_id),
            adult_cat_id: env_parse("ADULT_CAT_ID").unwrap_or_else(default_adult_cat_id),
            allow_xxx: env_bool("ALLOW_XXX").unwrap_or(false),
            safesearch: env_bool("SAFESEARCH").unwrap_or(true),
            movie_size_range: size_range_from_env("MOVIE", default_movie_size_range()),
            tv_size_range: size_range_from_env("TV", default_tv_size_range()),
            xxx_size_range: size_range_from_env("XXX", default_xxx_size_range()),
            max_release_bytes: env_parse("MAX_RELEASE_BYTES").unwrap_or_else(default_max_release_bytes),
            retention_days: env_parse("RELEASE_RETENTION_DAYS").unwrap_or_else(default_retention_days),
        }
    }

    /// Whether adult-category content should be surfaced to API consumers.
    pub fn adult_content_allowed(&self) -> bool {
        self.allow_xxx && self.safesearch
    }
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            movies_cat_id: default_movies_cat_id(),
            tv_cat_id: default_tv_cat_id(),
            audio_cat_id: default_audio_cat_id(),
            books_cat_id: default_books_cat_id(),
            adult_cat_id: default_adult_cat_id(),
            allow_xxx: false,
            safesearch: true,
            movie_size_range: default_movie_size_range(),
            tv_size_range: default_tv_size_range(),
            xxx_size_range: default_xxx_size_range(),
            max_release_bytes: default_max_release_bytes(),
            retention_days: default_retention_days(),
        }
    }
}

fn size_range_from_env(prefix: &str, default: (u64, u64)) -> (u64, u64) {
    let min_mb: u64 = env_parse(&format!("{prefix}_MIN_SIZE_MB")).unwrap_or(default.0 / 1_000_000);
    let max_mb: u64 = env_parse(&format!("{prefix}_MAX_SIZE_MB")).unwrap_or(default.1 / 1_000_000);
    (min_mb * 1_000_000, max_mb * 1_000_000)
}

/// API and external server integration.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// The minimal Newznab-style API stub.
    #[serde(default)]
    pub api: ApiConfig,
}

/// Minimal REST/Newznab API configuration.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to.
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,
    /// Optional API key for authentication.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Enable CORS for browser access.
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
    /// Allowed CORS origins.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    /// Enable Swagger UI at `/swagger-ui`.
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
    /// Rate limiting configuration; a stub surface, not enforced by the ingest core itself.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            api_key: None,
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Rate limiting configuration for the API stub.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    #[serde(default)]
    pub enabled: bool,
    /// Requests per second per API key/IP.
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
    /// Burst size.
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
    /// Endpoints exempt from rate limiting.
    #[serde(default = "default_exempt_paths")]
    pub exempt_paths: Vec<String>,
    /// IPs exempt from rate limiting.
    #[serde(default)]
    pub exempt_ips: Vec<std::net::IpAddr>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_second: default_requests_per_second(),
            burst_size: default_burst_size(),
            exempt_paths: default_exempt_paths(),
            exempt_ips: Vec::new(),
        }
    }
}

fn default_requests_per_second() -> u32 {
    100
}
fn default_burst_size() -> u32 {
    200
}
fn default_exempt_paths() -> Vec<String> {
    vec!["/api/health".to_string()]
}

fn default_batch_min() -> u32 {
    100
}
fn default_batch_max() -> u32 {
    1000
}
fn default_poll_min_seconds() -> u64 {
    5
}
fn default_poll_max_seconds() -> u64 {
    60
}
fn default_sleep_ms() -> u64 {
    1000
}
fn default_latency_ms() -> u64 {
    1200
}
fn default_log_every() -> u32 {
    100
}
fn default_release_part_max() -> u32 {
    100_000
}
fn default_workers() -> u32 {
    1
}
fn default_irrelevant_ttl() -> Duration {
    Duration::from_secs(86_400)
}
fn default_group_wildcard() -> String {
    "alt.binaries.*".to_string()
}
fn default_nntp_timeout() -> u64 {
    30
}
fn default_connect_base() -> Duration {
    Duration::from_secs(1)
}
fn default_connect_max_delay() -> Duration {
    Duration::from_secs(60)
}
fn default_connections() -> usize {
    1
}
fn default_pipeline_depth() -> usize {
    10
}
fn default_database_path() -> PathBuf {
    PathBuf::from("./cursors.sqlite")
}
fn default_failure_threshold() -> u32 {
    3
}
fn default_reset_seconds() -> f64 {
    30.0
}
fn default_jitter_ms() -> u64 {
    50
}
fn default_max_attempts() -> u32 {
    2
}
fn default_initial_delay() -> Duration {
    Duration::from_millis(50)
}
fn default_max_delay() -> Duration {
    Duration::from_secs(5)
}
fn default_backoff_multiplier() -> f64 {
    2.0
}
fn default_true() -> bool {
    true
}
fn default_bind_address() -> SocketAddr {
    "127.0.0.1:6789".parse().expect("valid default bind address")
}
fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}
fn default_movies_cat_id() -> u32 {
    2000
}
fn default_tv_cat_id() -> u32 {
    5000
}
fn default_audio_cat_id() -> u32 {
    3000
}
fn default_books_cat_id() -> u32 {
    7020
}
fn default_adult_cat_id() -> u32 {
    6000
}
fn default_movie_size_range() -> (u64, u64) {
    (50_000_000, 102_400_000_000)
}
fn default_tv_size_range() -> (u64, u64) {
    (50_000_000, 102_400_000_000)
}
fn default_xxx_size_range() -> (u64, u64) {
    (50_000_000, 102_400_000_000)
}
fn default_max_release_bytes() -> u64 {
    102_400_000_000
}
fn default_retention_days() -> u32 {
    365
}

/// Serializes `Duration` as an integer count of seconds, matching the teacher's
/// JSON/TOML-friendly duration encoding.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}
