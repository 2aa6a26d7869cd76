//! # usenet-dl
//!
//! Backend library that ingests Usenet headers into a searchable release index.
//!
//! ## Design Philosophy
//!
//! usenet-dl is designed to be:
//! - **Highly configurable** - Almost every behavior can be customized
//! - **Sensible defaults** - Works out of the box with zero configuration
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Resilient** - Circuit breakers isolate slow or failing dependencies per group
//!
//! ## Quick Start
//!
//! ```no_run
//! use usenet_dl::{IngestCore, Config, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         servers: vec![
//!             ServerConfig {
//!                 host: "news.example.com".to_string(),
//!                 port: 563,
//!                 tls: true,
//!                 username: Some("user".to_string()),
//!                 password: Some("pass".to_string()),
//!                 connections: 10,
//!                 priority: 0,
//!                 pipeline_depth: 10,
//!             }
//!         ],
//!         ..Default::default()
//!     };
//!
//!     let core = IngestCore::new(config).await?;
//!     let _handles = core.spawn();
//!
//!     usenet_dl::run_with_shutdown(core).await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Newznab category inference
pub mod category;
/// Circuit breaker for per-dependency failure isolation
pub mod circuit_breaker;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Segment and release deduplication/aggregation
pub mod deduper;
/// Error types
pub mod error;
/// Top-level facade wiring storage, search, and ingest workers together
pub mod ingest_core;
/// Per-group ingest loop
pub mod ingest_loop;
/// NNTP client wrapper
pub mod nntp_client;
/// NZB XML document synthesis
pub mod nzb_builder;
/// Retry logic with exponential backoff
pub mod retry;
/// Bulk search-index upserts
pub mod search_indexer;
/// Multipart segment structural validation
pub mod segment_schema;
/// Subject-line parsing
pub mod subject_parser;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::{Config, DuplicateAction, ServerConfig};
pub use db::Database;
pub use error::{ApiError, DatabaseError, Error, ErrorDetail, Result, ToHttpStatus};
pub use ingest_core::IngestCore;
pub use types::{CircuitState, Cursor, OverviewHeader, ParsedSubject, Release, Segment};

/// Helper function to run the ingest core with graceful signal handling.
///
/// Waits for a termination signal and then calls [`IngestCore::shutdown`].
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use usenet_dl::{IngestCore, Config, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::default();
///     let core = IngestCore::new(config).await?;
///     let _handles = core.spawn();
///
///     // Run with automatic signal handling
///     run_with_shutdown(core).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(core: IngestCore) -> Result<()> {
    wait_for_signal().await;
    core.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
