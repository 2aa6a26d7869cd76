//! Application state for the API server

use crate::ingest_core::IngestCore;
use crate::Config;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// This struct is cloned for each request (cheap `Arc` clone) and provides
/// access to the release store and configuration.
#[derive(Clone)]
pub struct AppState {
    /// The ingest core, for access to the release/cursor store
    pub core: Arc<IngestCore>,

    /// Configuration (read access only; the ingest core owns its own copy)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(core: Arc<IngestCore>, config: Arc<Config>) -> Self {
        Self { core, config }
    }
}
