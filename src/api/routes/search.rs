//! The Newznab-style `t=search|tvsearch|movie|music|book|getnzb|caps` dispatcher.
//!
//! A minimal stub over the local release store (SPEC external interface §6): full
//! RSS templating and quota middleware are out of scope, but query shape, the
//! `apikey` gate, and the `{"error": {...}}` envelope match the real surface.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::api::AppState;
use crate::error::ApiError;
use crate::types::Release;

/// Query parameters accepted by `GET /api`, mirroring the real Newznab surface.
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct SearchQuery {
    /// Operation: `caps`, `search`, `tvsearch`, `movie`, `music`, `book`, or `getnzb`.
    pub t: Option<String>,
    /// Free-text search term.
    pub q: Option<String>,
    /// Newznab category id to filter by.
    pub cat: Option<u32>,
    /// Max results to return (default 50).
    pub limit: Option<i64>,
    /// Results to skip (default 0).
    pub offset: Option<i64>,
    /// Include extended attributes in results (accepted, currently always on).
    pub extended: Option<bool>,
    /// The release's dedupe key, required for `t=getnzb`.
    pub id: Option<String>,
    /// API key, checked against the configured key if one is set.
    pub apikey: Option<String>,
}

/// One release as a Newznab-style search result row.
#[derive(Debug, Serialize, ToSchema)]
pub struct SearchResultItem {
    pub title: String,
    pub guid: String,
    pub category: u32,
    pub size: u64,
    pub posted_at: Option<chrono::DateTime<chrono::Utc>>,
    pub group: String,
}

impl SearchResultItem {
    fn from_release(release: &Release) -> Self {
        Self {
            title: release.norm_title.clone(),
            guid: release.dedupe_key(),
            category: release.category_id,
            size: release.size_bytes,
            posted_at: release.posted_at,
            group: release.source_group.clone(),
        }
    }
}

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

/// `GET /api` — dispatches on `t`.
#[utoipa::path(
    get,
    path = "/api/v1/api",
    tag = "search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Search results or NZB document"),
        (status = 400, description = "Invalid or missing parameters", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 503, description = "NZB unavailable or a dependency breaker is open", body = ApiError),
    )
)]
pub async fn search(State(state): State<AppState>, Query(params): Query<SearchQuery>) -> Response {
    if let Err(resp) = check_api_key(&state, &params) {
        return resp;
    }

    match params.t.as_deref() {
        Some("getnzb") => get_nzb(&state, &params).await,
        Some("caps") => {
            (StatusCode::NOT_IMPLEMENTED, Json(ApiError::new("not_supported", "caps is not implemented by this stub")))
                .into_response()
        }
        Some("search") | Some("tvsearch") | Some("movie") | Some("music") | Some("book") | None => {
            run_search(&state, &params).await
        }
        Some(other) => {
            (StatusCode::BAD_REQUEST, Json(ApiError::validation(format!("unsupported t={other}")))).into_response()
        }
    }
}

async fn run_search(state: &AppState, params: &SearchQuery) -> Response {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    match state.core.db.search(params.q.as_deref(), params.cat, limit, offset).await {
        Ok(releases) => {
            let items: Vec<SearchResultItem> = releases.iter().map(SearchResultItem::from_release).collect();
            Json(items).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// `getnzb`: render the stored segments for `id` (a dedupe key) as NZB XML.
pub async fn get_nzb(state: &AppState, params: &SearchQuery) -> Response {
    let Some(dedupe_key) = params.id.as_deref().filter(|s| !s.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError::validation("getnzb requires an id parameter")),
        )
            .into_response();
    };

    match crate::nzb_builder::build_for_dedupe_key(&state.core.db, dedupe_key).await {
        Ok(xml) => (
            StatusCode::OK,
            [("Content-Type", "application/x-nzb")],
            xml,
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

fn check_api_key(state: &AppState, params: &SearchQuery) -> Result<(), Response> {
    let Some(expected) = &state.config.server.api.api_key else {
        return Ok(());
    };
    if params.apikey.as_deref() == Some(expected.as_str()) {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, Json(ApiError::unauthorized("invalid or missing apikey"))).into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ingest_core::IngestCore;
    use crate::types::Segment;
    use std::sync::Arc;

    async fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.persistence.database_path = dir.path().join("api.sqlite");
        config.servers = vec![crate::config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 119,
            tls: false,
            username: None,
            password: None,
            connections: 1,
            priority: 0,
            pipeline_depth: 1,
        }];
        let core = IngestCore::new(config.clone()).await.unwrap();
        let state = AppState::new(Arc::new(core), Arc::new(config));
        (state, dir)
    }

    fn sample_release() -> Release {
        Release {
            norm_title: "space show".to_string(),
            category_id: 5000,
            posted_at: None,
            language: "und".to_string(),
            tags: Vec::new(),
            source_group: "alt.binaries.tv".to_string(),
            size_bytes: 100,
            segments: vec![Segment {
                number: 1,
                message_id: "a@x".to_string(),
                group: "alt.binaries.tv".to_string(),
                size: 100,
            }],
        }
    }

    #[tokio::test]
    async fn search_with_no_api_key_configured_succeeds_without_apikey_param() {
        let (state, _dir) = test_state().await;
        let params = SearchQuery {
            t: Some("search".to_string()),
            q: None,
            cat: None,
            limit: None,
            offset: None,
            extended: None,
            id: None,
            apikey: None,
        };
        assert!(check_api_key(&state, &params).is_ok());
    }

    #[tokio::test]
    async fn wrong_api_key_is_rejected() {
        let (mut state, _dir) = test_state().await;
        let mut config = (*state.config).clone();
        config.server.api.api_key = Some("secret".to_string());
        state.config = Arc::new(config);

        let params = SearchQuery {
            t: None,
            q: None,
            cat: None,
            limit: None,
            offset: None,
            extended: None,
            id: None,
            apikey: Some("wrong".to_string()),
        };
        assert!(check_api_key(&state, &params).is_err());
    }

    #[tokio::test]
    async fn getnzb_without_id_is_a_validation_error() {
        let (state, _dir) = test_state().await;
        let params = SearchQuery {
            t: Some("getnzb".to_string()),
            q: None,
            cat: None,
            limit: None,
            offset: None,
            extended: None,
            id: None,
            apikey: None,
        };
        let resp = get_nzb(&state, &params).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn getnzb_with_known_id_returns_xml() {
        let (state, _dir) = test_state().await;
        let release = sample_release();
        state.core.db.upsert_releases(std::slice::from_ref(&release)).await.unwrap();

        let params = SearchQuery {
            t: Some("getnzb".to_string()),
            q: None,
            cat: None,
            limit: None,
            offset: None,
            extended: None,
            id: Some(release.dedupe_key()),
            apikey: None,
        };
        let resp = get_nzb(&state, &params).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
