//! Core data types for nzbidx-ingest
//!
//! These are the shapes that flow from [`crate::subject_parser`] through
//! [`crate::deduper`] into [`crate::db::release`] and [`crate::search_indexer`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One Usenet article contributing to a [`Release`].
///
/// `message_id` is stored without angle brackets; see [`crate::segment_schema`]
/// for the structural invariants enforced before a segment is persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Segment {
    /// 1-based part index, parsed from the subject's `(N/M)` marker.
    pub number: u32,
    /// Usenet message-id, angle brackets stripped.
    pub message_id: String,
    /// Newsgroup the article was observed in.
    pub group: String,
    /// Article size in bytes.
    pub size: u64,
}

/// A logical release: one or more [`Segment`]s collapsed under one dedupe key.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Release {
    /// Lowercase normalized subject, see [`crate::subject_parser`].
    pub norm_title: String,
    /// Newznab category id, see [`crate::category`].
    pub category_id: u32,
    /// Timestamp of the first article seen for this release.
    pub posted_at: Option<DateTime<Utc>>,
    /// 2-letter language code, `"und"` when unknown.
    pub language: String,
    /// Ordered set of lowercase tags (bracketed hints plus format tokens).
    pub tags: Vec<String>,
    /// Newsgroup the first article was observed in.
    pub source_group: String,
    /// Sum of all known segment sizes.
    pub size_bytes: u64,
    /// Segments sorted by `number`, unique by `number`.
    pub segments: Vec<Segment>,
}

impl Release {
    /// `true` iff at least one segment is known.
    pub fn has_parts(&self) -> bool {
        !self.segments.is_empty()
    }

    /// Distinct count of segment numbers.
    pub fn part_count(&self) -> usize {
        self.segments.len()
    }

    /// The key releases are merged and looked up by: `{norm_title}:{category_id}:{yyyy-mm-dd}`,
    /// dropping the date segment when `posted_at` is unknown. Matches the store's uniqueness
    /// identity `(norm_title, category_id, posted_at)`.
    pub fn dedupe_key(&self) -> String {
        dedupe_key(&self.norm_title, self.category_id, self.posted_at)
    }
}

/// Build a dedupe key from a normalized title, category id, and optional posting timestamp.
pub fn dedupe_key(norm_title: &str, category_id: u32, posted_at: Option<DateTime<Utc>>) -> String {
    match posted_at {
        Some(ts) => format!("{norm_title}:{category_id}:{}", ts.format("%Y-%m-%d")),
        None => format!("{norm_title}:{category_id}"),
    }
}

/// Output of [`crate::subject_parser::parse`].
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ParsedSubject {
    /// Lowercase, whitespace-collapsed title with tags/markers stripped.
    pub norm_title: String,
    /// Union of bracketed tags and structured extractor hints, sorted.
    pub tags: Vec<String>,
    /// 1-based part index from a `(N/M)` marker; `1` when absent.
    pub segment_number: u32,
    /// 2-letter language code when detected.
    pub language: Option<String>,
    /// File extension hint recovered from a structured tag (e.g. `flac`, `epub`), if any.
    pub extension: Option<String>,
}

/// Per-dependency circuit breaker state, see [`crate::circuit_breaker`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls pass through normally.
    Closed,
    /// Calls fail fast without invoking the dependency.
    Open,
    /// A single probing call is permitted to decide whether to close or reopen.
    HalfOpen,
}

/// A durable per-group watermark, see [`crate::db::cursor`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Cursor {
    /// Newsgroup name.
    pub group: String,
    /// Highest XOVER article number fully processed.
    pub last_article: u64,
    /// When set and in the future, the group is skipped by the ingest loop.
    pub irrelevant_until: Option<DateTime<Utc>>,
    /// Next time a single probe XOVER should be attempted after an outage.
    pub probe_at: Option<DateTime<Utc>>,
}

/// A single XOVER header record as returned by [`crate::nntp_client`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverviewHeader {
    /// Article number within the newsgroup.
    pub article_number: u64,
    /// Raw subject line.
    pub subject: String,
    /// Raw date string (RFC 2822-ish; not all servers are strict).
    pub date: String,
    /// Message-id including angle brackets, as received from the wire.
    pub message_id: String,
    /// Article size in bytes.
    pub bytes: u64,
}
