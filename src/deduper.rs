//! Aggregates a single XOVER batch into per-release rows keyed by dedupe key.
//!
//! Mirrors the ingest service's batch-accumulation step in `ingest_loop.py`: headers
//! from one group are folded into a `HashMap<dedupe_key, Release>`, unioning tags,
//! summing sizes, and keeping the earliest `posted_at`. After folding the batch,
//! pre-existing segments for any touched dedupe key are merged in so a release that
//! straddles two XOVER batches still converges to one segment set.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::category;
use crate::db::Database;
use crate::subject_parser;
use crate::types::{dedupe_key, Release, Segment};
use crate::Result;

/// One XOVER header plus the fields the deduper needs beyond `OverviewHeader`.
pub struct IngestedHeader {
    pub group: String,
    pub subject: String,
    pub message_id: String,
    pub posted_at: Option<DateTime<Utc>>,
    pub bytes: u64,
}

/// Accumulates [`IngestedHeader`]s into [`Release`] aggregates.
#[derive(Default)]
pub struct Deduper {
    releases: HashMap<String, Release>,
    detect_language: bool,
}

impl Deduper {
    pub fn new(detect_language: bool) -> Self {
        Self { releases: HashMap::new(), detect_language }
    }

    /// Fold one header into the aggregate for its dedupe key, creating the release
    /// if this is the first header seen for that key.
    pub fn ingest(&mut self, header: IngestedHeader) {
        let parsed = subject_parser::parse(&header.subject, self.detect_language);
        if parsed.norm_title.is_empty() {
            return;
        }
        let category_id = category::infer(&header.subject, &parsed.tags, &header.group);
        let key = dedupe_key(&parsed.norm_title, category_id, header.posted_at);

        let release = self.releases.entry(key).or_insert_with(|| Release {
            norm_title: parsed.norm_title.clone(),
            category_id,
            posted_at: header.posted_at,
            language: parsed.language.clone().unwrap_or_else(|| "und".to_string()),
            tags: Vec::new(),
            source_group: header.group.clone(),
            size_bytes: 0,
            segments: Vec::new(),
        });

        merge_tags(&mut release.tags, &parsed.tags);
        release.posted_at = earliest(release.posted_at, header.posted_at);
        release.size_bytes += header.bytes;

        push_segment(
            &mut release.segments,
            Segment {
                number: parsed.segment_number,
                message_id: header.message_id,
                group: header.group,
                size: header.bytes,
            },
        );
    }

    /// Number of distinct releases accumulated so far.
    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    /// Merge in segments already persisted for any release this batch touched, then
    /// return the finished aggregates keyed by dedupe key.
    pub async fn finish(mut self, db: &Database) -> Result<Vec<Release>> {
        let keys: Vec<String> = self.releases.keys().cloned().collect();
        let existing = db.get_segments(&keys).await?;

        for (key, release) in self.releases.iter_mut() {
            if let Some(prior) = existing.get(key) {
                for segment in prior {
                    push_segment(&mut release.segments, segment.clone());
                }
            }
            release.segments.sort_by_key(|s| s.number);
        }

        Ok(self.releases.into_values().collect())
    }
}

fn merge_tags(into: &mut Vec<String>, other: &[String]) {
    for tag in other {
        if !into.contains(tag) {
            into.push(tag.clone());
        }
    }
}

fn earliest(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, b) => b,
    }
}

/// Append `segment` unless a segment with the same `(number, message_id)` is already
/// present.
fn push_segment(segments: &mut Vec<Segment>, segment: Segment) {
    let duplicate = segments
        .iter()
        .any(|s| s.number == segment.number && s.message_id == segment.message_id);
    if !duplicate {
        segments.push(segment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(subject: &str, message_id: &str, bytes: u64) -> IngestedHeader {
        IngestedHeader {
            group: "alt.binaries.test".to_string(),
            subject: subject.to_string(),
            message_id: message_id.to_string(),
            posted_at: None,
            bytes,
        }
    }

    #[test]
    fn multi_part_release_merges_into_one_aggregate() {
        let mut deduper = Deduper::new(false);
        deduper.ingest(header("Release.Name (1/2)", "<a@x>", 100));
        deduper.ingest(header("Release.Name (2/2)", "<b@x>", 200));

        assert_eq!(deduper.len(), 1);
    }

    #[test]
    fn duplicate_segment_number_and_message_id_is_not_double_counted() {
        let mut deduper = Deduper::new(false);
        deduper.ingest(header("Release.Name (1/2)", "<a@x>", 100));
        deduper.ingest(header("Release.Name (1/2)", "<a@x>", 100));

        let releases: Vec<_> = deduper.releases.into_values().collect();
        assert_eq!(releases[0].segments.len(), 1);
    }

    #[test]
    fn distinct_titles_produce_distinct_aggregates() {
        let mut deduper = Deduper::new(false);
        deduper.ingest(header("First.Release", "<a@x>", 100));
        deduper.ingest(header("Second.Release", "<b@x>", 100));

        assert_eq!(deduper.len(), 2);
    }

    #[test]
    fn size_bytes_sums_across_segments() {
        let mut deduper = Deduper::new(false);
        deduper.ingest(header("Release.Name (1/2)", "<a@x>", 100));
        deduper.ingest(header("Release.Name (2/2)", "<b@x>", 250));

        let release = deduper.releases.values().next().unwrap();
        assert_eq!(release.size_bytes, 350);
    }

    #[test]
    fn empty_subject_is_skipped_without_panicking() {
        let mut deduper = Deduper::new(false);
        deduper.ingest(header("", "<a@x>", 100));
        assert!(deduper.is_empty());
    }
}
