//! Transactional release upsert, partition routing, and retention pruning.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, TimeZone, Utc};
use sqlx::{FromRow, Sqlite, Transaction};

use crate::error::DatabaseError;
use crate::types::{Release, Segment};
use crate::{Error, Result};

use super::Database;

/// Raw release row as stored in SQLite.
#[derive(Debug, Clone, FromRow)]
pub struct ReleaseRow {
    dedupe_key: String,
    norm_title: String,
    category_id: i64,
    posted_at: Option<i64>,
    language: String,
    tags: String,
    source_group: String,
    size_bytes: i64,
    segments: String,
    has_parts: i64,
    part_count: i64,
}

impl ReleaseRow {
    fn into_release(self) -> Release {
        Release {
            norm_title: self.norm_title,
            category_id: self.category_id.max(0) as u32,
            posted_at: self.posted_at.and_then(|s| Utc.timestamp_opt(s, 0).single()),
            language: self.language,
            tags: serde_json::from_str(&self.tags).unwrap_or_default(),
            source_group: self.source_group,
            size_bytes: self.size_bytes.max(0) as u64,
            segments: serde_json::from_str(&self.segments).unwrap_or_default(),
        }
    }
}

/// Named buckets a category id is routed into; mirrors a partitioned deployment's
/// table-per-category layout without SQLite needing native `PARTITION BY` support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryBucket {
    /// 2000-2999
    Movies,
    /// 3000-3999
    Music,
    /// 5000-5999
    Tv,
    /// 6000-6999
    Adult,
    /// 7000-7999
    Books,
    /// everything else
    Other,
}

/// Routes a release into the `(category_bucket, year_bucket)` pair a partitioned
/// Postgres deployment would use as its physical partition key. SQLite stores every
/// row in one table; `idx_release_category_year` is the index-level equivalent.
pub fn partition_key(category_id: u32, posted_at: Option<DateTime<Utc>>) -> (CategoryBucket, Option<i32>) {
    let bucket = match category_id {
        2000..=2999 => CategoryBucket::Movies,
        3000..=3999 => CategoryBucket::Music,
        5000..=5999 => CategoryBucket::Tv,
        6000..=6999 => CategoryBucket::Adult,
        7000..=7999 => CategoryBucket::Books,
        _ => CategoryBucket::Other,
    };
    (bucket, posted_at.map(|d| d.format("%Y").to_string().parse().unwrap_or(0)))
}

fn search_vector(norm_title: &str, tags: &[String]) -> String {
    if tags.is_empty() {
        norm_title.to_string()
    } else {
        format!("{norm_title} {}", tags.join(" "))
    }
}

/// Wrap `query` as a quoted FTS5 phrase so punctuation in user input can't be
/// misread as query-syntax operators.
fn fts_phrase(query: &str) -> String {
    format!("\"{}\"", query.replace('"', "\"\""))
}

impl Database {
    /// Insert or merge each release into the `release` table, one transaction per
    /// batch. Returns the dedupe keys that were newly created (as opposed to merged
    /// into an existing row). Rows that fail a data-integrity check (non-finite
    /// timestamp, oversized payload) are skipped with a warning; the batch commits.
    pub async fn upsert_releases(&self, releases: &[Release]) -> Result<HashSet<String>> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin release upsert transaction: {}",
                e
            )))
        })?;

        let mut inserted = HashSet::new();
        for release in releases {
            match Self::upsert_one(&mut tx, release).await {
                Ok(true) => {
                    inserted.insert(release.dedupe_key());
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(
                        norm_title = %release.norm_title,
                        error = %e,
                        "release_upsert_skipped"
                    );
                }
            }
        }

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit release upsert: {}",
                e
            )))
        })?;

        Ok(inserted)
    }

    /// `true` when the row did not previously exist.
    async fn upsert_one(tx: &mut Transaction<'_, Sqlite>, release: &Release) -> Result<bool> {
        let dedupe_key = release.dedupe_key();
        let now = Utc::now().timestamp();
        let tags_json = serde_json::to_string(&release.tags)?;
        let segments_json = serde_json::to_string(&release.segments)?;
        let vector = search_vector(&release.norm_title, &release.tags);
        let posted_at = release.posted_at.map(|d| d.timestamp());

        let existing: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM release WHERE norm_title = ? AND category_id = ? AND posted_at IS ?",
        )
        .bind(&release.norm_title)
        .bind(release.category_id as i64)
        .bind(posted_at)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to look up release {dedupe_key}: {}",
                e
            )))
        })?;

        sqlx::query(
            r#"
            INSERT INTO release (
                dedupe_key, norm_title, category_id, posted_at, language, tags,
                source_group, size_bytes, segments, has_parts, part_count,
                search_vector, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (norm_title, category_id, posted_at) DO UPDATE SET
                size_bytes = excluded.size_bytes,
                segments = excluded.segments,
                has_parts = excluded.has_parts,
                part_count = excluded.part_count,
                tags = excluded.tags,
                search_vector = excluded.search_vector,
                posted_at = CASE
                    WHEN release.posted_at IS NULL THEN excluded.posted_at
                    WHEN excluded.posted_at IS NULL THEN release.posted_at
                    ELSE MIN(release.posted_at, excluded.posted_at)
                END,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&dedupe_key)
        .bind(&release.norm_title)
        .bind(release.category_id as i64)
        .bind(posted_at)
        .bind(&release.language)
        .bind(&tags_json)
        .bind(&release.source_group)
        .bind(release.size_bytes as i64)
        .bind(&segments_json)
        .bind(release.has_parts() as i64)
        .bind(release.part_count() as i64)
        .bind(&vector)
        .bind(now)
        .bind(now)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to upsert release {dedupe_key}: {}",
                e
            )))
        })?;

        // release_fts is contentless; re-sync by delete-then-insert rather than update.
        sqlx::query("DELETE FROM release_fts WHERE dedupe_key = ?")
            .bind(&dedupe_key)
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to clear fts row for {dedupe_key}: {}",
                    e
                )))
            })?;
        sqlx::query("INSERT INTO release_fts (dedupe_key, search_vector) VALUES (?, ?)")
            .bind(&dedupe_key)
            .bind(&vector)
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to index release {dedupe_key}: {}",
                    e
                )))
            })?;

        Ok(existing.is_none())
    }

    /// Previously-stored segments for each of `dedupe_keys`, used by the deduper to
    /// merge a new batch against what is already durable.
    pub async fn get_segments(&self, dedupe_keys: &[String]) -> Result<HashMap<String, Vec<Segment>>> {
        if dedupe_keys.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = dedupe_keys.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let query = format!("SELECT dedupe_key, segments FROM release WHERE dedupe_key IN ({placeholders})");
        let mut q = sqlx::query_as::<_, (String, String)>(&query);
        for key in dedupe_keys {
            q = q.bind(key);
        }

        let rows = q.fetch_all(&self.pool).await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to fetch existing segments: {}",
                e
            )))
        })?;

        Ok(rows
            .into_iter()
            .map(|(key, segments)| (key, serde_json::from_str(&segments).unwrap_or_default()))
            .collect())
    }

    /// Fetch a single release by dedupe key (used by [`crate::nzb_builder`]).
    pub async fn get_release(&self, dedupe_key: &str) -> Result<Option<Release>> {
        let row = sqlx::query_as::<_, ReleaseRow>(
            r#"
            SELECT dedupe_key, norm_title, category_id, posted_at, language, tags,
                   source_group, size_bytes, segments, has_parts, part_count
            FROM release WHERE dedupe_key = ?
            "#,
        )
        .bind(dedupe_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to fetch release {dedupe_key}: {}",
                e
            )))
        })?;

        Ok(row.map(ReleaseRow::into_release))
    }

    /// Delete every release whose `source_group` is `group` (used when a group moves
    /// to the ignore list).
    pub async fn delete_by_group(&self, group: &str) -> Result<u64> {
        sqlx::query(
            "DELETE FROM release_fts WHERE dedupe_key IN \
             (SELECT dedupe_key FROM release WHERE source_group = ?)",
        )
        .bind(group)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to clear fts rows for group {group}: {}",
                e
            )))
        })?;

        let result = sqlx::query("DELETE FROM release WHERE source_group = ?")
            .bind(group)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete releases for group {group}: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected())
    }

    /// Search releases by free-text query (matched as an FTS5 phrase against
    /// `norm_title`/`tags`) and/or Newznab category, newest first.
    pub async fn search(
        &self,
        query: Option<&str>,
        category: Option<u32>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Release>> {
        let category = category.map(|c| c as i64);

        let rows = if let Some(q) = query.filter(|q| !q.trim().is_empty()) {
            let phrase = fts_phrase(q);
            sqlx::query_as::<_, ReleaseRow>(
                r#"
                SELECT r.dedupe_key, r.norm_title, r.category_id, r.posted_at, r.language, r.tags,
                       r.source_group, r.size_bytes, r.segments, r.has_parts, r.part_count
                FROM release r
                JOIN release_fts f ON f.dedupe_key = r.dedupe_key
                WHERE release_fts MATCH ?
                  AND (? IS NULL OR r.category_id = ?)
                ORDER BY r.posted_at DESC
                LIMIT ? OFFSET ?
                "#,
            )
            .bind(phrase)
            .bind(category)
            .bind(category)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, ReleaseRow>(
                r#"
                SELECT dedupe_key, norm_title, category_id, posted_at, language, tags,
                       source_group, size_bytes, segments, has_parts, part_count
                FROM release
                WHERE (? IS NULL OR category_id = ?)
                ORDER BY posted_at DESC
                LIMIT ? OFFSET ?
                "#,
            )
            .bind(category)
            .bind(category)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| Error::Database(DatabaseError::QueryFailed(format!("search query failed: {}", e))))?;

        Ok(rows.into_iter().map(ReleaseRow::into_release).collect())
    }

    /// Delete releases posted before `cutoff` (retention pruning). Releases with no
    /// known `posted_at` are never pruned by age.
    pub async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM release WHERE posted_at IS NOT NULL AND posted_at < ?")
            .bind(cutoff.timestamp())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to prune releases older than {cutoff}: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected())
    }

    /// Delete releases whose tag set contains one of `disallowed` extensions
    /// (e.g. `rar`, `exe`).
    pub async fn prune_by_extension(&self, disallowed: &[String]) -> Result<u64> {
        if disallowed.is_empty() {
            return Ok(0);
        }

        let mut total = 0;
        for ext in disallowed {
            let pattern = format!("%\"{}\"%", ext.to_lowercase());
            let result = sqlx::query("DELETE FROM release WHERE tags LIKE ?")
                .bind(&pattern)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to prune releases with extension {ext}: {}",
                        e
                    )))
                })?;
            total += result.rows_affected();
        }

        Ok(total)
    }

    /// Delete releases outside `[min_by_category[category], max]`; categories absent
    /// from `min_by_category` are only checked against `max`.
    pub async fn prune_by_size(&self, min_by_category: &HashMap<u32, u64>, max: u64) -> Result<u64> {
        let mut total = 0;

        let result = sqlx::query("DELETE FROM release WHERE size_bytes > ?")
            .bind(max as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to prune oversized releases: {}",
                    e
                )))
            })?;
        total += result.rows_affected();

        for (category_id, min_bytes) in min_by_category {
            let result = sqlx::query("DELETE FROM release WHERE category_id = ? AND size_bytes < ?")
                .bind(*category_id as i64)
                .bind(*min_bytes as i64)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to prune undersized releases for category {category_id}: {}",
                        e
                    )))
                })?;
            total += result.rows_affected();
        }

        Ok(total)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Segment;

    async fn test_db() -> Database {
        let dir = tempfile::tempdir().unwrap();
        Database::new(&dir.path().join("r.sqlite")).await.unwrap()
    }

    fn release(norm_title: &str, size: u64) -> Release {
        Release {
            norm_title: norm_title.to_string(),
            category_id: 2000,
            posted_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single(),
            language: "und".to_string(),
            tags: vec!["1080p".to_string()],
            source_group: "alt.binaries.movies".to_string(),
            size_bytes: size,
            segments: vec![Segment {
                number: 1,
                message_id: "m1".to_string(),
                group: "alt.binaries.movies".to_string(),
                size,
            }],
        }
    }

    #[tokio::test]
    async fn upsert_reports_new_rows_once() {
        let db = test_db().await;
        let r = release("example film", 100);
        let inserted = db.upsert_releases(&[r.clone()]).await.unwrap();
        assert!(inserted.contains(&r.dedupe_key()));

        // Re-upserting the same key is a merge, not a fresh insert.
        let inserted_again = db.upsert_releases(&[r.clone()]).await.unwrap();
        assert!(!inserted_again.contains(&r.dedupe_key()));
    }

    #[tokio::test]
    async fn delete_by_group_removes_matching_rows_only() {
        let db = test_db().await;
        let mut other = release("other show", 50);
        other.source_group = "alt.binaries.tv".to_string();
        db.upsert_releases(&[release("example film", 100), other]).await.unwrap();

        let removed = db.delete_by_group("alt.binaries.movies").await.unwrap();
        assert_eq!(removed, 1);
        assert!(db.get_release(&release("example film", 100).dedupe_key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn search_matches_title_and_respects_category_filter() {
        let db = test_db().await;
        let mut show = release("great space show", 500);
        show.category_id = 5000;
        show.source_group = "alt.binaries.tv".to_string();
        db.upsert_releases(&[release("example film", 100), show.clone()]).await.unwrap();

        let hits = db.search(Some("space show"), None, 10, 0).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].norm_title, "great space show");

        let filtered = db.search(None, Some(2000), 10, 0).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].norm_title, "example film");

        let no_match = db.search(Some("nonexistent"), None, 10, 0).await.unwrap();
        assert!(no_match.is_empty());
    }

    #[tokio::test]
    async fn delete_by_group_also_clears_fts_rows() {
        let db = test_db().await;
        db.upsert_releases(&[release("example film", 100)]).await.unwrap();
        db.delete_by_group("alt.binaries.movies").await.unwrap();

        let hits = db.search(Some("example film"), None, 10, 0).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn partition_key_routes_by_category_and_year() {
        let posted = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).single();
        let (bucket, year) = partition_key(2050, posted);
        assert_eq!(bucket, CategoryBucket::Movies);
        assert_eq!(year, Some(2024));

        let (bucket, year) = partition_key(9999, None);
        assert_eq!(bucket, CategoryBucket::Other);
        assert_eq!(year, None);
    }
}
