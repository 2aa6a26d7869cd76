//! Per-group watermark CRUD.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use sqlx::FromRow;

use crate::error::DatabaseError;
use crate::types::Cursor;
use crate::{Error, Result};

use super::Database;

/// Raw cursor row as stored in SQLite.
#[derive(Debug, Clone, FromRow)]
pub struct CursorRow {
    #[sqlx(rename = "group")]
    group: String,
    last_article: i64,
    irrelevant_until: Option<i64>,
    probe_at: Option<i64>,
}

impl From<CursorRow> for Cursor {
    fn from(row: CursorRow) -> Self {
        Cursor {
            group: row.group,
            last_article: row.last_article.max(0) as u64,
            irrelevant_until: row.irrelevant_until.and_then(epoch_to_datetime),
            probe_at: row.probe_at.and_then(epoch_to_datetime),
        }
    }
}

fn epoch_to_datetime(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

impl Database {
    /// Bulk-fetch the current cursor for each of `groups`; groups with no row are
    /// simply absent from the returned map (equivalent to `last_article = 0`).
    pub async fn get_cursors(&self, groups: &[String]) -> Result<HashMap<String, Cursor>> {
        if groups.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = groups.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let query = format!(
            r#"SELECT "group", last_article, irrelevant_until, probe_at
               FROM cursor WHERE "group" IN ({placeholders})"#
        );

        let mut q = sqlx::query_as::<_, CursorRow>(&query);
        for group in groups {
            q = q.bind(group);
        }

        let rows = q.fetch_all(&self.pool).await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to fetch cursors: {}",
                e
            )))
        })?;

        Ok(rows.into_iter().map(|r| (r.group.clone(), Cursor::from(r))).collect())
    }

    /// Upsert `last_article` for `group`, leaving irrelevance/probe fields untouched.
    pub async fn set_cursor(&self, group: &str, last_article: u64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cursor ("group", last_article) VALUES (?, ?)
            ON CONFLICT("group") DO UPDATE SET last_article = excluded.last_article
            "#,
        )
        .bind(group)
        .bind(last_article as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to set cursor for {group}: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Mark `group` irrelevant until `now + ttl`; a probe is scheduled for the same
    /// instant so the next due-probe sweep retries exactly once.
    pub async fn mark_irrelevant(&self, group: &str, ttl: chrono::Duration) -> Result<()> {
        let until = (Utc::now() + ttl).timestamp();
        sqlx::query(
            r#"
            INSERT INTO cursor ("group", last_article, irrelevant_until, probe_at)
            VALUES (?, 0, ?, ?)
            ON CONFLICT("group") DO UPDATE SET
                irrelevant_until = excluded.irrelevant_until,
                probe_at = excluded.probe_at
            "#,
        )
        .bind(group)
        .bind(until)
        .bind(until)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to mark {group} irrelevant: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Clear irrelevance and the pending probe for `group`.
    pub async fn unmark_irrelevant(&self, group: &str) -> Result<()> {
        sqlx::query(
            r#"UPDATE cursor SET irrelevant_until = NULL, probe_at = NULL WHERE "group" = ?"#,
        )
        .bind(group)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to unmark {group}: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Schedule a single probe for `group` at `now + delay`.
    pub async fn schedule_probe(&self, group: &str, delay: chrono::Duration) -> Result<()> {
        let at = (Utc::now() + delay).timestamp();
        sqlx::query(
            r#"
            INSERT INTO cursor ("group", last_article, probe_at) VALUES (?, 0, ?)
            ON CONFLICT("group") DO UPDATE SET probe_at = excluded.probe_at
            "#,
        )
        .bind(group)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to schedule probe for {group}: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Groups whose scheduled probe time has arrived.
    pub async fn due_probes(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        let rows: Vec<String> = sqlx::query_scalar(
            r#"SELECT "group" FROM cursor WHERE probe_at IS NOT NULL AND probe_at <= ?"#,
        )
        .bind(now.timestamp())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to query due probes: {}",
                e
            )))
        })?;

        Ok(rows)
    }
}
