use chrono::{Duration, Local, NaiveDate};
use rusqlite::types::ToSql;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::search::{self, KIND_CLIP};
use crate::db::Database;
use crate::error::{StoreError, StoreResult};

// Browse queries without an explicit limit are capped; searches are not, so
// old matches are never truncated away.
const DEFAULT_BROWSE_LIMIT: i64 = 500;
const DEFAULT_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClipboardItem {
    pub id: i64,
    pub content_type: String,
    pub content_data: Option<Vec<u8>>,
    pub content_text: Option<String>,
    pub preview: Option<String>,
    /// Creation time pre-formatted in the local zone (`%Y-%m-%d %H:%M:%S`).
    pub created_at: String,
}

/// Composable filters for clipboard history retrieval. All fields optional;
/// dates are `YYYY-MM-DD` strings and malformed values fail the query with
/// [`StoreError::Validation`] rather than silently matching nothing.
#[derive(Debug, Clone, Default)]
pub struct ClipboardQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub content_type: Option<String>,
    pub search_term: Option<String>,
    pub limit: Option<i64>,
    pub search_all_dates: bool,
}

pub(crate) const CLIPBOARD_COLUMNS: &str = "id, content_type, content_data, content_text, \
     preview, strftime('%Y-%m-%d %H:%M:%S', datetime(created_at, 'localtime')) AS created_at";

pub(crate) fn item_from_row(row: &Row<'_>) -> Result<ClipboardItem, rusqlite::Error> {
    Ok(ClipboardItem {
        id: row.get(0)?,
        content_type: row.get(1)?,
        content_data: row.get(2)?,
        content_text: row.get(3)?,
        preview: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn parse_date(value: &str) -> StoreResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| StoreError::Validation(format!("unparsable date: {value}")))
}

impl Database {
    /// Append a clipboard item and its search-index row in one transaction.
    /// The creation timestamp is assigned here, not by the capture source.
    pub fn add_clipboard_item(
        &self,
        content_type: &str,
        content_data: Option<&[u8]>,
        content_text: Option<&str>,
        preview: Option<&str>,
    ) -> StoreResult<i64> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO clipboard_history (content_type, content_data, content_text, preview)
             VALUES (?1, ?2, ?3, ?4)",
            params![content_type, content_data, content_text, preview],
        )?;
        let id = tx.last_insert_rowid();
        search::upsert_index_row(&tx, KIND_CLIP, id, &search::clip_body(content_text, preview))?;
        tx.commit()?;
        Ok(id)
    }

    pub fn get_clipboard_item(&self, id: i64) -> StoreResult<Option<ClipboardItem>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {CLIPBOARD_COLUMNS} FROM clipboard_history WHERE id = ?1"),
            params![id],
            item_from_row,
        )
        .optional()
        .map_err(StoreError::from)
    }

    /// History rows are append-only; removal is a hard delete paired with the
    /// index delete in one transaction.
    pub fn delete_clipboard_item(&self, id: i64) -> StoreResult<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let deleted = tx.execute("DELETE FROM clipboard_history WHERE id = ?1", params![id])?;
        search::delete_index_row(&tx, KIND_CLIP, id)?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    /// Retrieve history with the composed filters of `query`. Date comparisons
    /// use the local calendar day of each row's timestamp: a clip at 23:58 and
    /// one at 00:02 the next day land on different days even minutes apart.
    pub fn list_clipboard_items(&self, query: &ClipboardQuery) -> StoreResult<Vec<ClipboardItem>> {
        let start = query.start_date.as_deref().map(parse_date).transpose()?;
        let end = query.end_date.as_deref().map(parse_date).transpose()?;
        let term = query
            .search_term
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());
        let kind = query
            .content_type
            .as_deref()
            .map(str::to_lowercase)
            .filter(|t| t != "all");

        let mut sql = format!(
            "SELECT {CLIPBOARD_COLUMNS} FROM clipboard_history WHERE 1=1"
        );
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if start.is_none() && end.is_none() && !query.search_all_dates {
            let window_start = Local::now().date_naive() - Duration::days(DEFAULT_WINDOW_DAYS);
            sql.push_str(" AND date(datetime(created_at, 'localtime')) >= date(?)");
            values.push(Box::new(window_start.format("%Y-%m-%d").to_string()));
        }

        match (start, end) {
            (Some(from), Some(to)) => {
                sql.push_str(
                    " AND date(datetime(created_at, 'localtime')) BETWEEN date(?) AND date(?)",
                );
                values.push(Box::new(from.format("%Y-%m-%d").to_string()));
                values.push(Box::new(to.format("%Y-%m-%d").to_string()));
            }
            (Some(day), None) => {
                sql.push_str(" AND date(datetime(created_at, 'localtime')) = date(?)");
                values.push(Box::new(day.format("%Y-%m-%d").to_string()));
            }
            _ => {}
        }

        if let Some(kind) = &kind {
            sql.push_str(" AND content_type = ?");
            values.push(Box::new(kind.clone()));
        } else if term.is_some() {
            // Images have no searchable text; an explicit type filter of
            // "image" still returns them even without a term.
            sql.push_str(" AND content_type != 'image'");
        }

        if let Some(term) = term {
            let pattern = format!("%{term}%");
            sql.push_str(" AND (content_text LIKE ? OR preview LIKE ?)");
            values.push(Box::new(pattern.clone()));
            values.push(Box::new(pattern));
        }

        sql.push_str(" ORDER BY clipboard_history.created_at DESC, id DESC");

        let limit = query.limit.or_else(|| {
            (term.is_none() && !query.search_all_dates).then_some(DEFAULT_BROWSE_LIMIT)
        });
        if let Some(limit) = limit {
            sql.push_str(" LIMIT ?");
            values.push(Box::new(limit));
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let refs: Vec<&dyn ToSql> = values.iter().map(AsRef::as_ref).collect();
        let rows = stmt.query_map(refs.as_slice(), item_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    /// Distinct local dates that have history, newest first.
    pub fn list_clipboard_dates(&self) -> StoreResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT date(datetime(created_at, 'localtime')) AS clip_date
             FROM clipboard_history
             ORDER BY clip_date DESC",
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    /// The single most recent image row's payload, for duplicate detection.
    pub fn latest_image_data(&self) -> StoreResult<Option<Vec<u8>>> {
        let conn = self.conn()?;
        let data: Option<Option<Vec<u8>>> = conn
            .query_row(
                "SELECT content_data FROM clipboard_history
                 WHERE content_type = 'image'
                 ORDER BY created_at DESC, id DESC
                 LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(data.flatten())
    }
}
