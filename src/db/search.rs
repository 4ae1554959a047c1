//! Explicit maintenance of the substring search index.
//!
//! The index is a plain table holding a lowercased projection of the searchable
//! columns, one row per primary row. Callers mutate it with the helpers below
//! inside the same transaction as the primary write, so a rollback can never
//! leave the index and the primary table disagreeing.

use rusqlite::{params, Connection};

use crate::db::clipboard::{item_from_row, ClipboardItem, CLIPBOARD_COLUMNS};
use crate::db::snippets::{snippet_from_row, Snippet, SNIPPET_COLUMNS};
use crate::db::Database;
use crate::error::StoreResult;

pub(crate) const KIND_SNIPPET: &str = "snippet";
pub(crate) const KIND_CLIP: &str = "clip";

/// Lowercasing happens in Rust rather than SQL so matching stays
/// case-insensitive beyond ASCII.
pub(crate) fn snippet_body(title: &str, content: &str, category: &str) -> String {
    format!("{title} {content} {category}").to_lowercase()
}

pub(crate) fn clip_body(content_text: Option<&str>, preview: Option<&str>) -> String {
    format!(
        "{} {}",
        content_text.unwrap_or_default(),
        preview.unwrap_or_default()
    )
    .to_lowercase()
}

/// Replace the index row for a primary row. Updates are modeled as
/// delete-old-then-insert-new so the body is always recomputed from the new
/// content.
pub(crate) fn upsert_index_row(
    conn: &Connection,
    kind: &str,
    item_id: i64,
    body: &str,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "DELETE FROM search_index WHERE kind = ?1 AND item_id = ?2",
        params![kind, item_id],
    )?;
    conn.execute(
        "INSERT INTO search_index (kind, item_id, body) VALUES (?1, ?2, ?3)",
        params![kind, item_id, body],
    )?;
    Ok(())
}

pub(crate) fn delete_index_row(
    conn: &Connection,
    kind: &str,
    item_id: i64,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "DELETE FROM search_index WHERE kind = ?1 AND item_id = ?2",
        params![kind, item_id],
    )?;
    Ok(())
}

pub(crate) fn like_pattern(term: &str) -> String {
    format!("%{}%", term.to_lowercase())
}

impl Database {
    /// Substring search over snippet title, content, and category. `Some("")`
    /// restricts to the uncategorized bucket, `None` searches everything.
    pub fn search_snippets(
        &self,
        term: &str,
        category: Option<&str>,
    ) -> StoreResult<Vec<Snippet>> {
        let pattern = like_pattern(term);
        let conn = self.conn()?;

        let base = format!(
            "SELECT {SNIPPET_COLUMNS} FROM snippets s
             JOIN search_index x ON x.kind = 'snippet' AND x.item_id = s.id
             WHERE x.body LIKE ?1"
        );
        let rows = match category {
            Some("") => {
                let mut stmt = conn.prepare(&format!(
                    "{base} AND (s.category IS NULL OR s.category = '') ORDER BY s.title"
                ))?;
                let rows = stmt.query_map(params![pattern], snippet_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            Some(name) => {
                let mut stmt =
                    conn.prepare(&format!("{base} AND s.category = ?2 ORDER BY s.title"))?;
                let rows = stmt.query_map(params![pattern, name], snippet_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!("{base} ORDER BY s.title"))?;
                let rows = stmt.query_map(params![pattern], snippet_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(rows)
    }

    /// Substring search over clipboard text and preview, all dates, newest
    /// first. Image rows carry no searchable text and are excluded.
    pub fn search_clipboard(&self, term: &str) -> StoreResult<Vec<ClipboardItem>> {
        let pattern = like_pattern(term);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CLIPBOARD_COLUMNS} FROM clipboard_history c
             JOIN search_index x ON x.kind = 'clip' AND x.item_id = c.id
             WHERE x.body LIKE ?1 AND c.content_type != 'image'
             ORDER BY c.created_at DESC, c.id DESC"
        ))?;
        let rows = stmt.query_map(params![pattern], item_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
