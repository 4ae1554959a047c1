use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::search::{self, KIND_SNIPPET};
use crate::db::Database;
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub(crate) const SNIPPET_COLUMNS: &str = "id, title, content, category, created_at, updated_at";

pub(crate) fn snippet_from_row(row: &Row<'_>) -> Result<Snippet, rusqlite::Error> {
    Ok(Snippet {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        category: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

impl Database {
    /// Insert a snippet and its search-index row in one transaction.
    pub fn add_snippet(&self, title: &str, content: &str, category: &str) -> StoreResult<i64> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO snippets (title, content, category) VALUES (?1, ?2, ?3)",
            params![title, content, category],
        )?;
        let id = tx.last_insert_rowid();
        search::upsert_index_row(
            &tx,
            KIND_SNIPPET,
            id,
            &search::snippet_body(title, content, category),
        )?;
        tx.commit()?;
        Ok(id)
    }

    /// Returns false when no row matched; the index is only touched for a real
    /// update.
    pub fn update_snippet(
        &self,
        id: i64,
        title: &str,
        content: &str,
        category: &str,
    ) -> StoreResult<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let changed = tx.execute(
            "UPDATE snippets
             SET title = ?1, content = ?2, category = ?3,
                 updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
             WHERE id = ?4",
            params![title, content, category, id],
        )?;
        if changed > 0 {
            search::upsert_index_row(
                &tx,
                KIND_SNIPPET,
                id,
                &search::snippet_body(title, content, category),
            )?;
        }
        tx.commit()?;
        Ok(changed > 0)
    }

    pub fn delete_snippet(&self, id: i64) -> StoreResult<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let deleted = tx.execute("DELETE FROM snippets WHERE id = ?1", params![id])?;
        search::delete_index_row(&tx, KIND_SNIPPET, id)?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    pub fn get_snippet(&self, id: i64) -> StoreResult<Option<Snippet>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {SNIPPET_COLUMNS} FROM snippets WHERE id = ?1"),
            params![id],
            snippet_from_row,
        )
        .optional()
        .map_err(StoreError::from)
    }

    /// `Some("")` selects the uncategorized bucket (NULL and empty category are
    /// the same bucket); `None` lists everything.
    pub fn list_snippets(&self, category: Option<&str>) -> StoreResult<Vec<Snippet>> {
        let conn = self.conn()?;
        let rows = match category {
            Some("") => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SNIPPET_COLUMNS} FROM snippets
                     WHERE category IS NULL OR category = ''
                     ORDER BY title"
                ))?;
                let rows = stmt.query_map([], snippet_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            Some(name) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SNIPPET_COLUMNS} FROM snippets WHERE category = ?1 ORDER BY title"
                ))?;
                let rows = stmt.query_map(params![name], snippet_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn
                    .prepare(&format!("SELECT {SNIPPET_COLUMNS} FROM snippets ORDER BY title"))?;
                let rows = stmt.query_map([], snippet_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(rows)
    }

    pub fn list_categories(&self) -> StoreResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT category FROM snippets
             WHERE category IS NOT NULL AND category != ''
             ORDER BY category",
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    /// Categories are labels on snippet rows, not rows of their own: renaming
    /// is a bulk update across every snippet carrying the label, and each
    /// affected snippet gets its index row rewritten in the same transaction.
    pub fn rename_category(&self, old: &str, new: &str) -> StoreResult<usize> {
        if old.is_empty() {
            return Ok(0);
        }
        self.retag_category(old, new)
    }

    /// Clear the label on every snippet in a category. Returns affected count.
    pub fn clear_category(&self, name: &str) -> StoreResult<usize> {
        if name.is_empty() {
            return Ok(0);
        }
        self.retag_category(name, "")
    }

    fn retag_category(&self, from: &str, to: &str) -> StoreResult<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let affected: Vec<(i64, String, String)> = {
            let mut stmt =
                tx.prepare("SELECT id, title, content FROM snippets WHERE category = ?1")?;
            let rows = stmt.query_map(params![from], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        tx.execute(
            "UPDATE snippets
             SET category = ?1, updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
             WHERE category = ?2",
            params![to, from],
        )?;
        for (id, title, content) in &affected {
            search::upsert_index_row(
                &tx,
                KIND_SNIPPET,
                *id,
                &search::snippet_body(title, content, to),
            )?;
        }
        tx.commit()?;
        Ok(affected.len())
    }
}
