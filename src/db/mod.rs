mod clipboard;
mod schema;
mod search;
mod snippets;
mod worldclock;

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{Duration, Local};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{info, warn};

use crate::error::{StoreError, StoreResult};

pub use clipboard::{ClipboardItem, ClipboardQuery};
pub use snippets::Snippet;
pub use worldclock::{CustomIntegration, IntegrationParameter, IntegrationUpsert, WorldClockEntry};

pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Store construction parameters. Retention is the fallback window for
/// [`Database::cleanup_old_items`] when the caller passes no explicit value.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub retention_days: i64,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

pub struct Database {
    conn: Mutex<Connection>,
    retention_days: i64,
}

impl Database {
    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Open (or create) the store. Idempotent: safe to call on every process
    /// start. Any open or migration failure is fatal and surfaces as
    /// [`StoreError::Unavailable`].
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        if let Some(parent) = config.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        }
        let conn = Connection::open(&config.path)
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        Self::initialize(&conn).map_err(|err| StoreError::Unavailable(err.to_string()))?;
        info!("store opened at {}", config.path.display());
        Ok(Self {
            conn: Mutex::new(conn),
            retention_days: config.retention_days,
        })
    }

    #[cfg(test)]
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        Self::initialize(&conn).map_err(|err| StoreError::Unavailable(err.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
            retention_days: DEFAULT_RETENTION_DAYS,
        })
    }

    fn initialize(conn: &Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            ",
        )?;
        schema::ensure_schema(conn)
    }

    // Settings: flat key/value, last writer wins.

    pub fn set_setting(&self, key: &str, value: &str) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> StoreResult<Option<String>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(StoreError::from)
    }

    pub fn get_setting_or(&self, key: &str, default: &str) -> StoreResult<String> {
        Ok(self.get_setting(key)?.unwrap_or_else(|| default.to_string()))
    }

    pub fn list_settings(&self) -> StoreResult<HashMap<String, String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<Result<HashMap<_, _>, _>>()
            .map_err(StoreError::from)
    }

    // Retention and maintenance.

    /// Delete clipboard items whose local creation date is strictly older than
    /// `now - days`, returning the number removed. The delete (and its paired
    /// search-index delete) commits first; space reclamation then runs outside
    /// any transaction and is non-fatal on failure.
    pub fn cleanup_old_items(&self, days: Option<i64>) -> StoreResult<usize> {
        let days = days.unwrap_or(self.retention_days);
        let cutoff = (Local::now().date_naive() - Duration::days(days))
            .format("%Y-%m-%d")
            .to_string();

        let deleted = {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM search_index WHERE kind = 'clip' AND item_id IN (
                   SELECT id FROM clipboard_history
                   WHERE date(datetime(created_at, 'localtime')) < date(?1)
                 )",
                params![cutoff],
            )?;
            let deleted = tx.execute(
                "DELETE FROM clipboard_history
                 WHERE date(datetime(created_at, 'localtime')) < date(?1)",
                params![cutoff],
            )?;
            tx.commit()?;
            deleted
        };

        if deleted > 0 {
            info!("retention cleanup removed {deleted} clipboard items");
            // VACUUM cannot run inside a transaction.
            let conn = self.conn()?;
            if let Err(err) = conn.execute_batch("VACUUM") {
                warn!("space reclamation after cleanup failed: {err}");
            }
        }
        Ok(deleted)
    }

    /// Heavy maintenance: statistics, index rebuild, full space reclamation.
    /// Meant for an explicit user action or an idle window, not the write path.
    pub fn optimize(&self) -> StoreResult<()> {
        self.optimize_cancellable(&AtomicBool::new(false))
    }

    /// As [`Database::optimize`], but checks `cancel` before each step so a
    /// long-running pass can be abandoned at the next operation boundary.
    pub fn optimize_cancellable(&self, cancel: &AtomicBool) -> StoreResult<()> {
        let conn = self.conn()?;
        for step in ["ANALYZE", "REINDEX", "VACUUM"] {
            if cancel.load(Ordering::Relaxed) {
                info!("optimize cancelled before {step}");
                return Ok(());
            }
            conn.execute_batch(step)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_file_and_reopen_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = StoreConfig::new(dir.path().join("store.sqlite3"));

        let db = Database::open(&config).expect("first open");
        db.set_setting("theme", "dark").expect("set");
        drop(db);

        let db = Database::open(&config).expect("second open");
        assert_eq!(
            db.get_setting("theme").expect("get").as_deref(),
            Some("dark")
        );
    }

    #[test]
    fn settings_are_last_writer_wins() {
        let db = Database::in_memory().expect("db init");
        db.set_setting("retention", "30").expect("set");
        db.set_setting("retention", "90").expect("overwrite");

        assert_eq!(
            db.get_setting("retention").expect("get").as_deref(),
            Some("90")
        );
        assert_eq!(db.get_setting("missing").expect("get"), None);
        assert_eq!(
            db.get_setting_or("missing", "fallback").expect("get"),
            "fallback"
        );

        let all = db.list_settings().expect("list");
        assert_eq!(all.get("retention").map(String::as_str), Some("90"));
    }

    #[test]
    fn cleanup_removes_only_items_past_retention() {
        let db = Database::in_memory().expect("db init");
        for days_ago in [0, 10, 40, 400] {
            let id = db
                .add_clipboard_item("text", None, Some(&format!("clip {days_ago}")), Some("p"))
                .expect("insert");
            db.conn()
                .expect("conn")
                .execute(
                    "UPDATE clipboard_history
                     SET created_at = datetime('now', ?1 || ' days')
                     WHERE id = ?2",
                    params![-days_ago, id],
                )
                .expect("backdate");
        }

        let deleted = db.cleanup_old_items(Some(366)).expect("cleanup");
        assert_eq!(deleted, 1);
        let repeat = db.cleanup_old_items(Some(366)).expect("repeat cleanup");
        assert_eq!(repeat, 0);

        let remaining = db
            .list_clipboard_items(&ClipboardQuery {
                search_all_dates: true,
                ..ClipboardQuery::default()
            })
            .expect("list");
        assert_eq!(remaining.len(), 3);
    }

    #[test]
    fn cleanup_keeps_search_index_consistent() {
        let db = Database::in_memory().expect("db init");
        let id = db
            .add_clipboard_item("text", None, Some("expired payload"), Some("expired payload"))
            .expect("insert");
        db.conn()
            .expect("conn")
            .execute(
                "UPDATE clipboard_history SET created_at = datetime('now', '-40 days') WHERE id = ?1",
                params![id],
            )
            .expect("backdate");

        assert_eq!(db.cleanup_old_items(Some(30)).expect("cleanup"), 1);
        assert!(db.search_clipboard("expired").expect("search").is_empty());

        let orphans: i64 = db
            .conn()
            .expect("conn")
            .query_row(
                "SELECT COUNT(*) FROM search_index WHERE kind = 'clip'",
                [],
                |row| row.get(0),
            )
            .expect("count");
        assert_eq!(orphans, 0);
    }

    #[test]
    fn optimize_runs_and_honors_cancel() {
        let db = Database::in_memory().expect("db init");
        db.add_clipboard_item("text", None, Some("payload"), Some("payload"))
            .expect("insert");
        db.optimize().expect("optimize");

        let cancel = AtomicBool::new(true);
        db.optimize_cancellable(&cancel).expect("cancelled optimize");
    }
}
