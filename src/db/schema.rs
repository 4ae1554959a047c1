use std::collections::HashSet;

use rusqlite::Connection;

pub const CREATE_SNIPPETS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS snippets (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  title TEXT NOT NULL,
  content TEXT NOT NULL,
  category TEXT,
  created_at DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
  updated_at DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
);
"#;

pub const CREATE_CLIPBOARD_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS clipboard_history (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  content_type TEXT NOT NULL CHECK (content_type IN ('text', 'image')),
  content_data BLOB,
  content_text TEXT,
  preview TEXT,
  created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#;

pub const CREATE_WORLD_CLOCKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS world_clocks (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  city TEXT NOT NULL,
  timezone TEXT NOT NULL,
  use_dst INTEGER NOT NULL DEFAULT 1 CHECK (use_dst IN (0, 1))
);
"#;

pub const CREATE_SETTINGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS settings (
  key TEXT PRIMARY KEY,
  value TEXT NOT NULL
);
"#;

pub const CREATE_INTEGRATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS custom_integrations (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL UNIQUE,
  url TEXT NOT NULL,
  integration_type TEXT NOT NULL DEFAULT 'email'
    CHECK (integration_type IN ('email', 'launcher', 'url', 'batch')),
  app_path TEXT,
  parameters TEXT,
  created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
  updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#;

pub const CREATE_PARAMETERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS integration_parameters (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL UNIQUE,
  display TEXT NOT NULL,
  description TEXT,
  sample TEXT,
  category TEXT DEFAULT 'meeting'
);
"#;

pub const CREATE_SEARCH_INDEX_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS search_index (
  kind TEXT NOT NULL CHECK (kind IN ('snippet', 'clip')),
  item_id INTEGER NOT NULL,
  body TEXT NOT NULL,
  PRIMARY KEY (kind, item_id)
);
"#;

pub const CREATE_INDEX_SNIPPETS_CATEGORY: &str =
    "CREATE INDEX IF NOT EXISTS idx_snippets_category ON snippets(category);";
pub const CREATE_INDEX_SNIPPETS_TITLE: &str =
    "CREATE INDEX IF NOT EXISTS idx_snippets_title ON snippets(title);";
pub const CREATE_INDEX_CLIPBOARD_CREATED: &str =
    "CREATE INDEX IF NOT EXISTS idx_clipboard_created ON clipboard_history(created_at DESC);";
pub const CREATE_INDEX_CLIPBOARD_TYPE: &str =
    "CREATE INDEX IF NOT EXISTS idx_clipboard_content_type ON clipboard_history(content_type);";

pub const SEED_PARAMETERS: &str = r#"
INSERT OR IGNORE INTO integration_parameters (name, display, description, sample, category) VALUES
  ('%wc_city_name%', 'City Name', 'Name of the selected city', 'Houston', 'basic'),
  ('%wc_local_time%', 'Local Time', 'Your local time for the meeting', '2026-01-30 14:00', 'time'),
  ('%wc_target_time%', 'Target Time', 'Target city time for the meeting', '2026-01-30 02:30', 'time'),
  ('%wc_duration%', 'Duration', 'Meeting duration in minutes', '60', 'meeting'),
  ('%wc_meeting_url%', 'Meeting URL', 'Generated meeting URL', 'https://teams.microsoft.com/...', 'meeting'),
  ('%wc_timezone%', 'Timezone', 'Target city timezone', 'America/Chicago', 'basic'),
  ('%wc_local_timezone%', 'Local Timezone', 'Your local timezone', 'Asia/Kolkata', 'basic'),
  ('%wc_date%', 'Date', 'Meeting date', '2026-01-30', 'basic'),
  ('%wc_end_time%', 'End Time', 'Meeting end time (local)', '2026-01-30 15:00', 'time'),
  ('%wc_target_end_time%', 'Target End Time', 'Meeting end time (target)', '2026-01-30 03:30', 'time');
"#;

/// Fixed-order, idempotent schema steps. Each step is its own statement so a
/// failed open converges on retry instead of leaving a half-migrated file.
const SCHEMA_STEPS: &[&str] = &[
    CREATE_SNIPPETS_TABLE,
    CREATE_CLIPBOARD_TABLE,
    CREATE_WORLD_CLOCKS_TABLE,
    CREATE_SETTINGS_TABLE,
    CREATE_INTEGRATIONS_TABLE,
    CREATE_PARAMETERS_TABLE,
    CREATE_SEARCH_INDEX_TABLE,
    CREATE_INDEX_SNIPPETS_CATEGORY,
    CREATE_INDEX_SNIPPETS_TITLE,
    CREATE_INDEX_CLIPBOARD_CREATED,
    CREATE_INDEX_CLIPBOARD_TYPE,
];

pub fn ensure_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    for step in SCHEMA_STEPS {
        conn.execute_batch(step)?;
    }
    ensure_world_clock_dst_column(conn)?;
    conn.execute_batch(SEED_PARAMETERS)?;
    Ok(())
}

/// Additive migration: databases created before the per-clock DST flag existed
/// get the column with its default, preserving existing rows.
fn ensure_world_clock_dst_column(conn: &Connection) -> Result<(), rusqlite::Error> {
    let mut columns = HashSet::new();
    let mut stmt = conn.prepare("PRAGMA table_info(world_clocks)")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for row in rows {
        columns.insert(row?);
    }

    if !columns.contains("use_dst") {
        conn.execute_batch(
            "ALTER TABLE world_clocks ADD COLUMN use_dst INTEGER NOT NULL DEFAULT 1;",
        )?;
    }
    Ok(())
}
