use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorldClockEntry {
    pub id: i64,
    pub city: String,
    /// IANA zone id, e.g. "Asia/Tokyo".
    pub timezone: String,
    pub use_dst: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CustomIntegration {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub integration_type: String,
    pub app_path: Option<String>,
    pub parameters: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct IntegrationUpsert<'a> {
    pub name: &'a str,
    pub url: &'a str,
    pub integration_type: &'a str,
    pub app_path: Option<&'a str>,
    pub parameters: &'a [String],
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationParameter {
    pub name: String,
    pub display: String,
    pub description: Option<String>,
    pub sample: Option<String>,
    pub category: Option<String>,
}

fn integration_from_row(row: &Row<'_>) -> Result<CustomIntegration, rusqlite::Error> {
    let raw_parameters: Option<String> = row.get(5)?;
    Ok(CustomIntegration {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        integration_type: row.get(3)?,
        app_path: row.get(4)?,
        parameters: raw_parameters
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default(),
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl Database {
    /// New clocks start with DST handling enabled; use
    /// [`Database::update_world_clock_dst`] to opt a clock out.
    pub fn add_world_clock(&self, city: &str, timezone: &str) -> StoreResult<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO world_clocks (city, timezone) VALUES (?1, ?2)",
            params![city, timezone],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn list_world_clocks(&self) -> StoreResult<Vec<WorldClockEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, city, timezone, COALESCE(use_dst, 1) FROM world_clocks ORDER BY city",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(WorldClockEntry {
                id: row.get(0)?,
                city: row.get(1)?,
                timezone: row.get(2)?,
                use_dst: row.get::<_, i64>(3)? == 1,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    pub fn update_world_clock_dst(&self, id: i64, use_dst: bool) -> StoreResult<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE world_clocks SET use_dst = ?1 WHERE id = ?2",
            params![if use_dst { 1 } else { 0 }, id],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_world_clock(&self, id: i64) -> StoreResult<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM world_clocks WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    /// Upsert by name: writing an integration with an existing name replaces
    /// the prior row.
    pub fn save_integration(&self, integration: &IntegrationUpsert<'_>) -> StoreResult<()> {
        let parameters = serde_json::to_string(integration.parameters)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO custom_integrations
               (name, url, integration_type, app_path, parameters, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, CURRENT_TIMESTAMP)",
            params![
                integration.name,
                integration.url,
                integration.integration_type,
                integration.app_path,
                parameters,
            ],
        )?;
        Ok(())
    }

    pub fn list_integrations(&self) -> StoreResult<Vec<CustomIntegration>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, url, integration_type, app_path, parameters, created_at, updated_at
             FROM custom_integrations
             ORDER BY name",
        )?;
        let rows = stmt.query_map([], integration_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    pub fn delete_integration(&self, name: &str) -> StoreResult<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM custom_integrations WHERE name = ?1",
            params![name],
        )?;
        Ok(deleted > 0)
    }

    pub fn list_integration_parameters(&self) -> StoreResult<Vec<IntegrationParameter>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT name, display, description, sample, category
             FROM integration_parameters
             ORDER BY category, display",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(IntegrationParameter {
                name: row.get(0)?,
                display: row.get(1)?,
                description: row.get(2)?,
                sample: row.get(3)?,
                category: row.get(4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    pub fn add_integration_parameter(
        &self,
        name: &str,
        display: &str,
        description: &str,
        sample: &str,
        category: &str,
    ) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO integration_parameters
               (name, display, description, sample, category)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![name, display, description, sample, category],
        )?;
        Ok(())
    }

    pub fn delete_integration_parameter(&self, name: &str) -> StoreResult<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM integration_parameters WHERE name = ?1",
            params![name],
        )?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StoreConfig;

    #[test]
    fn new_clock_defaults_to_dst_enabled() {
        let db = Database::in_memory().expect("db init");
        let id = db.add_world_clock("Tokyo", "Asia/Tokyo").expect("add");

        let clocks = db.list_world_clocks().expect("list");
        assert_eq!(clocks.len(), 1);
        assert_eq!(clocks[0].id, id);
        assert_eq!(clocks[0].city, "Tokyo");
        assert!(clocks[0].use_dst);
    }

    #[test]
    fn dst_flag_can_be_toggled_and_clock_deleted() {
        let db = Database::in_memory().expect("db init");
        let id = db.add_world_clock("Phoenix", "America/Phoenix").expect("add");

        assert!(db.update_world_clock_dst(id, false).expect("toggle"));
        assert!(!db.list_world_clocks().expect("list")[0].use_dst);

        assert!(db.delete_world_clock(id).expect("delete"));
        assert!(!db.delete_world_clock(id).expect("repeat delete"));
        assert!(db.list_world_clocks().expect("list").is_empty());
    }

    #[test]
    fn pre_migration_rows_read_dst_enabled() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("legacy.sqlite3");
        {
            let conn = rusqlite::Connection::open(&path).expect("open legacy");
            conn.execute_batch(
                r#"
                CREATE TABLE world_clocks (
                  id INTEGER PRIMARY KEY AUTOINCREMENT,
                  city TEXT NOT NULL,
                  timezone TEXT NOT NULL
                );
                INSERT INTO world_clocks (city, timezone) VALUES ('Sydney', 'Australia/Sydney');
                "#,
            )
            .expect("seed legacy rows");
        }

        let db = Database::open(&StoreConfig::new(&path)).expect("open migrated");
        let clocks = db.list_world_clocks().expect("list");
        assert_eq!(clocks.len(), 1);
        assert_eq!(clocks[0].city, "Sydney");
        assert!(clocks[0].use_dst);
    }

    #[test]
    fn integration_upsert_replaces_by_name() {
        let db = Database::in_memory().expect("db init");
        db.save_integration(&IntegrationUpsert {
            name: "X",
            url: "https://first.example/",
            integration_type: "email",
            app_path: None,
            parameters: &[],
        })
        .expect("first save");
        db.save_integration(&IntegrationUpsert {
            name: "X",
            url: "https://second.example/",
            integration_type: "launcher",
            app_path: Some("/usr/bin/launch"),
            parameters: &["%wc_city_name%".to_string()],
        })
        .expect("second save");

        let integrations = db.list_integrations().expect("list");
        assert_eq!(integrations.len(), 1);
        assert_eq!(integrations[0].name, "X");
        assert_eq!(integrations[0].url, "https://second.example/");
        assert_eq!(integrations[0].integration_type, "launcher");
        assert_eq!(integrations[0].parameters, vec!["%wc_city_name%"]);
    }

    #[test]
    fn integration_delete_reports_missing_name() {
        let db = Database::in_memory().expect("db init");
        db.save_integration(&IntegrationUpsert {
            name: "Y",
            url: "https://example/",
            integration_type: "url",
            app_path: None,
            parameters: &[],
        })
        .expect("save");

        assert!(db.delete_integration("Y").expect("delete"));
        assert!(!db.delete_integration("Y").expect("repeat delete"));
    }

    #[test]
    fn parameter_catalog_is_seeded_and_editable() {
        let db = Database::in_memory().expect("db init");
        let seeded = db.list_integration_parameters().expect("list");
        assert!(seeded.iter().any(|p| p.name == "%wc_city_name%"));

        db.add_integration_parameter("%wc_room%", "Room", "Meeting room", "B42", "custom")
            .expect("add");
        let all = db.list_integration_parameters().expect("list");
        assert!(all.iter().any(|p| p.name == "%wc_room%"));

        assert!(db.delete_integration_parameter("%wc_room%").expect("delete"));
        assert!(!db.delete_integration_parameter("%wc_room%").expect("repeat"));
    }
}
