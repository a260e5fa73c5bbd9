//! SQLite-backed credential store implementation.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::store::CredentialStore;
use super::types::{CredentialError, CredentialRecord, HeaderBundle};

/// SQLite-backed credential store. Header maps are persisted as JSON text.
pub struct SqliteCredentialStore {
    conn: Mutex<Connection>,
}

impl SqliteCredentialStore {
    /// Open (or create) the store at the given path.
    pub fn new(path: &Path) -> Result<Self, CredentialError> {
        let conn = Connection::open(path).map_err(|e| CredentialError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, CredentialError> {
        let conn =
            Connection::open_in_memory().map_err(|e| CredentialError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CredentialError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS credentials (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                headers TEXT NOT NULL,
                cookie TEXT NOT NULL,
                created_at TEXT NOT NULL,
                last_used TEXT,
                failures INTEGER NOT NULL DEFAULT 0,
                active INTEGER NOT NULL DEFAULT 1
            );

            CREATE INDEX IF NOT EXISTS idx_credentials_active ON credentials(active, created_at);
            CREATE INDEX IF NOT EXISTS idx_credentials_cookie ON credentials(cookie);
            "#,
        )
        .map_err(|e| CredentialError::Database(e.to_string()))?;

        Ok(())
    }

    /// Insert a record with an explicit creation timestamp. Exposed for
    /// expiry-sweep tests, which need backdated records.
    pub fn insert_created_at(
        &self,
        bundle: HeaderBundle,
        created_at: DateTime<Utc>,
    ) -> Result<CredentialRecord, CredentialError> {
        let cookie = bundle
            .cookie()
            .ok_or(CredentialError::MissingCookie)?
            .to_string();
        let headers_json = serde_json::to_string(bundle.headers())
            .map_err(|e| CredentialError::Database(e.to_string()))?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO credentials (headers, cookie, created_at, failures, active)
             VALUES (?, ?, ?, 0, 1)",
            params![headers_json, cookie, created_at.to_rfc3339()],
        )
        .map_err(|e| CredentialError::Database(e.to_string()))?;

        Ok(CredentialRecord {
            id: conn.last_insert_rowid(),
            bundle,
            created_at,
            last_used: None,
            failures: 0,
            active: true,
        })
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<CredentialRecord> {
        let headers_json: String = row.get(1)?;
        let created_at_str: String = row.get(2)?;
        let last_used_str: Option<String> = row.get(3)?;

        let headers: HashMap<String, String> =
            serde_json::from_str(&headers_json).unwrap_or_default();
        // Stored rows were validated on insert; a row that no longer parses
        // degrades to an inactive-looking empty bundle rather than failing
        // the whole query.
        let bundle = HeaderBundle::new(headers).unwrap_or_else(|_| HeaderBundle::fallback());

        Ok(CredentialRecord {
            id: row.get(0)?,
            bundle,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            last_used: last_used_str
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
            failures: row.get(4)?,
            active: row.get(5)?,
        })
    }
}

const RECORD_COLUMNS: &str = "id, headers, created_at, last_used, failures, active";

fn freshness_cutoff(max_age_hours: i64) -> String {
    (Utc::now() - Duration::hours(max_age_hours)).to_rfc3339()
}

impl CredentialStore for SqliteCredentialStore {
    fn insert(&self, bundle: HeaderBundle) -> Result<CredentialRecord, CredentialError> {
        self.insert_created_at(bundle, Utc::now())
    }

    fn active_records(&self, max_age_hours: i64) -> Result<Vec<CredentialRecord>, CredentialError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM credentials
                 WHERE active = 1 AND cookie != '' AND created_at > ?
                 ORDER BY last_used ASC NULLS FIRST"
            ))
            .map_err(|e| CredentialError::Database(e.to_string()))?;

        let records = stmt
            .query_map(params![freshness_cutoff(max_age_hours)], Self::row_to_record)
            .map_err(|e| CredentialError::Database(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CredentialError::Database(e.to_string()))?;

        Ok(records)
    }

    fn active_count(&self, max_age_hours: i64) -> Result<usize, CredentialError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM credentials
                 WHERE active = 1 AND cookie != '' AND created_at > ?",
                params![freshness_cutoff(max_age_hours)],
                |row| row.get(0),
            )
            .map_err(|e| CredentialError::Database(e.to_string()))?;

        Ok(count as usize)
    }

    fn find_active_by_cookie(
        &self,
        cookie: &str,
    ) -> Result<Option<CredentialRecord>, CredentialError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM credentials WHERE cookie = ? AND active = 1"),
            params![cookie],
            Self::row_to_record,
        )
        .optional()
        .map_err(|e| CredentialError::Database(e.to_string()))
    }

    fn touch_used(&self, id: i64) -> Result<(), CredentialError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE credentials SET last_used = ? WHERE id = ?",
            params![Utc::now().to_rfc3339(), id],
        )
        .map_err(|e| CredentialError::Database(e.to_string()))?;
        Ok(())
    }

    fn record_failure(&self, id: i64, max_failures: u32) -> Result<u32, CredentialError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE credentials SET failures = failures + 1,
             active = CASE WHEN failures + 1 >= ? THEN 0 ELSE active END
             WHERE id = ?",
            params![max_failures, id],
        )
        .map_err(|e| CredentialError::Database(e.to_string()))?;

        let failures: u32 = conn
            .query_row(
                "SELECT failures FROM credentials WHERE id = ?",
                params![id],
                |row| row.get(0),
            )
            .map_err(|e| CredentialError::Database(e.to_string()))?;

        Ok(failures)
    }

    fn delete_older_than(&self, max_age_hours: i64) -> Result<usize, CredentialError> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn
            .execute(
                "DELETE FROM credentials WHERE created_at <= ?",
                params![freshness_cutoff(max_age_hours)],
            )
            .map_err(|e| CredentialError::Database(e.to_string()))?;

        Ok(deleted)
    }
}
