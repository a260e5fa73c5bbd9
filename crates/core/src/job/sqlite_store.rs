//! SQLite-backed job store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::store::{CreateJobRequest, JobStore, JobStoreError};
use super::types::{JobStatus, ScrapeJob};

/// SQLite-backed job store.
pub struct SqliteJobStore {
    conn: Mutex<Connection>,
}

impl SqliteJobStore {
    /// Open (or create) the store at the given path.
    pub fn new(path: &Path) -> Result<Self, JobStoreError> {
        let conn = Connection::open(path).map_err(|e| JobStoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, JobStoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| JobStoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), JobStoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS scrape_jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                status TEXT NOT NULL,
                concurrency INTEGER NOT NULL DEFAULT 5,
                auto_upload INTEGER NOT NULL DEFAULT 0,
                events_processed INTEGER NOT NULL DEFAULT 0,
                tickets_found INTEGER NOT NULL DEFAULT 0,
                interval_minutes INTEGER,
                last_run TEXT,
                next_run TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| JobStoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<ScrapeJob> {
        let status_str: String = row.get(1)?;
        let last_run_str: Option<String> = row.get(7)?;
        let next_run_str: Option<String> = row.get(8)?;
        let created_at_str: String = row.get(9)?;
        let updated_at_str: String = row.get(10)?;

        Ok(ScrapeJob {
            id: row.get(0)?,
            status: JobStatus::parse(&status_str).unwrap_or(JobStatus::Pending),
            concurrency: row.get::<_, i64>(2)? as usize,
            auto_upload: row.get(3)?,
            events_processed: row.get::<_, i64>(4)? as u64,
            tickets_found: row.get::<_, i64>(5)? as u64,
            interval_minutes: row.get(6)?,
            last_run: last_run_str.as_deref().map(parse_timestamp),
            next_run: next_run_str.as_deref().map(parse_timestamp),
            created_at: parse_timestamp(&created_at_str),
            updated_at: parse_timestamp(&updated_at_str),
        })
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl JobStore for SqliteJobStore {
    fn create(&self, request: CreateJobRequest) -> Result<ScrapeJob, JobStoreError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO scrape_jobs (status, concurrency, auto_upload, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
            params![
                JobStatus::Pending.as_str(),
                request.concurrency as i64,
                request.auto_upload,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| JobStoreError::Database(e.to_string()))?;

        Ok(ScrapeJob {
            id: conn.last_insert_rowid(),
            status: JobStatus::Pending,
            concurrency: request.concurrency,
            auto_upload: request.auto_upload,
            events_processed: 0,
            tickets_found: 0,
            interval_minutes: None,
            last_run: None,
            next_run: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn get(&self, id: i64) -> Result<Option<ScrapeJob>, JobStoreError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, status, concurrency, auto_upload, events_processed, tickets_found, \
             interval_minutes, last_run, next_run, created_at, updated_at \
             FROM scrape_jobs WHERE id = ?",
            params![id],
            Self::row_to_job,
        )
        .optional()
        .map_err(|e| JobStoreError::Database(e.to_string()))
    }

    fn set_status(&self, id: i64, status: JobStatus) -> Result<(), JobStoreError> {
        let conn = self.conn.lock().unwrap();
        let updated = conn
            .execute(
                "UPDATE scrape_jobs SET status = ?, updated_at = ? WHERE id = ?",
                params![status.as_str(), Utc::now().to_rfc3339(), id],
            )
            .map_err(|e| JobStoreError::Database(e.to_string()))?;

        if updated == 0 {
            return Err(JobStoreError::NotFound(id));
        }
        Ok(())
    }

    fn increment_counters(
        &self,
        id: i64,
        events: u64,
        tickets: u64,
    ) -> Result<(), JobStoreError> {
        let conn = self.conn.lock().unwrap();
        let updated = conn
            .execute(
                "UPDATE scrape_jobs SET events_processed = events_processed + ?, \
                 tickets_found = tickets_found + ?, updated_at = ? WHERE id = ?",
                params![events as i64, tickets as i64, Utc::now().to_rfc3339(), id],
            )
            .map_err(|e| JobStoreError::Database(e.to_string()))?;

        if updated == 0 {
            return Err(JobStoreError::NotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_get() {
        let store = SqliteJobStore::in_memory().unwrap();
        let job = store
            .create(CreateJobRequest {
                concurrency: 5,
                auto_upload: true,
            })
            .unwrap();

        let fetched = store.get(job.id).unwrap().unwrap();
        assert_eq!(fetched.status, JobStatus::Pending);
        assert_eq!(fetched.concurrency, 5);
        assert!(fetched.auto_upload);
        assert_eq!(fetched.events_processed, 0);
    }

    #[test]
    fn test_set_status() {
        let store = SqliteJobStore::in_memory().unwrap();
        let job = store
            .create(CreateJobRequest {
                concurrency: 5,
                auto_upload: false,
            })
            .unwrap();

        store.set_status(job.id, JobStatus::Stopped).unwrap();
        assert_eq!(store.get(job.id).unwrap().unwrap().status, JobStatus::Stopped);

        let err = store.set_status(9999, JobStatus::Running).unwrap_err();
        assert!(matches!(err, JobStoreError::NotFound(9999)));
    }

    #[test]
    fn test_increment_counters_accumulates() {
        let store = SqliteJobStore::in_memory().unwrap();
        let job = store
            .create(CreateJobRequest {
                concurrency: 5,
                auto_upload: false,
            })
            .unwrap();

        store.increment_counters(job.id, 1, 4).unwrap();
        store.increment_counters(job.id, 1, 0).unwrap();
        store.increment_counters(job.id, 1, 7).unwrap();

        let fetched = store.get(job.id).unwrap().unwrap();
        assert_eq!(fetched.events_processed, 3);
        assert_eq!(fetched.tickets_found, 11);
    }
}
