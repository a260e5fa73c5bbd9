//! SQLite-backed event store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use super::store::{EventStore, EventStoreError, NewTrackedEvent};
use super::types::{EventSource, ExcludedSeats, KeywordRules, TrackedEvent};

/// SQLite-backed event store.
pub struct SqliteEventStore {
    conn: Mutex<Connection>,
}

impl SqliteEventStore {
    /// Open (or create) the store at the given path.
    pub fn new(path: &Path) -> Result<Self, EventStoreError> {
        let conn = Connection::open(path).map_err(|e| EventStoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, EventStoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| EventStoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), EventStoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source TEXT NOT NULL,
                external_id TEXT NOT NULL UNIQUE,
                marketplace_id TEXT,
                show_id TEXT,
                queue_event_id TEXT,
                name TEXT NOT NULL,
                city TEXT,
                event_date TEXT NOT NULL,
                event_time TEXT NOT NULL,
                venue TEXT,
                markup REAL NOT NULL DEFAULT 1.6,
                stock_type TEXT,
                in_hand TEXT,
                in_hand_date TEXT,
                double_check INTEGER NOT NULL DEFAULT 0,
                first_scrape_completed INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS event_rules (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
                rule_type TEXT NOT NULL,
                keyword TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS venue_exclusions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_name TEXT NOT NULL,
                venue_name TEXT NOT NULL,
                section TEXT NOT NULL,
                row TEXT NOT NULL,
                seats TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1
            );

            CREATE INDEX IF NOT EXISTS idx_events_source ON events(source);
            CREATE INDEX IF NOT EXISTS idx_event_rules_event ON event_rules(event_id);
            CREATE INDEX IF NOT EXISTS idx_venue_exclusions_lookup
                ON venue_exclusions(event_name, venue_name);
            "#,
        )
        .map_err(|e| EventStoreError::Database(e.to_string()))?;

        Ok(())
    }

    /// Attach a keyword rule to an event. Rules are authored externally;
    /// exposed here for imports and tests.
    pub fn insert_keyword_rule(
        &self,
        event_id: i64,
        rule_type: &str,
        keyword: &str,
    ) -> Result<(), EventStoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO event_rules (event_id, rule_type, keyword) VALUES (?, ?, ?)",
            params![event_id, rule_type, keyword],
        )
        .map_err(|e| EventStoreError::Database(e.to_string()))?;
        Ok(())
    }

    /// Add a venue seat-exclusion row. Authored externally; exposed here for
    /// imports and tests.
    pub fn insert_exclusion(
        &self,
        event_name: &str,
        venue_name: &str,
        section: &str,
        row: &str,
        seats: &str,
    ) -> Result<(), EventStoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO venue_exclusions (event_name, venue_name, section, row, seats, active)
             VALUES (?, ?, ?, ?, ?, 1)",
            params![event_name, venue_name, section, row, seats],
        )
        .map_err(|e| EventStoreError::Database(e.to_string()))?;
        Ok(())
    }

    fn row_to_event(row: &rusqlite::Row) -> rusqlite::Result<TrackedEvent> {
        let source_str: String = row.get(1)?;
        let date_str: String = row.get(8)?;
        let in_hand_date_str: Option<String> = row.get(14)?;

        Ok(TrackedEvent {
            id: row.get(0)?,
            source: EventSource::parse(&source_str).unwrap_or(EventSource::PrimaryMarketplace),
            external_id: row.get(2)?,
            marketplace_id: row.get(3)?,
            show_id: row.get(4)?,
            queue_event_id: row.get(5)?,
            name: row.get(6)?,
            city: row.get(7)?,
            date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").unwrap_or_default(),
            time: row.get(9)?,
            venue: row.get(10)?,
            markup: row.get(11)?,
            stock_type: row.get(12)?,
            in_hand: row.get(13)?,
            in_hand_date: in_hand_date_str
                .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            double_check: row.get(15)?,
            first_scrape_completed: row.get(16)?,
        })
    }
}

const EVENT_COLUMNS: &str = "id, source, external_id, marketplace_id, show_id, queue_event_id, \
     name, city, event_date, event_time, venue, markup, stock_type, in_hand, in_hand_date, \
     double_check, first_scrape_completed";

impl EventStore for SqliteEventStore {
    fn insert(&self, event: NewTrackedEvent) -> Result<TrackedEvent, EventStoreError> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO events (source, external_id, marketplace_id, show_id, queue_event_id, \
             name, city, event_date, event_time, venue, markup, stock_type, in_hand, in_hand_date, \
             double_check, first_scrape_completed)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)",
            params![
                event.source.as_str(),
                event.external_id,
                event.marketplace_id,
                event.show_id,
                event.queue_event_id,
                event.name,
                event.city,
                event.date.format("%Y-%m-%d").to_string(),
                event.time,
                event.venue,
                event.markup,
                event.stock_type,
                event.in_hand,
                event.in_hand_date.map(|d| d.format("%Y-%m-%d").to_string()),
                event.double_check,
            ],
        )
        .map_err(|e| EventStoreError::Database(e.to_string()))?;

        let id = conn.last_insert_rowid();

        Ok(TrackedEvent {
            id,
            source: event.source,
            external_id: event.external_id,
            marketplace_id: event.marketplace_id,
            show_id: event.show_id,
            queue_event_id: event.queue_event_id,
            name: event.name,
            city: event.city,
            date: event.date,
            time: event.time,
            venue: event.venue,
            markup: event.markup,
            stock_type: event.stock_type,
            in_hand: event.in_hand,
            in_hand_date: event.in_hand_date,
            double_check: event.double_check,
            first_scrape_completed: false,
        })
    }

    fn get(&self, id: i64) -> Result<Option<TrackedEvent>, EventStoreError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?"),
            params![id],
            Self::row_to_event,
        )
        .optional()
        .map_err(|e| EventStoreError::Database(e.to_string()))
    }

    fn list_eligible(&self, source: EventSource) -> Result<Vec<TrackedEvent>, EventStoreError> {
        let conn = self.conn.lock().unwrap();

        let id_filter = match source {
            EventSource::PrimaryMarketplace => "marketplace_id IS NOT NULL",
            EventSource::QueuePlatform => "show_id IS NOT NULL AND queue_event_id IS NOT NULL",
        };

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM events WHERE source = ? AND {id_filter} ORDER BY id"
            ))
            .map_err(|e| EventStoreError::Database(e.to_string()))?;

        let events = stmt
            .query_map(params![source.as_str()], Self::row_to_event)
            .map_err(|e| EventStoreError::Database(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| EventStoreError::Database(e.to_string()))?;

        Ok(events)
    }

    fn mark_first_scrape_completed(&self, id: i64) -> Result<(), EventStoreError> {
        let conn = self.conn.lock().unwrap();
        let updated = conn
            .execute(
                "UPDATE events SET first_scrape_completed = 1 WHERE id = ?",
                params![id],
            )
            .map_err(|e| EventStoreError::Database(e.to_string()))?;

        if updated == 0 {
            return Err(EventStoreError::NotFound(id));
        }
        Ok(())
    }

    fn keyword_rules(&self, event_id: i64) -> Result<KeywordRules, EventStoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT rule_type, keyword FROM event_rules WHERE event_id = ?")
            .map_err(|e| EventStoreError::Database(e.to_string()))?;

        let mut rules = KeywordRules::new();
        let rows = stmt
            .query_map(params![event_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| EventStoreError::Database(e.to_string()))?;

        for row in rows {
            let (rule_type, keyword) = row.map_err(|e| EventStoreError::Database(e.to_string()))?;
            rules.insert(rule_type, keyword);
        }

        Ok(rules)
    }

    fn excluded_seats(
        &self,
        event_name: &str,
        venue_name: &str,
    ) -> Result<ExcludedSeats, EventStoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT section, row, seats FROM venue_exclusions
                 WHERE event_name = ? AND venue_name = ? AND active = 1",
            )
            .map_err(|e| EventStoreError::Database(e.to_string()))?;

        let mut excluded = ExcludedSeats::new();
        let rows = stmt
            .query_map(params![event_name, venue_name], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(|e| EventStoreError::Database(e.to_string()))?;

        for row in rows {
            let (section, seat_row, seats) =
                row.map_err(|e| EventStoreError::Database(e.to_string()))?;
            let entry = excluded
                .entry(format!("{}_{}", section, seat_row))
                .or_default();
            entry.extend(seats.split(',').map(|s| s.trim().to_string()));
        }

        Ok(excluded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_event(source: EventSource, external_id: &str) -> NewTrackedEvent {
        NewTrackedEvent {
            source,
            external_id: external_id.to_string(),
            marketplace_id: None,
            show_id: None,
            queue_event_id: None,
            name: "Hamlet".to_string(),
            city: Some("New York".to_string()),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            time: "19:30".to_string(),
            venue: Some("The Globe".to_string()),
            markup: 1.6,
            stock_type: None,
            in_hand: None,
            in_hand_date: None,
            double_check: false,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let store = SqliteEventStore::in_memory().unwrap();
        let mut ev = new_event(EventSource::PrimaryMarketplace, "EV1");
        ev.marketplace_id = Some("Z7R8G0".to_string());

        let created = store.insert(ev).unwrap();
        let fetched = store.get(created.id).unwrap().unwrap();
        assert_eq!(fetched.external_id, "EV1");
        assert_eq!(fetched.marketplace_id.as_deref(), Some("Z7R8G0"));
        assert!(!fetched.first_scrape_completed);
    }

    #[test]
    fn test_list_eligible_filters_missing_ids() {
        let store = SqliteEventStore::in_memory().unwrap();

        // No marketplace id -> not eligible.
        store
            .insert(new_event(EventSource::PrimaryMarketplace, "EV1"))
            .unwrap();

        let mut ev = new_event(EventSource::PrimaryMarketplace, "EV2");
        ev.marketplace_id = Some("AB12".to_string());
        store.insert(ev).unwrap();

        // Queue-platform event with only one of two ids -> not eligible.
        let mut ev = new_event(EventSource::QueuePlatform, "EV3");
        ev.show_id = Some("77".to_string());
        store.insert(ev).unwrap();

        let primary = store.list_eligible(EventSource::PrimaryMarketplace).unwrap();
        assert_eq!(primary.len(), 1);
        assert_eq!(primary[0].external_id, "EV2");

        let queue = store.list_eligible(EventSource::QueuePlatform).unwrap();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_mark_first_scrape_completed() {
        let store = SqliteEventStore::in_memory().unwrap();
        let mut ev = new_event(EventSource::PrimaryMarketplace, "EV1");
        ev.marketplace_id = Some("AB12".to_string());
        let created = store.insert(ev).unwrap();

        store.mark_first_scrape_completed(created.id).unwrap();
        assert!(store.get(created.id).unwrap().unwrap().first_scrape_completed);

        let err = store.mark_first_scrape_completed(9999).unwrap_err();
        assert!(matches!(err, EventStoreError::NotFound(9999)));
    }

    #[test]
    fn test_keyword_rules() {
        let store = SqliteEventStore::in_memory().unwrap();
        let mut ev = new_event(EventSource::QueuePlatform, "EV1");
        ev.show_id = Some("1".to_string());
        ev.queue_event_id = Some("2".to_string());
        let created = store.insert(ev).unwrap();

        store
            .insert_keyword_rule(created.id, "exclude", "obstructed")
            .unwrap();
        store
            .insert_keyword_rule(created.id, "include", "orchestra")
            .unwrap();

        let rules = store.keyword_rules(created.id).unwrap();
        assert_eq!(rules.get("exclude").map(String::as_str), Some("obstructed"));
        assert_eq!(rules.get("include").map(String::as_str), Some("orchestra"));
    }

    #[test]
    fn test_excluded_seats_grouped_by_section_row() {
        let store = SqliteEventStore::in_memory().unwrap();
        store
            .insert_exclusion("Hamlet", "The Globe", "Orchestra", "A", "1, 2,3")
            .unwrap();
        store
            .insert_exclusion("Hamlet", "The Globe", "Orchestra", "A", "4")
            .unwrap();
        store
            .insert_exclusion("Hamlet", "The Globe", "Mezzanine", "B", "10")
            .unwrap();

        let excluded = store.excluded_seats("Hamlet", "The Globe").unwrap();
        let orchestra = excluded.get("Orchestra_A").unwrap();
        assert_eq!(orchestra.len(), 4);
        assert!(orchestra.contains("2"));
        assert!(excluded.get("Mezzanine_B").unwrap().contains("10"));

        assert!(store.excluded_seats("Hamlet", "Elsewhere").unwrap().is_empty());
    }
}
