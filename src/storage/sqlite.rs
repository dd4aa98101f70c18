//! SQLite storage implementation

use std::time::Duration;

use chrono::Utc;
use rusqlite::{Connection, OpenFlags, TransactionBehavior, params};

use super::{StoreConfig, schema};
use crate::report::{NewReport, Report, format_timestamp, parse_timestamp};
use crate::{Error, Result};

const REPORT_COLUMNS: &str =
    "id, event_type, description, latitude, longitude, observed_at, created_at";

/// A session on the SQLite report store.
///
/// Each session owns its own connection and is meant to serve exactly one
/// logical operation. Dropping the session closes the connection; `close`
/// does the same but reports failures.
pub struct ReportStore {
    conn: Connection,
}

impl ReportStore {
    /// Open a session on the database file (creates the file if it doesn't exist).
    ///
    /// The connection runs in serialized threading mode and waits up to
    /// `busy_timeout_ms` for locks held by other sessions, so sessions opened
    /// from concurrent request handlers can share the same file.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
        let conn = Connection::open_with_flags(&config.path, flags)?;
        let store = Self { conn };
        store.apply_pragmas(config)?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    fn apply_pragmas(&self, config: &StoreConfig) -> Result<()> {
        self.conn
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        // journal_mode answers with the mode now in effect
        let _mode: String = self.conn.pragma_update_and_check(
            None,
            "journal_mode",
            config.journal_mode.pragma_value(),
            |row| row.get(0),
        )?;
        Ok(())
    }

    /// Journal mode currently in effect for this connection
    pub fn journal_mode(&self) -> Result<String> {
        let mode: String = self
            .conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
        Ok(mode)
    }

    /// Initialize the database schema
    pub fn initialize_schema(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    // ========== Report Operations ==========

    /// Insert a report and return it as stored.
    ///
    /// Insert and read-back share one transaction; if anything fails the
    /// transaction is rolled back and nothing is written.
    pub fn create_report(&mut self, report: &NewReport) -> Result<Report> {
        let created_at = Utc::now();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            r#"
            INSERT INTO reports (event_type, description, latitude, longitude, observed_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                report.event_type,
                report.description,
                report.latitude,
                report.longitude,
                format_timestamp(&report.observed_at),
                format_timestamp(&created_at),
            ],
        )?;
        let id = tx.last_insert_rowid();

        let stored = tx.query_row(
            &format!("SELECT {} FROM reports WHERE id = ?1", REPORT_COLUMNS),
            [id],
            row_to_report,
        )?;
        tx.commit()?;

        tracing::debug!(id, event_type = %stored.event_type, "Stored report");
        Ok(stored)
    }

    /// Get a report by id
    #[cfg(test)]
    pub fn get_report(&self, id: i64) -> Result<Option<Report>> {
        use rusqlite::OptionalExtension;

        self.conn
            .query_row(
                &format!("SELECT {} FROM reports WHERE id = ?1", REPORT_COLUMNS),
                [id],
                row_to_report,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Most recently observed reports first, at most `limit` of them
    pub fn list_reports(&self, limit: u32) -> Result<Vec<Report>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM reports ORDER BY observed_at DESC, id DESC LIMIT ?1",
            REPORT_COLUMNS
        ))?;

        let reports = stmt
            .query_map([limit], row_to_report)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(reports)
    }

    /// Count all reports
    pub fn count_reports(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM reports", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Close the session, surfacing any error from releasing the connection
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| Error::from(e))
    }
}

/// Map a `reports` row (selected with `REPORT_COLUMNS`) to a `Report`
fn row_to_report(row: &rusqlite::Row) -> rusqlite::Result<Report> {
    let observed_at: String = row.get(5)?;
    let created_at: String = row.get(6)?;

    Ok(Report {
        id: row.get(0)?,
        event_type: row.get(1)?,
        description: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        observed_at: parse_column_timestamp(5, &observed_at)?,
        created_at: parse_column_timestamp(6, &created_at)?,
    })
}

fn parse_column_timestamp(idx: usize, raw: &str) -> rusqlite::Result<chrono::DateTime<Utc>> {
    parse_timestamp(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 12, hour, 0, 0).unwrap()
    }

    fn sample_report(event_type: &str, hour: u32) -> NewReport {
        NewReport {
            event_type: event_type.to_string(),
            description: None,
            latitude: -26.2,
            longitude: 28.0,
            observed_at: at(hour),
        }
    }

    #[test]
    fn test_report_create() {
        let mut store = ReportStore::open_in_memory().unwrap();
        let before = Utc::now();

        let mut report = sample_report("meteor", 21);
        report.description = Some("long green trail".to_string());
        let stored = store.create_report(&report).unwrap();

        assert_eq!(stored.id, 1);
        assert_eq!(stored.event_type, "meteor");
        assert_eq!(stored.description.as_deref(), Some("long green trail"));
        assert_eq!(stored.observed_at, at(21));
        assert!(stored.created_at >= before - chrono::Duration::milliseconds(1));

        let fetched = store.get_report(stored.id).unwrap().unwrap();
        assert_eq!(fetched, stored);
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut store = ReportStore::open_in_memory().unwrap();

        let ids: Vec<i64> = (0..3)
            .map(|i| store.create_report(&sample_report("flash", i)).unwrap().id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(store.count_reports().unwrap(), 3);
    }

    #[test]
    fn test_absent_description_is_null() {
        let mut store = ReportStore::open_in_memory().unwrap();
        store.create_report(&sample_report("satellite", 3)).unwrap();

        let nulls: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM reports WHERE description IS NULL", [], |row| row.get(0))
            .unwrap();
        assert_eq!(nulls, 1);
    }

    #[test]
    fn test_list_orders_by_observed_at_desc() {
        let mut store = ReportStore::open_in_memory().unwrap();
        store.create_report(&sample_report("a", 10)).unwrap();
        store.create_report(&sample_report("b", 23)).unwrap();
        store.create_report(&sample_report("c", 4)).unwrap();

        let all = store.list_reports(10).unwrap();
        let types: Vec<&str> = all.iter().map(|r| r.event_type.as_str()).collect();
        assert_eq!(types, vec!["b", "a", "c"]);

        let top = store.list_reports(2).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].observed_at, at(23));
        assert_eq!(top[1].observed_at, at(10));
    }

    #[test]
    fn test_list_sub_second_ordering() {
        let mut store = ReportStore::open_in_memory().unwrap();
        let base = at(12);

        let mut early = sample_report("early", 12);
        early.observed_at = base + chrono::Duration::milliseconds(5);
        let mut late = sample_report("late", 12);
        late.observed_at = base + chrono::Duration::milliseconds(500);

        store.create_report(&late).unwrap();
        store.create_report(&early).unwrap();

        let listed = store.list_reports(2).unwrap();
        assert_eq!(listed[0].event_type, "late");
        assert_eq!(listed[1].event_type, "early");
    }

    #[test]
    fn test_failed_insert_writes_nothing() {
        let mut store = ReportStore::open_in_memory().unwrap();

        // Violates the event_type length CHECK
        let bad = sample_report(&"x".repeat(51), 1);
        assert!(store.create_report(&bad).is_err());
        assert_eq!(store.count_reports().unwrap(), 0);

        // The next insert still gets the first id
        let stored = store.create_report(&sample_report("meteor", 1)).unwrap();
        assert_eq!(stored.id, 1);
    }
}
