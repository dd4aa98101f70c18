//! Database schema definitions

/// SQL to create the reports table
///
/// Timestamps are fixed-width RFC 3339 UTC text, so `ORDER BY observed_at`
/// sorts chronologically.
pub const CREATE_REPORTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS reports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    event_type VARCHAR(50) NOT NULL CHECK (length(event_type) BETWEEN 1 AND 50),
    description VARCHAR(500) CHECK (description IS NULL OR length(description) BETWEEN 1 AND 500),
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    observed_at TEXT NOT NULL,
    created_at TEXT NOT NULL
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_reports_event_type ON reports(event_type)",
    "CREATE INDEX IF NOT EXISTS idx_reports_observed_at ON reports(observed_at)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![CREATE_REPORTS_TABLE];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
