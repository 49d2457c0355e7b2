//! SQLite decision store
//!
//! RULE: Only this file talks to the database.
//! Results and contexts are stored as JSON next to a few indexed columns.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StorageResult;

use super::store::DecisionStore;
use super::types::{DecisionRecord, OutcomeRecord};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS decisions (
    transaction_id TEXT PRIMARY KEY,
    vertical       TEXT NOT NULL,
    decision       TEXT NOT NULL,
    final_score    INTEGER NOT NULL,
    degraded       INTEGER NOT NULL,
    fingerprint    TEXT NOT NULL,
    record_json    TEXT NOT NULL,
    recorded_at    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_decisions_vertical ON decisions (vertical, recorded_at);

CREATE TABLE IF NOT EXISTS outcomes (
    transaction_id TEXT PRIMARY KEY,
    vertical       TEXT NOT NULL,
    actual_fraud   INTEGER NOT NULL,
    record_json    TEXT NOT NULL,
    recorded_at    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_outcomes_vertical ON outcomes (vertical);
";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StorageResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl DecisionStore for SqliteStore {
    fn save_decision(&self, record: &DecisionRecord) -> StorageResult<()> {
        let json = serde_json::to_string(record)?;
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO decisions
             (transaction_id, vertical, decision, final_score, degraded, fingerprint, record_json, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.result.transaction_id,
                record.result.vertical,
                record.result.decision.as_str(),
                record.result.final_score,
                record.result.degraded,
                record.context_fingerprint,
                json,
                record.recorded_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_decision(&self, transaction_id: &str) -> StorageResult<Option<DecisionRecord>> {
        let json: Option<String> = self
            .conn
            .lock()
            .query_row(
                "SELECT record_json FROM decisions WHERE transaction_id = ?1",
                params![transaction_id],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save_outcome(&self, outcome: &OutcomeRecord) -> StorageResult<()> {
        let json = serde_json::to_string(outcome)?;
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO outcomes (transaction_id, vertical, actual_fraud, record_json, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                outcome.transaction_id,
                outcome.vertical,
                outcome.actual_fraud,
                json,
                outcome.recorded_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn outcomes(&self, vertical: Option<&str>) -> StorageResult<Vec<OutcomeRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT record_json FROM outcomes
             WHERE ?1 IS NULL OR vertical = ?1
             ORDER BY transaction_id ASC",
        )?;
        let rows = stmt
            .query_map(params![vertical], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        rows.iter()
            .map(|json| serde_json::from_str(json).map_err(Into::into))
            .collect()
    }

    fn decision_count(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM decisions", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}
