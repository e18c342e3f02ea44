use crate::error::{Result, StorageError};
use baromon_common::types::NotificationMemory;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing;

/// Memory key for the only alert kind baromon currently emits.
pub const PRESSURE_DROP_KEY: &str = "pressure_drop";

const DB_FILE_NAME: &str = "baromon.db";

const MEMORY_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS notification_memory (
    alert_key TEXT PRIMARY KEY,
    last_sent_at_ns INTEGER,
    updated_at_ns INTEGER NOT NULL
);
";

pub struct MemoryStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl MemoryStore {
    /// Opens (creating if needed) `baromon.db` inside `data_dir`.
    pub fn new(data_dir: &Path, busy_timeout: Duration) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        Self::open(&data_dir.join(DB_FILE_NAME), busy_timeout)
    }

    pub fn open(db_path: &Path, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(MEMORY_SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Lock the connection, recovering from a poisoned Mutex if necessary.
    fn lock_conn(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reads the memory without taking the write lock. For display only;
    /// decisions must go through [`MemoryStore::transact`].
    pub fn load(&self, alert_key: &str) -> Result<NotificationMemory> {
        let conn = self.lock_conn();
        read_memory(&conn, alert_key)
    }

    /// Runs `f` against a freshly read memory while holding the exclusive
    /// write lock, and persists the memory it returns.
    ///
    /// `f` returns the caller's value plus `Some(memory)` to write back, or
    /// `None` to leave the record untouched. If `f` or the write fails the
    /// transaction rolls back; the lock is released on every path.
    pub fn transact<T, E, F>(&self, alert_key: &str, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&NotificationMemory) -> std::result::Result<(T, Option<NotificationMemory>), E>,
        E: From<StorageError>,
    {
        let mut conn = self.lock_conn();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StorageError::from)?;

        let current = read_memory(&tx, alert_key)?;
        let (value, next) = f(&current)?;

        if let Some(next) = next {
            write_memory(&tx, alert_key, &current, &next)?;
        }
        tx.commit().map_err(StorageError::from)?;
        Ok(value)
    }

    /// Imports the plain-text last-notify file used by earlier deployments.
    ///
    /// The file holds a single ISO-8601 timestamp with offset. An empty or
    /// unparsable file counts as "no memory". An import never moves the
    /// stored instant backwards.
    pub fn import_legacy_file(&self, alert_key: &str, path: &Path) -> Result<Option<DateTime<Utc>>> {
        let content = std::fs::read_to_string(path)?;
        let Some(at) = parse_legacy_timestamp(&content) else {
            tracing::warn!(path = %path.display(), "Legacy memory file empty or corrupt, nothing imported");
            return Ok(None);
        };

        self.transact(alert_key, |memory| {
            let next = memory.recorded(at);
            Ok::<_, StorageError>((next.last_sent_at, Some(next)))
        })
    }
}

fn parse_legacy_timestamp(content: &str) -> Option<DateTime<Utc>> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn read_memory(conn: &Connection, alert_key: &str) -> Result<NotificationMemory> {
    let stored: Option<Option<i64>> = conn
        .query_row(
            "SELECT last_sent_at_ns FROM notification_memory WHERE alert_key = ?1",
            rusqlite::params![alert_key],
            |row| row.get(0),
        )
        .optional()?;

    Ok(NotificationMemory {
        last_sent_at: stored.flatten().map(DateTime::<Utc>::from_timestamp_nanos),
    })
}

/// Nanoseconds since the epoch. Instants outside 1677..2262 do not fit.
fn to_nanos(at: DateTime<Utc>) -> Result<i64> {
    at.timestamp_nanos_opt()
        .ok_or_else(|| StorageError::Other(format!("timestamp {at} is outside the storable range")))
}

fn write_memory(
    conn: &Connection,
    alert_key: &str,
    current: &NotificationMemory,
    next: &NotificationMemory,
) -> Result<()> {
    if let (Some(stored), Some(attempted)) = (current.last_sent_at, next.last_sent_at) {
        if attempted < stored {
            return Err(StorageError::NonMonotonic {
                alert_key: alert_key.to_string(),
                stored,
                attempted,
            });
        }
    }
    if current.last_sent_at.is_some() && next.last_sent_at.is_none() {
        return Err(StorageError::Other(format!(
            "refusing to clear last_sent_at for '{alert_key}'"
        )));
    }

    conn.execute(
        "INSERT INTO notification_memory (alert_key, last_sent_at_ns, updated_at_ns)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(alert_key) DO UPDATE SET
             last_sent_at_ns = excluded.last_sent_at_ns,
             updated_at_ns = excluded.updated_at_ns",
        rusqlite::params![
            alert_key,
            next.last_sent_at.map(to_nanos).transpose()?,
            to_nanos(Utc::now())?,
        ],
    )?;
    tracing::debug!(alert_key, last_sent_at = ?next.last_sent_at, "Notification memory written");
    Ok(())
}
