//! Durable on-disk cache tier backed by SQLite
//!
//! Tier-2 of the response cache. The database runs in WAL mode so
//! concurrent readers never block on the single writer; writes are
//! serialized through one shared connection opened once per process.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::cache::entry::CacheEntry;
use crate::error::Result;

/// Durable cache storage
pub struct DiskTier {
    /// Single shared connection; writes serialize here
    conn: Mutex<Connection>,
}

impl DiskTier {
    /// Open (or create) the durable tier at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening durable cache tier at {:?}", path);

        let conn = Connection::open(path)?;
        Self::apply_pragmas(&conn)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (tests)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// WAL mode for concurrent readers, NORMAL sync, busy timeout for
    /// the serialized writer
    fn apply_pragmas(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            ",
        )?;
        Ok(())
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS cache_entries (
                key         TEXT PRIMARY KEY,
                payload     TEXT NOT NULL,
                source_tag  TEXT NOT NULL,
                created_at  INTEGER NOT NULL,
                ttl_seconds INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_cache_entries_source
                ON cache_entries(source_tag);
            ",
        )?;
        Ok(())
    }

    /// Look up an entry by key. Staleness is the caller's concern.
    pub fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let conn = self.conn.lock().expect("disk tier lock poisoned");
        let row = conn
            .query_row(
                "SELECT payload, source_tag, created_at, ttl_seconds
                 FROM cache_entries WHERE key = ?1",
                params![key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((payload, source_tag, created_at, ttl_seconds)) => {
                let payload = serde_json::from_str(&payload)?;
                let created_at = parse_timestamp(created_at);
                Ok(Some(CacheEntry::from_parts(
                    key.to_string(),
                    payload,
                    source_tag,
                    created_at,
                    ttl_seconds.max(0) as u64,
                )))
            }
            None => Ok(None),
        }
    }

    /// Insert or overwrite an entry
    pub fn put(&self, entry: &CacheEntry) -> Result<()> {
        let payload = serde_json::to_string(&entry.payload)?;
        let conn = self.conn.lock().expect("disk tier lock poisoned");
        conn.execute(
            "INSERT INTO cache_entries (key, payload, source_tag, created_at, ttl_seconds)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(key) DO UPDATE SET
                payload = excluded.payload,
                source_tag = excluded.source_tag,
                created_at = excluded.created_at,
                ttl_seconds = excluded.ttl_seconds",
            params![
                entry.key,
                payload,
                entry.source_tag,
                entry.created_at.timestamp(),
                entry.ttl_seconds as i64,
            ],
        )?;
        debug!("Durable write: {}", entry.key);
        Ok(())
    }

    /// Remove an entry; returns whether anything was removed
    pub fn remove(&self, key: &str) -> Result<bool> {
        let conn = self.conn.lock().expect("disk tier lock poisoned");
        let removed = conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }

    /// Remove every entry produced by a collaborator; returns the count
    pub fn remove_by_source(&self, source_tag: &str) -> Result<usize> {
        let conn = self.conn.lock().expect("disk tier lock poisoned");
        let removed = conn.execute(
            "DELETE FROM cache_entries WHERE source_tag = ?1",
            params![source_tag],
        )?;
        Ok(removed)
    }

    /// Remove entries expired longer than `grace` ago; returns the count
    pub fn purge_expired(&self, grace: Duration) -> Result<usize> {
        let cutoff = Utc::now().timestamp() - grace.as_secs() as i64;
        let conn = self.conn.lock().expect("disk tier lock poisoned");
        let removed = conn.execute(
            "DELETE FROM cache_entries WHERE created_at + ttl_seconds < ?1",
            params![cutoff],
        )?;
        Ok(removed)
    }

    /// Number of stored entries
    pub fn len(&self) -> Result<usize> {
        let conn = self.conn.lock().expect("disk tier lock poisoned");
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn parse_timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now)
}
