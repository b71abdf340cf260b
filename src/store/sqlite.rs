//! SQLite-backed document store.
//!
//! Entries are stored as JSON documents alongside the columns needed for
//! dedup and ordering. The unique index on (object, owner_key) is what
//! makes the conditional insert atomic; anonymous entries use an empty
//! owner_key so they dedup among themselves.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{DocumentStore, InsertOutcome, StoreError};
use crate::domain::{Entry, Owner, VoiceUpdate};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS entries (
    id TEXT PRIMARY KEY,
    object TEXT NOT NULL,
    owner_key TEXT NOT NULL DEFAULT '',
    no INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    document TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_entries_object_owner ON entries (object, owner_key);
CREATE INDEX IF NOT EXISTS idx_entries_no ON entries (no);

CREATE TABLE IF NOT EXISTS owners (
    id TEXT PRIMARY KEY,
    provider_account_id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    avatar TEXT,
    entries_created INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS sequences (
    name TEXT PRIMARY KEY,
    value INTEGER NOT NULL
);
";

/// Seeds from MAX(no) on first use and never hands out a value twice
const NEXT_SEQUENCE: &str = "
INSERT INTO sequences (name, value)
VALUES ('entries', (SELECT COALESCE(MAX(no), 0) FROM entries) + 1)
ON CONFLICT (name) DO UPDATE
    SET value = MAX(sequences.value, (SELECT COALESCE(MAX(no), 0) FROM entries)) + 1
RETURNING value
";

/// Acquire the connection lock, recovering from poisoning
fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("SQLite mutex was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// SQLite document store
pub struct SqliteStore {
    /// `rusqlite::Connection` is not `Sync`; all access goes through the lock
    conn: Arc<Mutex<Connection>>,
    /// None for in-memory stores
    db_path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) a database file
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&db_path)?;
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        Self::initialize(conn, Some(db_path))
    }

    /// In-memory store (tests and dry runs)
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::initialize(Connection::open_in_memory()?, None)
    }

    fn initialize(conn: Connection, db_path: Option<PathBuf>) -> Result<Self, StoreError> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path,
        })
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Run blocking database work off the async runtime
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = acquire_lock(&conn);
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn parse_document(document: String) -> Result<Entry, StoreError> {
    Ok(serde_json::from_str(&document)?)
}

fn query_entry(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Option<Entry>, StoreError> {
    conn.query_row(sql, params, |row| row.get::<_, String>(0))
        .optional()?
        .map(parse_document)
        .transpose()
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn find_owner(&self, provider_account_id: &str) -> Result<Option<Owner>, StoreError> {
        let account = provider_account_id.to_string();
        self.with_conn(move |conn| {
            let owner = conn
                .query_row(
                    "SELECT id, provider_account_id, name, avatar, entries_created
                     FROM owners WHERE provider_account_id = ?1",
                    params![account],
                    |row| {
                        Ok(Owner {
                            id: row.get(0)?,
                            provider_account_id: row.get(1)?,
                            name: row.get(2)?,
                            avatar: row.get(3)?,
                            entries_created: row.get::<_, i64>(4)?.max(0) as u64,
                        })
                    },
                )
                .optional()?;
            Ok(owner)
        })
        .await
    }

    async fn upsert_owner(&self, owner: &Owner) -> Result<(), StoreError> {
        let owner = owner.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO owners (id, provider_account_id, name, avatar, entries_created)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (provider_account_id) DO UPDATE
                     SET name = excluded.name, avatar = excluded.avatar",
                params![
                    owner.id,
                    owner.provider_account_id,
                    owner.name,
                    owner.avatar,
                    owner.entries_created as i64
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn find_entry(
        &self,
        object: &str,
        owner_id: Option<&str>,
    ) -> Result<Option<Entry>, StoreError> {
        let object = object.to_string();
        let owner_key = owner_id.unwrap_or_default().to_string();
        self.with_conn(move |conn| {
            query_entry(
                conn,
                "SELECT document FROM entries WHERE object = ?1 AND owner_key = ?2",
                params![object, owner_key],
            )
        })
        .await
    }

    async fn get_entry(&self, id: Uuid) -> Result<Option<Entry>, StoreError> {
        self.with_conn(move |conn| {
            query_entry(
                conn,
                "SELECT document FROM entries WHERE id = ?1",
                params![id.to_string()],
            )
        })
        .await
    }

    async fn latest_entry(&self) -> Result<Option<Entry>, StoreError> {
        self.with_conn(|conn| {
            query_entry(
                conn,
                "SELECT document FROM entries ORDER BY no DESC LIMIT 1",
                [],
            )
        })
        .await
    }

    async fn next_sequence(&self) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            let value: i64 = conn.query_row(NEXT_SEQUENCE, [], |row| row.get(0))?;
            Ok(value.max(1) as u64)
        })
        .await
    }

    async fn insert_entry_if_absent(&self, entry: &Entry) -> Result<InsertOutcome, StoreError> {
        let entry = entry.clone();
        self.with_conn(move |conn| {
            let document = serde_json::to_string(&entry)?;
            let owner_key = entry.user_id.clone().unwrap_or_default();
            let created_at = entry.created_at.unwrap_or_else(chrono::Utc::now).to_rfc3339();

            let tx = conn.transaction()?;
            let inserted = tx.execute(
                "INSERT INTO entries (id, object, owner_key, no, created_at, document)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (object, owner_key) DO NOTHING",
                params![
                    entry.id().to_string(),
                    entry.object(),
                    owner_key,
                    entry.no.unwrap_or_default() as i64,
                    created_at,
                    document
                ],
            )?;

            let outcome = if inserted == 0 {
                let existing: String = tx.query_row(
                    "SELECT document FROM entries WHERE object = ?1 AND owner_key = ?2",
                    params![entry.object(), owner_key],
                    |row| row.get(0),
                )?;
                debug!(object = %entry.object(), "Entry already exists for owner");
                InsertOutcome::Existing(parse_document(existing)?)
            } else {
                if let Some(ref owner_id) = entry.user_id {
                    tx.execute(
                        "UPDATE owners SET entries_created = entries_created + 1 WHERE id = ?1",
                        params![owner_id],
                    )?;
                }
                InsertOutcome::Inserted(entry)
            };

            tx.commit()?;
            Ok(outcome)
        })
        .await
    }

    async fn update_voice(&self, id: Uuid, update: &VoiceUpdate) -> Result<bool, StoreError> {
        let update = update.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let Some(mut entry) = query_entry(
                &tx,
                "SELECT document FROM entries WHERE id = ?1",
                params![id.to_string()],
            )?
            else {
                return Ok(false);
            };

            entry.inference_job_token = Some(update.job_token);
            entry.voice_status = Some(update.status);
            if update.audio_url.is_some() {
                entry.voice_url = update.audio_url;
            }

            tx.execute(
                "UPDATE entries SET document = ?1 WHERE id = ?2",
                params![serde_json::to_string(&entry)?, id.to_string()],
            )?;
            tx.commit()?;
            Ok(true)
        })
        .await
    }

    async fn count_entries(&self) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
            Ok(count.max(0) as u64)
        })
        .await
    }

    async fn list_entries(&self, limit: usize) -> Result<Vec<Entry>, StoreError> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare("SELECT document FROM entries ORDER BY no DESC LIMIT ?1")?;
            let documents = stmt
                .query_map(params![limit as i64], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            documents.into_iter().map(parse_document).collect()
        })
        .await
    }
}
