//! Document store for entries and owners.
//!
//! The store is the only shared mutable resource in the pipeline, so the
//! two operations that used to be read-then-write are single atomic calls:
//! - `insert_entry_if_absent`: dedup on (object, owner) and bump the owner
//!   counter in one transaction
//! - `next_sequence`: hand out the next sequence number exactly once

pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Entry, Owner, VoiceUpdate};

pub use sqlite::SqliteStore;

/// Errors that can occur in the document store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store task failed: {0}")]
    Task(String),
}

/// Result of a conditional insert
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// The entry was new and has been written
    Inserted(Entry),

    /// An entry for the same (object, owner) already existed; returned unchanged
    Existing(Entry),
}

impl InsertOutcome {
    pub fn entry(&self) -> &Entry {
        match self {
            Self::Inserted(entry) | Self::Existing(entry) => entry,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// Persistence operations used by the pipeline
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Find an owner by identity-token subject
    async fn find_owner(&self, provider_account_id: &str) -> Result<Option<Owner>, StoreError>;

    /// Create or update an owner record (counter is left untouched on update)
    async fn upsert_owner(&self, owner: &Owner) -> Result<(), StoreError>;

    /// Find the entry for (object, owner); `None` owner means anonymous
    async fn find_entry(
        &self,
        object: &str,
        owner_id: Option<&str>,
    ) -> Result<Option<Entry>, StoreError>;

    async fn get_entry(&self, id: Uuid) -> Result<Option<Entry>, StoreError>;

    /// Entry with the highest sequence number
    async fn latest_entry(&self) -> Result<Option<Entry>, StoreError>;

    /// Allocate the next sequence number (max existing + 1), atomically
    async fn next_sequence(&self) -> Result<u64, StoreError>;

    /// Insert unless (object, owner) exists; on insert, increment the owner's counter
    async fn insert_entry_if_absent(&self, entry: &Entry) -> Result<InsertOutcome, StoreError>;

    /// Write refreshed voice fields; returns false if the entry does not exist
    async fn update_voice(&self, id: Uuid, update: &VoiceUpdate) -> Result<bool, StoreError>;

    async fn count_entries(&self) -> Result<u64, StoreError>;

    /// Most recent entries by sequence number
    async fn list_entries(&self, limit: usize) -> Result<Vec<Entry>, StoreError>;
}
