//! Dedup and write of finished entries.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::PipelineError;
use crate::domain::{Entry, Owner};
use crate::store::{DocumentStore, InsertOutcome};

/// Writes entries at most once per (object, owner) and keeps owner counters
pub struct PersistenceGateway {
    store: Arc<dyn DocumentStore>,
}

impl PersistenceGateway {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Resolve an identity-token subject to an owner.
    ///
    /// A missing token, or one with no matching owner, is anonymous.
    pub async fn resolve_owner(
        &self,
        owner_token: Option<&str>,
    ) -> Result<Option<Owner>, PipelineError> {
        let Some(token) = owner_token.filter(|t| !t.is_empty()) else {
            return Ok(None);
        };

        let owner = self
            .store
            .find_owner(token)
            .await
            .map_err(PipelineError::Persistence)?;

        if owner.is_none() {
            debug!("Owner token has no matching owner, treating as anonymous");
        }
        Ok(owner)
    }

    /// Insert the entry unless its (object, owner) already exists.
    ///
    /// An existing record is returned unchanged and the owner's counter is
    /// left alone; a new record bumps the counter in the same transaction.
    #[instrument(skip_all, fields(object = %entry.object()))]
    pub async fn persist(
        &self,
        entry: Entry,
        owner_token: Option<&str>,
    ) -> Result<InsertOutcome, PipelineError> {
        let owner = self.resolve_owner(owner_token).await?;
        let entry = match owner {
            Some(ref owner) => entry.with_owner(owner),
            None => entry,
        };

        let outcome = self
            .store
            .insert_entry_if_absent(&entry)
            .await
            .map_err(PipelineError::Persistence)?;

        match &outcome {
            InsertOutcome::Inserted(entry) => {
                info!(id = %entry.id(), no = ?entry.no, anonymous = owner.is_none(), "Entry stored")
            }
            InsertOutcome::Existing(entry) => {
                info!(id = %entry.id(), "Entry already exists, returning stored record")
            }
        }
        Ok(outcome)
    }
}
