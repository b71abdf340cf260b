//! Owners: the external identities entries are created for.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An owner and their running creation count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// Internal owner id (stamped onto entries as `user_id`)
    #[serde(rename = "_id")]
    pub id: String,

    /// Subject of the caller's identity token
    #[serde(rename = "providerAccountId")]
    pub provider_account_id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    /// Entries created by this owner; only ever incremented
    #[serde(rename = "pokedexEntries", default)]
    pub entries_created: u64,
}

impl Owner {
    /// Create an owner with a fresh id and a zero counter
    pub fn new(provider_account_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            provider_account_id: provider_account_id.into(),
            name: name.into(),
            avatar: None,
            entries_created: 0,
        }
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }
}
