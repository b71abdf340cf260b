//! Owner subcommands.
//!
//! Owners normally come from the identity provider; `add` registers one
//! locally so captures made with `--owner <account>` are attributed to it.

use anyhow::Result;
use clap::Subcommand;

use super::{open_store, print_json};
use crate::config::ResolvedConfig;
use crate::domain::Owner;
use crate::store::DocumentStore;

#[derive(Subcommand, Debug)]
pub enum OwnerCommands {
    /// Register (or rename) an owner
    Add {
        /// Identity-token subject (provider account id)
        account: String,

        /// Display name
        name: String,

        /// Avatar URL
        #[arg(long)]
        avatar: Option<String>,
    },

    /// Show an owner and their entry count
    Show {
        account: String,
    },
}

pub async fn execute(config: &ResolvedConfig, command: OwnerCommands) -> Result<()> {
    let store = open_store(config)?;

    match command {
        OwnerCommands::Add {
            account,
            name,
            avatar,
        } => {
            let mut owner = match store.find_owner(&account).await? {
                Some(existing) => Owner { name, ..existing },
                None => Owner::new(account, name),
            };
            if let Some(avatar) = avatar {
                owner = owner.with_avatar(avatar);
            }

            store.upsert_owner(&owner).await?;
            println!("Owner saved: {} ({})", owner.name, owner.provider_account_id);
            Ok(())
        }
        OwnerCommands::Show { account } => match store.find_owner(&account).await? {
            Some(owner) => print_json(&owner),
            None => anyhow::bail!("No owner with account '{}'", account),
        },
    }
}
