//! snapdex - photo to catalog-entry pipeline
//!
//! Takes a captured image and produces a catalog entry: a description,
//! structured attributes, an embedding, an optional voice clip, a sequence
//! number, and a deduplicated stored record.
//!
//! # Architecture
//!
//! The pipeline runs in two phases:
//! - Phase 1 archives the image and describes it concurrently
//! - A "no subject" description short-circuits to a degraded entry
//! - Phase 2 generates attributes, embedding, voice and sequence number
//!   concurrently, then the entry is stored at most once per (object, owner)
//!
//! # Modules
//!
//! - `adapters`: External providers (Gemini, Cloudinary, FakeYou)
//! - `core`: Pipeline steps, orchestrator, voice refresh, health checks
//! - `domain`: Data structures (Capture, Entry, Owner, Voice)
//! - `store`: Document store (SQLite)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Create an entry from a photo
//! snapdex capture ./dog.jpg --owner <account-id>
//!
//! # Refresh the voice of a returned entry
//! snapdex voice-status entry.json
//!
//! # Check provider connectivity
//! snapdex check
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod store;

// Re-export main types at crate root for convenience
pub use adapters::Providers;
pub use core::{Orchestrator, PipelineError, VoiceStatusRefresher};
pub use domain::{Capture, CreateEntryRequest, CreateEntryResponse, Entry, Owner};
pub use store::{DocumentStore, SqliteStore};
