//! Core pipeline logic.
//!
//! This module contains:
//! - Steps: VisionDescriber, ImageArchiver, EntryGenerator, EmbeddingGenerator,
//!   VoiceSynthesizer, SequenceAllocator, PersistenceGateway
//! - Orchestrator: runs the steps in two phases and assembles the entry
//! - VoiceStatusRefresher: the secondary voice-status flow
//! - Health: provider connectivity checks

pub mod archiver;
pub mod describer;
pub mod generator;
pub mod health;
pub mod orchestrator;
pub mod persistence;
pub mod refresh;
pub mod sequence;
pub mod voice;

use thiserror::Error;

use crate::store::StoreError;

// Re-export commonly used types
pub use archiver::ImageArchiver;
pub use describer::{VisionDescriber, VISION_UNAVAILABLE};
pub use generator::{strip_code_fences, EmbeddingGenerator, EntryGenerator};
pub use health::{check_providers, ProviderCheck, ProviderReport};
pub use orchestrator::{Disposition, Orchestrator, PipelineOutcome, Stage};
pub use persistence::PersistenceGateway;
pub use refresh::VoiceStatusRefresher;
pub use sequence::SequenceAllocator;
pub use voice::VoiceSynthesizer;

/// Fatal pipeline errors; each one aborts the request
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Image archive failed: {0}")]
    Archive(String),

    #[error("Entry generation failed: {0}")]
    Generation(String),

    #[error("Generated entry is not valid JSON: {0}")]
    Parse(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Sequence allocation failed: {0}")]
    Sequence(#[source] StoreError),

    #[error("Persistence failed: {0}")]
    Persistence(#[source] StoreError),
}

impl PipelineError {
    /// Caller-facing message; provider detail stays in the logs
    pub fn summary(&self) -> &'static str {
        match self {
            Self::Archive(_) => "Image archive failed",
            Self::Generation(_) => "Entry generation failed",
            Self::Parse(_) => "Generated entry is not valid JSON",
            Self::Embedding(_) => "Embedding failed",
            Self::Sequence(_) => "Sequence allocation failed",
            Self::Persistence(_) => "Persistence failed",
        }
    }
}

/// Render an adapter error with its context chain, for logs only
pub(crate) fn describe_error(error: &anyhow::Error) -> String {
    format!("{:#}", error)
}
