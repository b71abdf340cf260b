//! Main orchestrator for the capture pipeline.
//!
//! Phase 1 archives and describes the capture concurrently. A sentinel
//! description short-circuits to the degraded entry. Otherwise phase 2
//! generates attributes, the embedding, the voice job and the sequence
//! number concurrently, and the assembled entry is persisted.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, instrument};

use super::{
    EmbeddingGenerator, EntryGenerator, ImageArchiver, PersistenceGateway, PipelineError,
    SequenceAllocator, VisionDescriber, VoiceSynthesizer,
};
use crate::adapters::Providers;
use crate::domain::{Capture, CreateEntryRequest, CreateEntryResponse, Entry};
use crate::store::{DocumentStore, InsertOutcome};

/// Pipeline states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    PhaseOneRunning,
    ShortCircuited,
    PhaseTwoRunning,
    Persisting,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::PhaseOneRunning => "phase_one_running",
            Self::ShortCircuited => "short_circuited",
            Self::PhaseTwoRunning => "phase_two_running",
            Self::Persisting => "persisting",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Which terminal path a successful run took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// A new entry was stored
    Created,
    /// An entry for the same (object, owner) already existed
    Existing,
    /// Nothing identifiable; degraded entry, nothing stored
    ShortCircuited,
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub entry: Entry,
    pub disposition: Disposition,
    /// Stages visited, in order
    pub stages: Vec<Stage>,
}

/// Records stage transitions and logs each one
struct StageLog {
    stages: Vec<Stage>,
}

impl StageLog {
    fn new() -> Self {
        Self {
            stages: vec![Stage::Start],
        }
    }

    fn enter(&mut self, stage: Stage) {
        let from = self.current();
        info!(%from, to = %stage, "Pipeline stage transition");
        self.stages.push(stage);
    }

    fn current(&self) -> Stage {
        self.stages.last().copied().unwrap_or(Stage::Start)
    }
}

/// Capture pipeline orchestrator
pub struct Orchestrator {
    describer: VisionDescriber,
    archiver: ImageArchiver,
    generator: EntryGenerator,
    embedder: EmbeddingGenerator,
    voice: VoiceSynthesizer,
    sequence: SequenceAllocator,
    persistence: PersistenceGateway,
}

impl Orchestrator {
    /// Wire every step to its provider
    pub fn new(providers: &Providers, store: Arc<dyn DocumentStore>, voice_budget: Duration) -> Self {
        Self {
            describer: VisionDescriber::new(Arc::clone(&providers.vision)),
            archiver: ImageArchiver::new(Arc::clone(&providers.image_host)),
            generator: EntryGenerator::new(Arc::clone(&providers.text)),
            embedder: EmbeddingGenerator::new(Arc::clone(&providers.embeddings)),
            voice: VoiceSynthesizer::new(Arc::clone(&providers.speech), voice_budget),
            sequence: SequenceAllocator::new(Arc::clone(&store)),
            persistence: PersistenceGateway::new(store),
        }
    }

    /// Run the pipeline for one capture.
    ///
    /// `owner_token` is the identity-token subject of the caller, if any.
    #[instrument(skip_all, fields(owned = owner_token.is_some()))]
    pub async fn run(
        &self,
        capture: &Capture,
        owner_token: Option<&str>,
    ) -> Result<PipelineOutcome, PipelineError> {
        let mut log = StageLog::new();
        let started = Instant::now();

        match self.execute(capture, owner_token, &mut log).await {
            Ok((entry, disposition)) => {
                info!(
                    ?disposition,
                    id = %entry.id(),
                    total_ms = started.elapsed().as_millis() as u64,
                    "Pipeline finished"
                );
                Ok(PipelineOutcome {
                    entry,
                    disposition,
                    stages: log.stages,
                })
            }
            Err(e) => {
                let failed_in = log.current();
                log.enter(Stage::Failed);
                error!(error = %e, stage = %failed_in, "Pipeline failed");
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        capture: &Capture,
        owner_token: Option<&str>,
        log: &mut StageLog,
    ) -> Result<(Entry, Disposition), PipelineError> {
        log.enter(Stage::PhaseOneRunning);
        let phase_one = Instant::now();

        let (image_url, description) = tokio::try_join!(self.archiver.archive(capture), async {
            Ok::<_, PipelineError>(self.describer.describe(capture).await)
        })?;
        info!(elapsed_ms = phase_one.elapsed().as_millis() as u64, "Phase one complete");

        let Some(text) = description.subject() else {
            log.enter(Stage::ShortCircuited);
            info!(description = %description, "No subject identified, returning degraded entry");
            return Ok((
                Entry::unidentified(description.to_string()),
                Disposition::ShortCircuited,
            ));
        };

        log.enter(Stage::PhaseTwoRunning);
        let phase_two = Instant::now();

        let (voice, attributes, vector, no) = tokio::try_join!(
            async { Ok::<_, PipelineError>(self.voice.synthesize(text).await) },
            self.generator.generate(text),
            self.embedder.embed(text),
            self.sequence.allocate(),
        )?;
        info!(
            elapsed_ms = phase_two.elapsed().as_millis() as u64,
            voice = voice.is_some(),
            "Phase two complete"
        );

        let entry = Entry::assemble(attributes, vector, image_url, no, voice);

        log.enter(Stage::Persisting);
        let outcome = self.persistence.persist(entry, owner_token).await?;
        log.enter(Stage::Done);

        Ok(match outcome {
            InsertOutcome::Inserted(entry) => (entry, Disposition::Created),
            InsertOutcome::Existing(entry) => (entry, Disposition::Existing),
        })
    }

    /// Handle a create-entry request, converting fatal errors to the
    /// failure envelope. The full error is logged by `run`; the caller only
    /// sees its summary.
    pub async fn create_entry(
        &self,
        request: &CreateEntryRequest,
        owner_token: Option<&str>,
    ) -> CreateEntryResponse {
        match self.run(&request.capture, owner_token).await {
            Ok(outcome) => CreateEntryResponse::ok(outcome.entry),
            Err(e) => CreateEntryResponse::failure(e.summary()),
        }
    }
}
