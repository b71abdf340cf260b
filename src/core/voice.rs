//! Optional voice step: login then submit, raced against a fixed budget.
//!
//! The attempt runs as its own task. When the budget runs out, or the
//! caller's future is dropped, the task is aborted so in-flight HTTP work
//! is released instead of left running in the background.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::describe_error;
use crate::adapters::SpeechService;
use crate::domain::{SubmittedJob, SynthesizedVoice};

/// Aborts the wrapped task when dropped
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub struct VoiceSynthesizer {
    speech: Arc<dyn SpeechService>,
    budget: Duration,
}

impl VoiceSynthesizer {
    pub fn new(speech: Arc<dyn SpeechService>, budget: Duration) -> Self {
        Self { speech, budget }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Submit `text` for synthesis. Returns `None` on any error or timeout.
    #[instrument(skip_all, fields(provider = self.speech.name(), budget_ms = self.budget.as_millis() as u64))]
    pub async fn synthesize(&self, text: &str) -> Option<SynthesizedVoice> {
        let speech = Arc::clone(&self.speech);
        let text = text.to_string();
        let idempotency_token = Uuid::new_v4().to_string();
        let started = Instant::now();

        let mut attempt = AbortOnDrop(tokio::spawn(async move {
            submit(speech.as_ref(), &text, &idempotency_token).await
        }));

        match timeout(self.budget, &mut attempt.0).await {
            Ok(Ok(Ok(job))) => {
                info!(
                    job_token = %job.job_token,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Voice job submitted"
                );
                Some(job.into())
            }
            Ok(Ok(Err(e))) => {
                warn!(error = %describe_error(&e), "Voice synthesis failed, continuing without voice");
                None
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Voice task did not complete, continuing without voice");
                None
            }
            Err(_) => {
                attempt.0.abort();
                warn!("Voice synthesis timed out, attempt cancelled");
                None
            }
        }
    }
}

/// Login and submission are sequential; both count against the budget
async fn submit(speech: &dyn SpeechService, text: &str, idempotency_token: &str) -> Result<SubmittedJob> {
    let session = speech.login().await?;
    speech.submit(&session, text, idempotency_token).await
}
