//! Voice-status refresh for entries created without finished audio.
//!
//! The capture is handled as raw JSON so fields this flow does not know
//! about are echoed back untouched. The refresh never fails outward: any
//! error is logged and the input is returned as-is.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{describe_error, VoiceSynthesizer};
use crate::adapters::SpeechService;
use crate::domain::{VoiceStatus, VoiceStatusRequest, VoiceStatusResponse, VoiceUpdate};
use crate::store::DocumentStore;

const JOB_TOKEN: &str = "inference_job_token";
const VOICE_STATUS: &str = "voiceStatus";
const VOICE_URL: &str = "voiceUrl";

pub struct VoiceStatusRefresher {
    synthesizer: VoiceSynthesizer,
    speech: Arc<dyn SpeechService>,
    store: Arc<dyn DocumentStore>,
}

impl VoiceStatusRefresher {
    pub fn new(
        synthesizer: VoiceSynthesizer,
        speech: Arc<dyn SpeechService>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            synthesizer,
            speech,
            store,
        }
    }

    /// Handle a voice-status request; always succeeds
    pub async fn handle(&self, request: VoiceStatusRequest) -> VoiceStatusResponse {
        VoiceStatusResponse {
            capture: self.refresh(request.capture).await,
        }
    }

    /// Refresh the voice fields of `capture`, echoing it unchanged on error
    #[instrument(skip_all)]
    pub async fn refresh(&self, capture: Value) -> Value {
        match self.try_refresh(&capture).await {
            Ok(updated) => updated,
            Err(e) => {
                warn!(error = %describe_error(&e), "Voice refresh failed, returning capture unchanged");
                capture
            }
        }
    }

    async fn try_refresh(&self, capture: &Value) -> Result<Value> {
        let fields = capture
            .as_object()
            .context("Capture is not a JSON object")?;
        let mut updated = fields.clone();

        let update = match non_empty_str(fields, JOB_TOKEN) {
            Some(job_token) => self.poll(job_token).await?,
            None => self.submit(fields).await?,
        };

        updated.insert(JOB_TOKEN.to_string(), Value::String(update.job_token.clone()));
        updated.insert(VOICE_STATUS.to_string(), serde_json::to_value(update.status)?);
        if let Some(ref url) = update.audio_url {
            updated.insert(VOICE_URL.to_string(), Value::String(url.clone()));
        }

        let fresh_job = non_empty_str(fields, JOB_TOKEN).is_none();
        if fresh_job || update.status.is_terminal() {
            self.write_back(fields, &update).await?;
        }

        Ok(Value::Object(updated))
    }

    /// No job yet: submit one for the capture's description
    async fn submit(&self, fields: &Map<String, Value>) -> Result<VoiceUpdate> {
        let description = non_empty_str(fields, "description")
            .context("Capture has neither a job token nor a description")?;

        let voice = self
            .synthesizer
            .synthesize(description)
            .await
            .context("Voice submission produced no job")?;

        info!(job_token = %voice.job_token, "Submitted voice job for capture");
        Ok(VoiceUpdate {
            status: if voice.audio_url.is_some() {
                VoiceStatus::CompleteSuccess
            } else {
                VoiceStatus::Pending
            },
            job_token: voice.job_token,
            audio_url: voice.audio_url,
        })
    }

    async fn poll(&self, job_token: &str) -> Result<VoiceUpdate> {
        let job = self.speech.poll(job_token).await?;
        debug!(job_token, status = ?job.status, "Polled voice job");

        Ok(VoiceUpdate {
            job_token: job.job_token,
            status: job.status,
            audio_url: job.audio_url,
        })
    }

    /// Update the stored entry, if the capture names one
    async fn write_back(&self, fields: &Map<String, Value>, update: &VoiceUpdate) -> Result<()> {
        let Some(id) = non_empty_str(fields, "_id").and_then(|id| Uuid::parse_str(id).ok()) else {
            debug!("Capture has no entry id, skipping store update");
            return Ok(());
        };

        let found = self
            .store
            .update_voice(id, update)
            .await
            .context("Failed to store refreshed voice fields")?;
        if !found {
            debug!(%id, "No stored entry for capture");
        }
        Ok(())
    }
}

fn non_empty_str<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}
