//! FakeYou adapter for text-to-speech.
//!
//! Flow: POST /login (session cookie) -> POST /tts/inference -> GET /tts/job/{token}

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{COOKIE, SET_COOKIE};
use serde::{Deserialize, Serialize};

use super::{SpeechService, SpeechSession};
use crate::config::FakeYouCredentials;
use crate::domain::{audio_url_for, SubmittedJob, VoiceJob, VoiceStatus};

const API_BASE: &str = "https://api.fakeyou.com";

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username_or_email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    success: bool,
    #[serde(default)]
    error_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    tts_model_token: &'a str,
    uuid_idempotency_token: &'a str,
    inference_text: &'a str,
}

#[derive(Debug, Deserialize)]
struct InferenceResponse {
    success: bool,
    inference_job_token: Option<String>,
    #[serde(default)]
    maybe_public_bucket_wav_audio_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobResponse {
    success: bool,
    state: Option<JobState>,
}

#[derive(Debug, Deserialize)]
struct JobState {
    job_token: String,
    status: String,
    #[serde(default)]
    maybe_public_bucket_wav_audio_path: Option<String>,
}

/// FakeYou TTS client
pub struct FakeYouClient {
    credentials: FakeYouCredentials,
    /// Voice model to synthesize with
    model_token: String,
    client: reqwest::Client,
}

impl FakeYouClient {
    pub fn new(credentials: FakeYouCredentials, model_token: String) -> Self {
        Self::with_client(reqwest::Client::new(), credentials, model_token)
    }

    pub fn with_client(
        client: reqwest::Client,
        credentials: FakeYouCredentials,
        model_token: String,
    ) -> Self {
        Self {
            credentials,
            model_token,
            client,
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", API_BASE, path.trim_start_matches('/'))
    }
}

/// Map provider job states onto the voice lifecycle
fn map_status(status: &str) -> VoiceStatus {
    match status {
        "pending" => VoiceStatus::Pending,
        "started" | "attempt_failed" => VoiceStatus::Running,
        "complete_success" => VoiceStatus::CompleteSuccess,
        _ => VoiceStatus::Failed,
    }
}

/// Pull the `session=...` pair out of a Set-Cookie header
fn session_cookie(header: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find(|pair| pair.starts_with("session="))
        .map(str::to_string)
}

#[async_trait]
impl SpeechService for FakeYouClient {
    fn name(&self) -> &str {
        "fakeyou"
    }

    async fn login(&self) -> Result<SpeechSession> {
        let response = self
            .client
            .post(self.api_url("login"))
            .json(&LoginRequest {
                username_or_email: &self.credentials.username_or_email,
                password: &self.credentials.password,
            })
            .send()
            .await
            .context("Failed to reach FakeYou login")?;

        let cookie = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(session_cookie);

        let body: LoginResponse = response
            .json()
            .await
            .context("Failed to parse FakeYou login response")?;

        if !body.success {
            anyhow::bail!(
                "FakeYou login rejected: {}",
                body.error_type.unwrap_or_else(|| "unknown".to_string())
            );
        }

        let cookie = cookie.context("FakeYou login returned no session cookie")?;
        Ok(SpeechSession { cookie })
    }

    async fn submit(
        &self,
        session: &SpeechSession,
        text: &str,
        idempotency_token: &str,
    ) -> Result<SubmittedJob> {
        let response = self
            .client
            .post(self.api_url("tts/inference"))
            .header(COOKIE, session.cookie.as_str())
            .json(&InferenceRequest {
                tts_model_token: &self.model_token,
                uuid_idempotency_token: idempotency_token,
                inference_text: text,
            })
            .send()
            .await
            .context("Failed to submit FakeYou TTS request")?;

        let status = response.status();
        let body: InferenceResponse = response
            .json()
            .await
            .context("Failed to parse FakeYou TTS response")?;

        match (body.success, body.inference_job_token) {
            (true, Some(job_token)) => Ok(SubmittedJob {
                job_token,
                audio_path: body.maybe_public_bucket_wav_audio_path,
            }),
            _ => anyhow::bail!("FakeYou TTS request was not accepted ({})", status),
        }
    }

    async fn poll(&self, job_token: &str) -> Result<VoiceJob> {
        let response = self
            .client
            .get(self.api_url(&format!("tts/job/{}", job_token)))
            .send()
            .await
            .context("Failed to poll FakeYou job")?;

        let body: JobResponse = response
            .json()
            .await
            .context("Failed to parse FakeYou job response")?;

        let state = match (body.success, body.state) {
            (true, Some(state)) => state,
            _ => anyhow::bail!("FakeYou job '{}' not found", job_token),
        };

        let status = map_status(&state.status);
        let audio_url = if status == VoiceStatus::CompleteSuccess {
            state
                .maybe_public_bucket_wav_audio_path
                .as_deref()
                .map(audio_url_for)
        } else {
            None
        };

        Ok(VoiceJob {
            job_token: state.job_token,
            status,
            audio_url,
        })
    }
}
