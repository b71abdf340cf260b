//! Adapter interfaces for external providers.
//!
//! Each provider the pipeline talks to sits behind a small async trait so
//! the core can run against real HTTP clients or in-process fakes:
//! - GenerativeModel: prompt (+ optional image) to text
//! - EmbeddingModel: text to vector
//! - ImageHost: image upload to a stable URL
//! - SpeechService: login, submit synthesis, poll job state

pub mod cloudinary;
pub mod fakeyou;
pub mod gemini;

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::config::ResolvedConfig;
use crate::domain::{ImagePayload, SubmittedJob, VoiceJob};

pub use cloudinary::CloudinaryClient;
pub use fakeyou::FakeYouClient;
pub use gemini::GeminiClient;

/// Generative text model
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Human-readable provider name
    fn name(&self) -> &str;

    /// Generate text for a prompt, optionally grounded on an image
    async fn generate(&self, prompt: &str, image: Option<&ImagePayload>) -> Result<String>;

    async fn health_check(&self) -> Result<()> {
        self.generate("Test connection", None).await.map(|_| ())
    }
}

/// Text embedding model
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Durable image storage
#[async_trait]
pub trait ImageHost: Send + Sync {
    fn name(&self) -> &str;

    /// Upload an image (data URI or remote URL) and return its secure URL
    async fn upload(&self, image: &str) -> Result<String>;

    async fn health_check(&self) -> Result<()>;
}

/// Session credential returned by a speech login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechSession {
    /// Cookie header value to send with authenticated calls
    pub cookie: String,
}

/// Speech-synthesis provider
#[async_trait]
pub trait SpeechService: Send + Sync {
    fn name(&self) -> &str;

    async fn login(&self) -> Result<SpeechSession>;

    /// Submit text for synthesis; `idempotency_token` distinguishes retries
    async fn submit(
        &self,
        session: &SpeechSession,
        text: &str,
        idempotency_token: &str,
    ) -> Result<SubmittedJob>;

    async fn poll(&self, job_token: &str) -> Result<VoiceJob>;

    async fn health_check(&self) -> Result<()> {
        self.login().await.map(|_| ())
    }
}

/// Speech stand-in used when no speech credentials are configured.
///
/// Every call fails, which the voice step turns into "no voice".
pub struct UnconfiguredSpeech;

#[async_trait]
impl SpeechService for UnconfiguredSpeech {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn login(&self) -> Result<SpeechSession> {
        anyhow::bail!("Speech synthesis is not configured (FAKEYOU_EMAIL / FAKEYOU_PASSWORD)")
    }

    async fn submit(&self, _: &SpeechSession, _: &str, _: &str) -> Result<SubmittedJob> {
        anyhow::bail!("Speech synthesis is not configured")
    }

    async fn poll(&self, _: &str) -> Result<VoiceJob> {
        anyhow::bail!("Speech synthesis is not configured")
    }
}

/// One client per provider, built once and shared across requests
#[derive(Clone)]
pub struct Providers {
    /// Model used to describe images
    pub vision: Arc<dyn GenerativeModel>,
    /// Model used to generate structured attributes
    pub text: Arc<dyn GenerativeModel>,
    pub embeddings: Arc<dyn EmbeddingModel>,
    pub image_host: Arc<dyn ImageHost>,
    pub speech: Arc<dyn SpeechService>,
}

impl Providers {
    /// Build real HTTP clients from configuration
    pub fn from_config(config: &ResolvedConfig) -> Result<Self> {
        let api_key = config
            .credentials
            .gemini_api_key
            .clone()
            .context("GEMINI_API_KEY environment variable required")?;
        let cloudinary = config.credentials.cloudinary.clone().context(
            "CLOUDINARY_NAME, CLOUDINARY_KEY and CLOUDINARY_SECRET environment variables required",
        )?;

        let http = reqwest::Client::new();
        let models = &config.models;

        let vision = Arc::new(GeminiClient::with_client(
            http.clone(),
            api_key.clone(),
            models.vision.clone(),
            models.api_base.clone(),
        ));
        let text = if models.text == models.vision {
            Arc::clone(&vision)
        } else {
            Arc::new(GeminiClient::with_client(
                http.clone(),
                api_key.clone(),
                models.text.clone(),
                models.api_base.clone(),
            ))
        };
        let embeddings = Arc::new(GeminiClient::with_client(
            http.clone(),
            api_key,
            models.embedding.clone(),
            models.api_base.clone(),
        ));

        let speech: Arc<dyn SpeechService> = match config.credentials.fakeyou.clone() {
            Some(credentials) => Arc::new(FakeYouClient::with_client(
                http.clone(),
                credentials,
                config.voice.model_token.clone(),
            )),
            None => {
                tracing::warn!("Speech credentials missing; entries will be created without voice");
                Arc::new(UnconfiguredSpeech)
            }
        };

        Ok(Self {
            vision,
            text,
            embeddings,
            image_host: Arc::new(CloudinaryClient::with_client(http, cloudinary)),
            speech,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_speech_always_fails() {
        let speech = UnconfiguredSpeech;
        assert!(speech.login().await.is_err());
        assert!(speech.health_check().await.is_err());
        assert!(speech.poll("jinf_1").await.is_err());
    }
}
